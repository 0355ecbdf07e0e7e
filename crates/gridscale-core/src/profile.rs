//! Time-series resource profiles.
//!
//! A [`Profile`] wraps a polars [`DataFrame`]: a leading `UTC` column of
//! epoch milliseconds (strictly increasing), then one `Float64` column per
//! asset id (plant id for hydro/solar/wind, zone id for demand) named by the
//! id's decimal string.

use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};

/// Name of the timestamp column.
pub const TIMESTAMP_COLUMN: &str = "UTC";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ProfileParts", into = "ProfileParts")]
pub struct Profile {
    frame: DataFrame,
    columns: Vec<usize>,
}

/// Serialized shape of a profile: timestamps, ids and row-major values.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfileParts {
    timestamps: Vec<DateTime<Utc>>,
    columns: Vec<usize>,
    values: Vec<f64>,
}

impl TryFrom<ProfileParts> for Profile {
    type Error = GridError;

    fn try_from(parts: ProfileParts) -> GridResult<Self> {
        Profile::new(parts.timestamps, parts.columns, parts.values)
    }
}

impl From<Profile> for ProfileParts {
    fn from(profile: Profile) -> Self {
        let width = profile.columns.len();
        let columns: Vec<Vec<f64>> = profile
            .columns
            .iter()
            .map(|id| profile.column(*id).unwrap_or_default())
            .collect();
        let values = (0..profile.n_rows())
            .flat_map(|row| (0..width).map(move |pos| (row, pos)))
            .map(|(row, pos)| columns[pos].get(row).copied().unwrap_or(f64::NAN))
            .collect();
        ProfileParts {
            timestamps: profile.timestamps(),
            columns: profile.columns,
            values,
        }
    }
}

impl PartialEq for Profile {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
            && self.timestamps() == other.timestamps()
            && self
                .columns
                .iter()
                .all(|id| self.column(*id) == other.column(*id))
    }
}

impl Profile {
    /// Build a profile from row-major `values`.
    ///
    /// Fails when the shape does not match, timestamps are not strictly
    /// increasing, or a column id repeats.
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        columns: Vec<usize>,
        values: Vec<f64>,
    ) -> GridResult<Self> {
        let width = columns.len();
        if values.len() != timestamps.len() * width {
            return Err(GridError::Validation(format!(
                "profile shape mismatch: {} rows x {} columns but {} values",
                timestamps.len(),
                width,
                values.len()
            )));
        }

        let millis: Vec<i64> = timestamps.iter().map(|t| t.timestamp_millis()).collect();
        let mut series = Vec::with_capacity(width + 1);
        series.push(Series::new(TIMESTAMP_COLUMN, millis));
        for (pos, id) in columns.iter().enumerate() {
            let column: Vec<f64> = values.iter().skip(pos).step_by(width).copied().collect();
            series.push(Series::new(&id.to_string(), column));
        }
        check_unique(&columns)?;
        Self::from_frame(DataFrame::new(series)?)
    }

    /// Build a profile from one `Vec` of values per timestamp.
    pub fn from_rows(
        timestamps: Vec<DateTime<Utc>>,
        columns: Vec<usize>,
        rows: Vec<Vec<f64>>,
    ) -> GridResult<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(GridError::Validation(format!(
                "profile row {} has {} values, expected {}",
                i,
                row.len(),
                columns.len()
            )));
        }
        Self::new(timestamps, columns, rows.into_iter().flatten().collect())
    }

    /// Validate a frame laid out as `UTC` (Int64 epoch ms) followed by
    /// asset-id columns. Value columns are cast to `Float64`.
    pub fn from_frame(frame: DataFrame) -> GridResult<Self> {
        let mut series = frame.get_columns().iter();
        let stamps = series.next().ok_or_else(|| {
            GridError::Validation("profile has no timestamp column".to_string())
        })?;
        if stamps.name() != TIMESTAMP_COLUMN || stamps.dtype() != &DataType::Int64 {
            return Err(GridError::Validation(format!(
                "first profile column must be '{}' (Int64 epoch ms), found '{}' ({})",
                TIMESTAMP_COLUMN,
                stamps.name(),
                stamps.dtype()
            )));
        }
        if stamps.null_count() > 0 {
            return Err(GridError::Validation(
                "profile has missing timestamps".to_string(),
            ));
        }
        let millis: Vec<i64> = stamps.i64()?.into_iter().flatten().collect();
        if let Some(pair) = millis.windows(2).find(|w| w[0] >= w[1]) {
            return Err(GridError::Validation(format!(
                "profile timestamps must be strictly increasing; {} is followed by {}",
                pair[0], pair[1]
            )));
        }

        let mut columns = Vec::with_capacity(frame.width().saturating_sub(1));
        let mut cast = vec![stamps.clone()];
        for values in series {
            let id: usize = values.name().parse().map_err(|_| {
                GridError::Validation(format!(
                    "profile column '{}' is not an asset id",
                    values.name()
                ))
            })?;
            if values.null_count() > 0 {
                return Err(GridError::Validation(format!(
                    "profile column {} has missing values",
                    id
                )));
            }
            columns.push(id);
            cast.push(values.cast(&DataType::Float64)?);
        }
        check_unique(&columns)?;

        Ok(Self {
            frame: DataFrame::new(cast)?,
            columns,
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        match self.frame.column(TIMESTAMP_COLUMN).and_then(|s| s.i64().cloned()) {
            Ok(millis) => millis
                .into_iter()
                .flatten()
                .filter_map(DateTime::<Utc>::from_timestamp_millis)
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.frame.height()
    }

    /// Copy of one column, top to bottom.
    pub fn column(&self, id: usize) -> Option<Vec<f64>> {
        let values = self.frame.column(&id.to_string()).ok()?.f64().ok()?;
        values.into_iter().collect()
    }

    /// Multiply every value of column `id` by `factor`.
    pub fn scale_column(&mut self, id: usize, factor: f64) -> GridResult<()> {
        if !self.columns.contains(&id) {
            return Err(GridError::Lookup(format!("profile has no column {}", id)));
        }
        let name = id.to_string();
        self.frame = self
            .frame
            .clone()
            .lazy()
            .with_column(col(&name) * lit(factor))
            .collect()?;
        Ok(())
    }
}

fn check_unique(columns: &[usize]) -> GridResult<()> {
    let mut seen = std::collections::HashSet::with_capacity(columns.len());
    match columns.iter().find(|id| !seen.insert(**id)) {
        Some(id) => Err(GridError::Validation(format!(
            "duplicate profile column {}",
            id
        ))),
        None => Ok(()),
    }
}
