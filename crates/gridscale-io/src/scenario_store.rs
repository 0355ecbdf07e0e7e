//! Directory-backed scenario inputs.
//!
//! **Layout:**
//! ```text
//! <root>/
//!   <scenario_id>/
//!     ct.json | ct.yaml | ct.yml    change table
//!     hydro.csv, solar.csv, wind.csv, demand.csv
//! ```
//!
//! Profile CSVs carry a timestamp column first (header `UTC`, RFC 3339 or
//! `%Y-%m-%d %H:%M:%S`, interpreted as UTC) followed by one column per asset
//! id (plant id, or zone id for demand).

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use gridscale_core::profile::TIMESTAMP_COLUMN;
use gridscale_core::{GridError, GridResult, Profile};
use polars::prelude::*;
use tracing::debug;

use crate::source::{ChangeTableDocument, InputSource, ResourceKind};

const CHANGE_TABLE_FILES: [&str; 3] = ["ct.json", "ct.yaml", "ct.yml"];

/// [`InputSource`] over a directory of per-scenario folders.
#[derive(Debug, Clone)]
pub struct ScenarioStore {
    root: PathBuf,
}

impl ScenarioStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scenario_dir(&self, scenario_id: &str) -> PathBuf {
        self.root.join(sanitize_name(scenario_id))
    }

    pub fn profile_path(&self, scenario_id: &str, kind: ResourceKind) -> PathBuf {
        self.scenario_dir(scenario_id)
            .join(format!("{}.csv", kind.as_str()))
    }
}

impl InputSource for ScenarioStore {
    fn load_change_table(&self, scenario_id: &str) -> GridResult<ChangeTableDocument> {
        let dir = self.scenario_dir(scenario_id);
        let path = CHANGE_TABLE_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| {
                GridError::NotFound(format!(
                    "change table for scenario '{}' in {}",
                    scenario_id,
                    dir.display()
                ))
            })?;
        debug!(scenario = %scenario_id, path = %path.display(), "loading change table");
        Ok(read_document(&path)?)
    }

    fn load_profile(&self, scenario_id: &str, kind: ResourceKind) -> GridResult<Profile> {
        let path = self.profile_path(scenario_id, kind);
        if !path.is_file() {
            return Err(GridError::NotFound(format!(
                "{} profile for scenario '{}' ({})",
                kind,
                scenario_id,
                path.display()
            )));
        }
        debug!(scenario = %scenario_id, %kind, path = %path.display(), "loading profile");
        Ok(read_profile_csv(&path)?)
    }
}

fn read_document(path: &Path) -> Result<ChangeTableDocument> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading change table '{}'", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing change table yaml")
        }
        _ => serde_json::from_str(&data).context("parsing change table json"),
    }
}

/// Read a profile CSV (timestamp column first, asset id headers after).
///
/// The timestamp column is stored as `UTC` epoch milliseconds whatever its
/// header; value columns go through [`Profile::from_frame`].
pub fn read_profile_csv(path: &Path) -> Result<Profile> {
    let file = File::open(path).with_context(|| format!("opening profile '{}'", path.display()))?;
    let mut df = CsvReader::new(file)
        .has_header(true)
        .finish()
        .with_context(|| format!("parsing profile '{}'", path.display()))?;

    let millis = {
        let stamps = df
            .get_columns()
            .first()
            .ok_or_else(|| anyhow!("profile '{}' has no columns", path.display()))?
            .utf8()
            .with_context(|| format!("timestamp column of '{}' is not text", path.display()))?;
        stamps
            .into_iter()
            .enumerate()
            .map(|(line, stamp)| {
                let stamp = stamp.ok_or_else(|| anyhow!("record {} has no timestamp", line + 1))?;
                Ok(parse_timestamp(stamp.trim())?.timestamp_millis())
            })
            .collect::<Result<Vec<i64>>>()?
    };
    df.replace_column(0, Series::new(TIMESTAMP_COLUMN, millis))?;

    Profile::from_frame(df).with_context(|| format!("building profile from '{}'", path.display()))
}

/// Write a profile as CSV in the layout [`read_profile_csv`] accepts.
pub fn write_profile_csv(path: &Path, profile: &Profile) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating profile directory '{}'", parent.display()))?;
    }
    let stamps: Vec<String> = profile
        .timestamps()
        .iter()
        .map(|stamp| stamp.to_rfc3339_opts(SecondsFormat::Secs, true))
        .collect();
    let mut out = profile.frame().clone();
    out.replace_column(0, Series::new(TIMESTAMP_COLUMN, stamps))?;

    let mut file =
        File::create(path).with_context(|| format!("creating profile '{}'", path.display()))?;
    CsvWriter::new(&mut file)
        .finish(&mut out)
        .with_context(|| format!("writing profile '{}'", path.display()))?;
    Ok(())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .with_context(|| format!("parsing timestamp '{}'; use RFC3339", value))
}

fn sanitize_name(value: &str) -> String {
    let filtered: String = value
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    if filtered.is_empty() {
        "scenario".to_string()
    } else if filtered.chars().all(|c| c == '.') {
        filtered.replace('.', "_")
    } else {
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_profile_with_both_timestamp_formats() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("87");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("wind.csv"),
            "UTC,5,9\n2016-01-01 00:00:00,1.0,2.0\n2016-01-01T01:00:00Z,3.0,4.0\n",
        )
        .unwrap();

        let profile = ScenarioStore::new(tmp.path())
            .load_profile("87", ResourceKind::Wind)
            .unwrap();

        assert_eq!(profile.columns(), &[5, 9]);
        assert_eq!(profile.n_rows(), 2);
        assert_eq!(profile.column(9).unwrap(), vec![2.0, 4.0]);
    }

    #[test]
    fn missing_inputs_are_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = ScenarioStore::new(tmp.path());

        assert!(store.load_change_table("1").unwrap_err().is_not_found());
        assert!(store
            .load_profile("1", ResourceKind::Solar)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn reads_yaml_change_table() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("3");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("ct.yaml"), "coal:\n  zone_id:\n    '1': 2.0\n").unwrap();

        let doc = ScenarioStore::new(tmp.path())
            .load_change_table("3")
            .unwrap();
        assert!(doc.get("coal").is_some());
    }

    #[test]
    fn profile_csv_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out").join("demand.csv");
        let stamps = vec![
            parse_timestamp("2016-01-01T00:00:00Z").unwrap(),
            parse_timestamp("2016-01-01T01:00:00Z").unwrap(),
        ];
        let profile =
            Profile::from_rows(stamps, vec![301], vec![vec![1200.5], vec![1180.25]]).unwrap();

        write_profile_csv(&path, &profile).unwrap();
        assert_eq!(read_profile_csv(&path).unwrap(), profile);
    }

    #[test]
    fn rejects_non_numeric_headers() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hydro.csv");
        fs::write(&path, "UTC,plant_a\n2016-01-01T00:00:00Z,1.0\n").unwrap();
        assert!(read_profile_csv(&path).is_err());
    }

    #[test]
    fn dot_names_stay_under_root() {
        let tmp = TempDir::new().unwrap();
        let store = ScenarioStore::new(tmp.path());

        for name in ["..", ".", "../.."] {
            let dir = store.scenario_dir(name);
            assert_eq!(dir.parent(), Some(tmp.path()), "{name}");
        }
        assert_eq!(store.scenario_dir("..").file_name().unwrap(), "__");
        assert_eq!(store.scenario_dir("v1.2").file_name().unwrap(), "v1.2");
    }

    #[test]
    fn integer_values_load_as_floats() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("demand.csv");
        fs::write(&path, "UTC,1,2\n2016-01-01T00:00:00Z,800,40\n").unwrap();

        let profile = read_profile_csv(&path).unwrap();
        assert_eq!(profile.column(1).unwrap(), vec![800.0]);
        assert_eq!(profile.frame().column("UTC").unwrap().dtype(), &DataType::Int64);
    }
}
