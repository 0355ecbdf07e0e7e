use gridscale_core::{Grid, GridError, GridResult, Profile, ScaleDiagnostics};
use gridscale_io::{GridLoader, InputSource, ResourceKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::apply::{apply_change_table_to_grid, ScalerOptions};
use crate::change_table::ChangeTable;
use crate::profile::{apply_change_table_to_demand, apply_change_table_to_profile};

/// Scenario metadata needed to assemble a scaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioInfo {
    pub id: String,
    /// Interconnect names joined by `_`, e.g. `Eastern_Western`
    pub interconnect: String,
    /// Whether the scenario has a change table upstream
    #[serde(default)]
    pub change_table: bool,
}

impl ScenarioInfo {
    pub fn new(id: impl Into<String>, interconnect: impl Into<String>, change_table: bool) -> Self {
        Self {
            id: id.into(),
            interconnect: interconnect.into(),
            change_table,
        }
    }

    pub fn interconnects(&self) -> Vec<String> {
        self.interconnect
            .split('_')
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Applies one scenario's change table to its base grid and profiles.
///
/// The base grid and change table are never modified; every `get_*` call
/// works on a fresh copy, so repeated calls return equal results.
#[derive(Debug)]
pub struct GridScaler<S> {
    scenario_id: String,
    base_grid: Grid,
    change_table: ChangeTable,
    source: S,
    options: ScalerOptions,
}

impl<S: InputSource> GridScaler<S> {
    pub fn new(
        scenario_id: impl Into<String>,
        base_grid: Grid,
        change_table: ChangeTable,
        source: S,
    ) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            base_grid,
            change_table,
            source,
            options: ScalerOptions::default(),
        }
    }

    /// Load the base grid and, when the scenario has one, the change table.
    pub fn from_scenario<L: GridLoader>(
        info: &ScenarioInfo,
        grid_loader: &L,
        source: S,
        options: ScalerOptions,
    ) -> GridResult<Self> {
        let interconnects = info.interconnects();
        if interconnects.is_empty() {
            return Err(GridError::InvalidArgument(format!(
                "scenario '{}' names no interconnect",
                info.id
            )));
        }
        let base_grid = grid_loader.load_grid(&interconnects)?;
        let change_table = if info.change_table {
            ChangeTable::from_document(&source.load_change_table(&info.id)?)?
        } else {
            ChangeTable::new()
        };
        info!(
            scenario = %info.id,
            interconnect = %info.interconnect,
            plants = base_grid.plant.len(),
            categories = change_table.categories().count(),
            "scaler ready"
        );
        Ok(Self::new(info.id.clone(), base_grid, change_table, source).with_options(options))
    }

    pub fn with_options(mut self, options: ScalerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn scenario_id(&self) -> &str {
        &self.scenario_id
    }

    pub fn base_grid(&self) -> &Grid {
        &self.base_grid
    }

    pub fn change_table(&self) -> &ChangeTable {
        &self.change_table
    }

    pub fn options(&self) -> &ScalerOptions {
        &self.options
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Scaled copy of the base grid.
    pub fn get_grid(&self) -> GridResult<Grid> {
        let (grid, diag) = self.get_grid_with_diagnostics()?;
        for issue in &diag.issues {
            debug!(scenario = %self.scenario_id, %issue, "grid scaling note");
        }
        Ok(grid)
    }

    pub fn get_grid_with_diagnostics(&self) -> GridResult<(Grid, ScaleDiagnostics)> {
        let mut grid = self.base_grid.clone();
        if self.change_table.is_empty() {
            return Ok((grid, ScaleDiagnostics::new()));
        }
        let diag = apply_change_table_to_grid(&mut grid, &self.change_table, &self.options)?;
        debug!(scenario = %self.scenario_id, summary = %diag.summary(), "grid scaled");
        Ok((grid, diag))
    }

    /// Scaled hydro, solar or wind profile. `Demand` is rejected before any
    /// fetch; use [`GridScaler::get_demand`].
    pub fn get_profile(&self, kind: ResourceKind) -> GridResult<Profile> {
        let (profile, diag) = self.get_profile_with_diagnostics(kind)?;
        for issue in &diag.issues {
            debug!(scenario = %self.scenario_id, %kind, %issue, "profile scaling note");
        }
        Ok(profile)
    }

    pub fn get_profile_with_diagnostics(
        &self,
        kind: ResourceKind,
    ) -> GridResult<(Profile, ScaleDiagnostics)> {
        if !kind.is_power_output() {
            return Err(GridError::InvalidArgument(format!(
                "'{}' is not a power output profile",
                kind
            )));
        }
        let mut profile = self.source.load_profile(&self.scenario_id, kind)?;
        let mut diag = ScaleDiagnostics::new();
        apply_change_table_to_profile(
            &mut profile,
            &self.base_grid,
            &self.change_table,
            kind,
            &mut diag,
        )?;
        Ok((profile, diag))
    }

    /// [`GridScaler::get_profile`] for a resource name such as `"wind"`.
    pub fn get_profile_by_name(&self, name: &str) -> GridResult<Profile> {
        let kind: ResourceKind = name.parse()?;
        self.get_profile(kind)
    }

    pub fn get_hydro(&self) -> GridResult<Profile> {
        self.get_profile(ResourceKind::Hydro)
    }

    pub fn get_solar(&self) -> GridResult<Profile> {
        self.get_profile(ResourceKind::Solar)
    }

    pub fn get_wind(&self) -> GridResult<Profile> {
        self.get_profile(ResourceKind::Wind)
    }

    /// Scaled demand profile (one column per zone id).
    pub fn get_demand(&self) -> GridResult<Profile> {
        let (demand, diag) = self.get_demand_with_diagnostics()?;
        for issue in &diag.issues {
            debug!(scenario = %self.scenario_id, %issue, "demand scaling note");
        }
        Ok(demand)
    }

    pub fn get_demand_with_diagnostics(&self) -> GridResult<(Profile, ScaleDiagnostics)> {
        let mut demand = self
            .source
            .load_profile(&self.scenario_id, ResourceKind::Demand)?;
        let mut diag = ScaleDiagnostics::new();
        apply_change_table_to_demand(&mut demand, &self.base_grid, &self.change_table, &mut diag)?;
        Ok((demand, diag))
    }
}
