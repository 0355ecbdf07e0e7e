//! Scaler configuration.
//!
//! [`ScalerConfig`] is stored as TOML, by default in
//! `~/.gridscale/config.toml`. Partial files are accepted; unspecified values
//! use the defaults below.

use std::fs;
use std::path::{Path, PathBuf};

use gridscale_core::{GridError, GridResult};
use gridscale_io::{GridDirectory, ScenarioStore};
use serde::{Deserialize, Serialize};

use crate::apply::ScalerOptions;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalerConfig {
    pub data: DataConfig,
    pub scaling: ScalerOptions,
}

/// Locations of the directory-backed stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root holding one folder of grid CSVs per interconnect.
    pub grid_root: PathBuf,

    /// Root holding one folder of inputs per scenario.
    pub scenario_root: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            grid_root: PathBuf::from("data/grid"),
            scenario_root: PathBuf::from("data/scenarios"),
        }
    }
}

impl ScalerConfig {
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".gridscale"))
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Load from the default location, or defaults if there is no file.
    pub fn load() -> GridResult<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> GridResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| GridError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> GridResult<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| GridError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> GridResult<()> {
        let ratio = self.scaling.new_dcline_pt_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(GridError::Config(format!(
                "scaling.new_dcline_pt_ratio must be in (0, 1], got {}",
                ratio
            )));
        }
        Ok(())
    }

    /// Directory stores rooted at the configured paths.
    pub fn open_stores(&self) -> (GridDirectory, ScenarioStore) {
        (
            GridDirectory::new(&self.data.grid_root),
            ScenarioStore::new(&self.data.scenario_root),
        )
    }
}
