//! Collaborator interfaces consumed by the scaler.
//!
//! [`GridLoader`] builds the base topology for a set of interconnects and
//! [`InputSource`] retrieves per-scenario inputs: the change table and the
//! unscaled resource profiles. Both fail with [`GridError::NotFound`] when
//! the requested item does not exist.

use std::fmt;
use std::str::FromStr;

use gridscale_core::{Grid, GridError, GridResult, Profile};
use serde::{Deserialize, Serialize};

/// Raw change table as stored upstream: category → scope → id → value, or
/// a list of descriptors for `new_dcline`. Validated by the scenarios crate.
pub type ChangeTableDocument = serde_json::Value;

/// Time-series input kinds a scenario can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Hydro,
    Solar,
    Wind,
    Demand,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Hydro => "hydro",
            ResourceKind::Solar => "solar",
            ResourceKind::Wind => "wind",
            ResourceKind::Demand => "demand",
        }
    }

    /// Kinds whose columns are plant ids.
    pub fn is_power_output(&self) -> bool {
        !matches!(self, ResourceKind::Demand)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = GridError;

    fn from_str(s: &str) -> GridResult<Self> {
        match s {
            "hydro" => Ok(ResourceKind::Hydro),
            "solar" => Ok(ResourceKind::Solar),
            "wind" => Ok(ResourceKind::Wind),
            "demand" => Ok(ResourceKind::Demand),
            other => Err(GridError::InvalidArgument(format!(
                "invalid resource: {}; choose one of hydro, solar, wind, demand",
                other
            ))),
        }
    }
}

/// Loads the base grid for a list of interconnect names.
pub trait GridLoader {
    fn load_grid(&self, interconnects: &[String]) -> GridResult<Grid>;
}

/// Retrieves the inputs attached to a scenario id.
pub trait InputSource {
    fn load_change_table(&self, scenario_id: &str) -> GridResult<ChangeTableDocument>;

    fn load_profile(&self, scenario_id: &str, kind: ResourceKind) -> GridResult<Profile>;
}

impl<T: GridLoader + ?Sized> GridLoader for &T {
    fn load_grid(&self, interconnects: &[String]) -> GridResult<Grid> {
        (**self).load_grid(interconnects)
    }
}

impl<T: InputSource + ?Sized> InputSource for &T {
    fn load_change_table(&self, scenario_id: &str) -> GridResult<ChangeTableDocument> {
        (**self).load_change_table(scenario_id)
    }

    fn load_profile(&self, scenario_id: &str, kind: ResourceKind) -> GridResult<Profile> {
        (**self).load_profile(scenario_id, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resource_names() {
        assert_eq!("wind".parse::<ResourceKind>().unwrap(), ResourceKind::Wind);
        assert_eq!(ResourceKind::Demand.to_string(), "demand");
        assert!(!ResourceKind::Demand.is_power_output());
    }

    #[test]
    fn unknown_resource_is_invalid_argument() {
        let err = "coal".parse::<ResourceKind>().unwrap_err();
        assert!(matches!(err, GridError::InvalidArgument(_)));
        assert!(err.to_string().contains("coal"));
    }
}
