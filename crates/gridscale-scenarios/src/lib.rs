//! Change-table scaling of grids and resource profiles.
//!
//! A [`ChangeTable`] holds multiplicative edits keyed by category
//! (generation type, branch, dcline, storage, new_dcline, demand) and scope
//! (zone or asset id). [`GridScaler`] applies it to a base grid and to the
//! scenario's hydro, solar, wind and demand profiles without modifying the
//! inputs.
//!
//! ```no_run
//! use gridscale_io::{GridDirectory, ScenarioStore};
//! use gridscale_scenarios::{GridScaler, ScalerOptions, ScenarioInfo};
//!
//! let info = ScenarioInfo::new("87", "Eastern_Western", true);
//! let scaler = GridScaler::from_scenario(
//!     &info,
//!     &GridDirectory::new("data/grid"),
//!     ScenarioStore::new("data/scenarios"),
//!     ScalerOptions::default(),
//! )?;
//! let grid = scaler.get_grid()?;
//! let wind = scaler.get_wind()?;
//! # Ok::<(), gridscale_core::GridError>(())
//! ```

pub mod apply;
pub mod change_table;
pub mod config;
pub mod profile;
pub mod scaler;

pub use apply::{apply_change_table_to_grid, ScalerOptions, NEW_DCLINE_PT_RATIO};
pub use change_table::{
    load_change_table_from_path, Category, CategoryEdits, ChangeTable, NewDcLine, ScaleFactors,
    Scope,
};
pub use config::{DataConfig, ScalerConfig};
pub use profile::{
    apply_change_table_to_demand, apply_change_table_to_profile, profile_categories,
};
pub use scaler::{GridScaler, ScenarioInfo};
