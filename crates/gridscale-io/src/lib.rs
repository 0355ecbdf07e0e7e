//! Grid and scenario input loading.
//!
//! The scaler consumes two capabilities, defined in [`source`]:
//!
//! - [`GridLoader`]: build the base [`gridscale_core::Grid`] for a list of
//!   interconnects
//! - [`InputSource`]: fetch a scenario's change table document or one of its
//!   resource profiles
//!
//! Two implementations ship with the crate: [`GridDirectory`] and
//! [`ScenarioStore`] read CSV tables and JSON/YAML change tables from disk,
//! and [`InMemorySource`] serves values the caller already holds.
//!
//! ## Quick Example
//!
//! ```no_run
//! use gridscale_io::{GridDirectory, GridLoader, InputSource, ResourceKind, ScenarioStore};
//!
//! let grid = GridDirectory::new("data/grid").load_grid(&["Western".to_string()])?;
//! let wind = ScenarioStore::new("data/scenarios").load_profile("87", ResourceKind::Wind)?;
//! println!("{} plants, {} wind columns", grid.plant.len(), wind.columns().len());
//! # Ok::<(), gridscale_core::GridError>(())
//! ```

pub mod grid_dir;
pub mod memory;
pub mod scenario_store;
pub mod source;

pub use grid_dir::GridDirectory;
pub use memory::InMemorySource;
pub use scenario_store::{read_profile_csv, write_profile_csv, ScenarioStore};
pub use source::{ChangeTableDocument, GridLoader, InputSource, ResourceKind};
