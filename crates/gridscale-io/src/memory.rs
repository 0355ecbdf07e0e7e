//! In-memory implementation of both collaborator traits.
//!
//! Useful when the caller already holds its grid and profiles, and in tests:
//! every fetch is counted so a test can assert that nothing was loaded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use gridscale_core::{Grid, GridError, GridResult, Profile};

use crate::source::{ChangeTableDocument, GridLoader, InputSource, ResourceKind};

#[derive(Debug, Default)]
pub struct InMemorySource {
    grids: HashMap<String, Grid>,
    change_tables: HashMap<String, ChangeTableDocument>,
    profiles: HashMap<(String, ResourceKind), Profile>,
    grid_fetches: AtomicUsize,
    data_fetches: AtomicUsize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid(mut self, interconnect: impl Into<String>, grid: Grid) -> Self {
        self.grids.insert(interconnect.into(), grid);
        self
    }

    pub fn with_change_table(
        mut self,
        scenario_id: impl Into<String>,
        document: ChangeTableDocument,
    ) -> Self {
        self.change_tables.insert(scenario_id.into(), document);
        self
    }

    pub fn with_profile(
        mut self,
        scenario_id: impl Into<String>,
        kind: ResourceKind,
        profile: Profile,
    ) -> Self {
        self.profiles.insert((scenario_id.into(), kind), profile);
        self
    }

    pub fn grid_fetches(&self) -> usize {
        self.grid_fetches.load(Ordering::Relaxed)
    }

    /// Number of change table and profile fetches, successful or not.
    pub fn data_fetches(&self) -> usize {
        self.data_fetches.load(Ordering::Relaxed)
    }
}

impl GridLoader for InMemorySource {
    fn load_grid(&self, interconnects: &[String]) -> GridResult<Grid> {
        self.grid_fetches.fetch_add(1, Ordering::Relaxed);
        let mut grid = Grid::new();
        for (i, name) in interconnects.iter().enumerate() {
            let part = self
                .grids
                .get(name)
                .ok_or_else(|| GridError::NotFound(format!("grid for interconnect '{}'", name)))?
                .clone();
            if i == 0 {
                grid.storage.parameters = part.storage.parameters.clone();
            }
            grid.merge(part)?;
        }
        Ok(grid)
    }
}

impl InputSource for InMemorySource {
    fn load_change_table(&self, scenario_id: &str) -> GridResult<ChangeTableDocument> {
        self.data_fetches.fetch_add(1, Ordering::Relaxed);
        self.change_tables
            .get(scenario_id)
            .cloned()
            .ok_or_else(|| {
                GridError::NotFound(format!("change table for scenario '{}'", scenario_id))
            })
    }

    fn load_profile(&self, scenario_id: &str, kind: ResourceKind) -> GridResult<Profile> {
        self.data_fetches.fetch_add(1, Ordering::Relaxed);
        self.profiles
            .get(&(scenario_id.to_string(), kind))
            .cloned()
            .ok_or_else(|| {
                GridError::NotFound(format!("{} profile for scenario '{}'", kind, scenario_id))
            })
    }
}
