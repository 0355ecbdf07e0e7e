//! # gridscale-core: Grid and Profile Data Model
//!
//! Provides the table-based topology model that change tables are applied to,
//! and the time-series [`Profile`] type for hydro, solar, wind and demand.
//!
//! ## Design Philosophy
//!
//! A [`Grid`] is a bundle of id-indexed [`Table`]s (plant, gencost, branch,
//! dcline, bus) plus the storage bundle and the zone name map. Every table is
//! a plain value: `Clone` copies every row and preserves indices, so scaling
//! code always works on a private copy and the base grid stays untouched.
//!
//! ## Quick Start
//!
//! ```rust
//! use gridscale_core::*;
//!
//! let mut grid = Grid::new();
//! grid.id2zone.insert(ZoneId::new(1), "Washington".to_string());
//! grid.bus
//!     .insert(BusId::new(10), Bus::new(ZoneId::new(1), "Western"))
//!     .unwrap();
//! grid.plant
//!     .insert(
//!         PlantId::new(100),
//!         Plant::new(BusId::new(10), ZoneId::new(1), GenType::Ng).with_p_limits(10.0, 100.0),
//!     )
//!     .unwrap();
//!
//! assert_eq!(grid.plants_in_zone(ZoneId::new(1), GenType::Ng), vec![PlantId::new(100)]);
//! assert!(grid.plants_in_zone(ZoneId::new(2), GenType::Ng).is_empty());
//! ```
//!
//! ## ID System
//!
//! Every element has a typed id (newtype wrapper around `usize`) so plant ids
//! can't be confused with bus or zone ids: [`BusId`], [`PlantId`],
//! [`BranchId`], [`DcLineId`], [`ZoneId`].
//!
//! ## Modules
//!
//! - [`table`] - insertion-ordered id-indexed row storage
//! - [`profile`] - timestamp × asset matrices
//! - [`diagnostics`] - non-fatal notes collected during scaling
//! - [`error`] - the [`GridError`] type

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod diagnostics;
pub mod error;
pub mod profile;
pub mod table;

pub use diagnostics::{DiagnosticIssue, ScaleDiagnostics, ScaleStats};
pub use error::{GridError, GridResult};
pub use profile::Profile;
pub use table::Table;

// Newtype wrappers for IDs for type safety
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BusId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlantId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DcLineId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(usize);

impl BusId {
    #[inline]
    pub const fn new(value: usize) -> Self {
        BusId(value)
    }
    #[inline]
    pub const fn value(&self) -> usize {
        self.0
    }
}

impl PlantId {
    #[inline]
    pub const fn new(value: usize) -> Self {
        PlantId(value)
    }
    #[inline]
    pub const fn value(&self) -> usize {
        self.0
    }
}

impl BranchId {
    #[inline]
    pub const fn new(value: usize) -> Self {
        BranchId(value)
    }
    #[inline]
    pub const fn value(&self) -> usize {
        self.0
    }
}

impl DcLineId {
    #[inline]
    pub const fn new(value: usize) -> Self {
        DcLineId(value)
    }
    #[inline]
    pub const fn value(&self) -> usize {
        self.0
    }
}

impl ZoneId {
    #[inline]
    pub const fn new(value: usize) -> Self {
        ZoneId(value)
    }
    #[inline]
    pub const fn value(&self) -> usize {
        self.0
    }
}

/// Generation technology of a plant.
///
/// [`GenType::ALL`] lists the types in canonical order; change tables are
/// applied to generation in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenType {
    Biomass,
    Coal,
    Dfo,
    Geothermal,
    Ng,
    Nuclear,
    Hydro,
    Solar,
    Wind,
    WindOffshore,
    Other,
}

impl GenType {
    pub const ALL: [GenType; 11] = [
        GenType::Biomass,
        GenType::Coal,
        GenType::Dfo,
        GenType::Geothermal,
        GenType::Ng,
        GenType::Nuclear,
        GenType::Hydro,
        GenType::Solar,
        GenType::Wind,
        GenType::WindOffshore,
        GenType::Other,
    ];

    /// Thermal plants carry a cost curve that follows capacity edits.
    pub fn is_thermal(&self) -> bool {
        matches!(
            self,
            GenType::Coal | GenType::Dfo | GenType::Geothermal | GenType::Ng | GenType::Nuclear
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenType::Biomass => "biomass",
            GenType::Coal => "coal",
            GenType::Dfo => "dfo",
            GenType::Geothermal => "geothermal",
            GenType::Ng => "ng",
            GenType::Nuclear => "nuclear",
            GenType::Hydro => "hydro",
            GenType::Solar => "solar",
            GenType::Wind => "wind",
            GenType::WindOffshore => "wind_offshore",
            GenType::Other => "other",
        }
    }
}

impl fmt::Display for GenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenType {
    type Err = GridError;

    fn from_str(s: &str) -> GridResult<Self> {
        GenType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| GridError::Parse(format!("unknown generation type '{}'", s)))
    }
}

// Basic component rows

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    /// MATPOWER bus type (1 = PQ, 2 = PV, 3 = slack)
    pub bus_type: u8,
    /// Real power demand (MW)
    pub pd: f64,
    /// Reactive power demand (MVAr)
    pub qd: f64,
    pub zone_id: ZoneId,
    pub base_kv: f64,
    pub interconnect: String,
}

impl Bus {
    pub fn new(zone_id: ZoneId, interconnect: impl Into<String>) -> Self {
        Self {
            bus_type: 1,
            pd: 0.0,
            qd: 0.0,
            zone_id,
            base_kv: 0.0,
            interconnect: interconnect.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub bus_id: BusId,
    pub zone_id: ZoneId,
    pub gen_type: GenType,
    /// Real power output (MW)
    pub pg: f64,
    pub status: bool,
    /// Maximum real power output (MW)
    pub pmax: f64,
    /// Minimum real power output (MW)
    pub pmin: f64,
    pub interconnect: String,
}

impl Plant {
    pub fn new(bus_id: BusId, zone_id: ZoneId, gen_type: GenType) -> Self {
        Self {
            bus_id,
            zone_id,
            gen_type,
            pg: 0.0,
            status: true,
            pmax: 0.0,
            pmin: 0.0,
            interconnect: String::new(),
        }
    }

    /// Set active power limits (in MW)
    pub fn with_p_limits(mut self, pmin: f64, pmax: f64) -> Self {
        self.pmin = pmin;
        self.pmax = pmax;
        self
    }
}

/// Polynomial generator cost curve: `cost = c0 + c1*P + c2*P^2`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenCost {
    /// MATPOWER cost model (1 = piecewise linear, 2 = polynomial)
    pub curve_type: u8,
    pub startup: f64,
    pub shutdown: f64,
    /// Number of coefficients
    pub n: u8,
    pub c2: f64,
    pub c1: f64,
    pub c0: f64,
}

impl GenCost {
    pub fn quadratic(c0: f64, c1: f64, c2: f64) -> Self {
        Self {
            curve_type: 2,
            n: 3,
            c2,
            c1,
            c0,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub from_bus_id: BusId,
    pub to_bus_id: BusId,
    pub from_zone_id: ZoneId,
    pub to_zone_id: ZoneId,
    /// Series resistance (per-unit)
    pub r: f64,
    /// Series reactance (per-unit)
    pub x: f64,
    /// Total line charging susceptance (per-unit)
    pub b: f64,
    /// Normal rating (MVA)
    pub rate_a: f64,
    pub rate_b: f64,
    pub rate_c: f64,
    pub status: bool,
    pub interconnect: String,
}

impl Branch {
    pub fn new(
        from_bus_id: BusId,
        to_bus_id: BusId,
        from_zone_id: ZoneId,
        to_zone_id: ZoneId,
    ) -> Self {
        Self {
            from_bus_id,
            to_bus_id,
            from_zone_id,
            to_zone_id,
            r: 0.0,
            x: 0.0,
            b: 0.0,
            rate_a: 0.0,
            rate_b: 0.0,
            rate_c: 0.0,
            status: true,
            interconnect: String::new(),
        }
    }

    pub fn with_rating(mut self, rate_a: f64, x: f64) -> Self {
        self.rate_a = rate_a;
        self.x = x;
        self
    }

    pub fn is_within_zone(&self, zone: ZoneId) -> bool {
        self.from_zone_id == zone && self.to_zone_id == zone
    }
}

/// MATPOWER-style DC line row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcLine {
    pub from_bus_id: BusId,
    pub to_bus_id: BusId,
    pub status: bool,
    /// Flow at the from end (MW)
    pub pf: f64,
    /// Flow at the to end (MW)
    pub pt: f64,
    pub qf: f64,
    pub qt: f64,
    pub vf: f64,
    pub vt: f64,
    pub pmin: f64,
    pub pmax: f64,
    pub qminf: f64,
    pub qmaxf: f64,
    pub qmint: f64,
    pub qmaxt: f64,
    pub loss0: f64,
    pub loss1: f64,
    pub from_interconnect: String,
    pub to_interconnect: String,
}

impl DcLine {
    /// A line with every electrical field zeroed and status off.
    pub fn new(from_bus_id: BusId, to_bus_id: BusId) -> Self {
        Self {
            from_bus_id,
            to_bus_id,
            status: false,
            pf: 0.0,
            pt: 0.0,
            qf: 0.0,
            qt: 0.0,
            vf: 0.0,
            vt: 0.0,
            pmin: 0.0,
            pmax: 0.0,
            qminf: 0.0,
            qmaxf: 0.0,
            qmint: 0.0,
            qmaxt: 0.0,
            loss0: 0.0,
            loss1: 0.0,
            from_interconnect: String::new(),
            to_interconnect: String::new(),
        }
    }

    pub fn with_p_limits(mut self, pmin: f64, pmax: f64) -> Self {
        self.pmin = pmin;
        self.pmax = pmax;
        self
    }
}

/// Generator row of a storage unit (MATPOWER gen columns).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StorageGen {
    pub bus_id: BusId,
    pub pg: f64,
    pub qg: f64,
    pub qmax: f64,
    pub qmin: f64,
    pub vg: f64,
    pub mbase: f64,
    pub status: bool,
    pub pmax: f64,
    pub pmin: f64,
    pub pc1: f64,
    pub pc2: f64,
    pub qc1min: f64,
    pub qc1max: f64,
    pub qc2min: f64,
    pub qc2max: f64,
    pub ramp_agc: f64,
    pub ramp_10: f64,
    pub ramp_30: f64,
    pub ramp_q: f64,
    pub apf: f64,
}

/// Energy-level bounds and prices of a storage unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageData {
    pub unit_idx: usize,
    pub expected_terminal_storage_max: f64,
    pub expected_terminal_storage_min: f64,
    pub initial_storage: f64,
    pub initial_storage_lower_bound: f64,
    pub initial_storage_upper_bound: f64,
    pub initial_storage_cost: f64,
    pub terminal_storage_price: f64,
    pub min_storage_level: f64,
    pub max_storage_level: f64,
    pub out_eff: f64,
    pub in_eff: f64,
    pub loss_factor: f64,
    #[serde(rename = "rho")]
    pub rho: f64,
}

/// Scalar parameters shared by every storage unit of a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageParameters {
    /// Hours of full-power discharge
    pub duration: f64,
    /// Minimum state of charge (fraction of energy capacity)
    pub min_stor: f64,
    /// Maximum state of charge (fraction of energy capacity)
    pub max_stor: f64,
    /// Value of stored energy ($/MWh)
    pub energy_price: f64,
    #[serde(rename = "InEff")]
    pub in_eff: f64,
    #[serde(rename = "OutEff")]
    pub out_eff: f64,
}

impl Default for StorageParameters {
    fn default() -> Self {
        Self {
            duration: 4.0,
            min_stor: 0.05,
            max_stor: 0.95,
            energy_price: 20.0,
            in_eff: 0.9,
            out_eff: 0.9,
        }
    }
}

/// Storage bundle. The four row collections are positionally aligned: row
/// `i` of `gen`, `gencost`, `genfuel` and `storage_data` describe one unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Storage {
    pub gen: Vec<StorageGen>,
    pub gencost: Vec<GenCost>,
    pub genfuel: Vec<String>,
    pub storage_data: Vec<StorageData>,
    pub parameters: StorageParameters,
}

impl Storage {
    pub fn len(&self) -> usize {
        self.gen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gen.is_empty()
    }
}

/// Grid snapshot: component tables keyed by their element ids.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grid {
    pub interconnects: Vec<String>,
    pub plant: Table<PlantId, Plant>,
    /// Cost curves before any linearization, keyed by plant id
    pub gencost: Table<PlantId, GenCost>,
    pub branch: Table<BranchId, Branch>,
    pub dcline: Table<DcLineId, DcLine>,
    pub bus: Table<BusId, Bus>,
    pub storage: Storage,
    pub id2zone: BTreeMap<ZoneId, String>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plants of `gen_type` located in `zone`, in table order. Empty when the
    /// group has no members.
    pub fn plants_in_zone(&self, zone: ZoneId, gen_type: GenType) -> Vec<PlantId> {
        self.plant
            .iter()
            .filter(|(_, plant)| plant.zone_id == zone && plant.gen_type == gen_type)
            .map(|(id, _)| id)
            .collect()
    }

    /// Branches whose both ends lie in `zone`, in table order.
    pub fn branches_within_zone(&self, zone: ZoneId) -> Vec<BranchId> {
        self.branch
            .iter()
            .filter(|(_, branch)| branch.is_within_zone(zone))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn zone_name(&self, zone: ZoneId) -> Option<&str> {
        self.id2zone.get(&zone).map(String::as_str)
    }

    /// Concatenate `other` into this grid. Ids must not collide.
    pub fn merge(&mut self, other: Grid) -> GridResult<()> {
        for name in other.interconnects {
            if !self.interconnects.contains(&name) {
                self.interconnects.push(name);
            }
        }
        self.plant.extend(other.plant.iter().map(|(k, r)| (k, r.clone())).collect())?;
        self.gencost
            .extend(other.gencost.iter().map(|(k, r)| (k, r.clone())).collect())?;
        self.branch
            .extend(other.branch.iter().map(|(k, r)| (k, r.clone())).collect())?;
        self.dcline
            .extend(other.dcline.iter().map(|(k, r)| (k, r.clone())).collect())?;
        self.bus.extend(other.bus.iter().map(|(k, r)| (k, r.clone())).collect())?;
        self.storage.gen.extend(other.storage.gen);
        self.storage.gencost.extend(other.storage.gencost);
        self.storage.genfuel.extend(other.storage.genfuel);
        self.storage.storage_data.extend(other.storage.storage_data);
        self.id2zone.extend(other.id2zone);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gen_type_names_round_trip() {
        for gen_type in GenType::ALL {
            assert_eq!(gen_type.as_str().parse::<GenType>().unwrap(), gen_type);
        }
        assert!("battery".parse::<GenType>().is_err());
        assert_eq!(
            serde_json::to_string(&GenType::WindOffshore).unwrap(),
            "\"wind_offshore\""
        );
    }

    #[test]
    fn thermal_types() {
        let thermal: Vec<_> = GenType::ALL.iter().filter(|t| t.is_thermal()).collect();
        assert_eq!(
            thermal,
            vec![
                &GenType::Coal,
                &GenType::Dfo,
                &GenType::Geothermal,
                &GenType::Ng,
                &GenType::Nuclear
            ]
        );
    }

    #[test]
    fn branch_group_requires_both_ends_in_zone() {
        let mut grid = Grid::new();
        let z1 = ZoneId::new(1);
        let z2 = ZoneId::new(2);
        grid.branch
            .insert(BranchId::new(0), Branch::new(BusId::new(1), BusId::new(2), z1, z1))
            .unwrap();
        grid.branch
            .insert(BranchId::new(1), Branch::new(BusId::new(2), BusId::new(3), z1, z2))
            .unwrap();

        assert_eq!(grid.branches_within_zone(z1), vec![BranchId::new(0)]);
        assert!(grid.branches_within_zone(z2).is_empty());
    }

    #[test]
    fn merge_concatenates_tables() {
        let mut west = Grid::new();
        west.interconnects.push("Western".into());
        west.bus
            .insert(BusId::new(1), Bus::new(ZoneId::new(1), "Western"))
            .unwrap();
        let mut texas = Grid::new();
        texas.interconnects.push("Texas".into());
        texas
            .bus
            .insert(BusId::new(2), Bus::new(ZoneId::new(2), "Texas"))
            .unwrap();

        west.merge(texas.clone()).unwrap();
        assert_eq!(west.bus.len(), 2);
        assert_eq!(west.interconnects, vec!["Western", "Texas"]);
        assert!(west.merge(texas).is_err());
    }

    #[test]
    fn storage_data_uses_pascal_case_names() {
        let json = serde_json::to_value(StorageData::default()).unwrap();
        assert!(json.get("ExpectedTerminalStorageMax").is_some());
        assert!(json.get("rho").is_some());
        let params = serde_json::to_value(StorageParameters::default()).unwrap();
        assert_eq!(params["InEff"], 0.9);
    }
}
