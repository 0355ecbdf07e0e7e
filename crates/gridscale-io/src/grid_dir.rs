//! Directory-backed grid loader.
//!
//! **Layout:**
//! ```text
//! <root>/
//!   <interconnect>/
//!     bus.csv        bus_id,type,Pd,Qd,zone_id,baseKV,interconnect
//!     plant.csv      plant_id,bus_id,zone_id,type,Pg,status,Pmax,Pmin,interconnect
//!     gencost.csv    plant_id,type,startup,shutdown,n,c2,c1,c0
//!     branch.csv     branch_id,from_bus_id,to_bus_id,from_zone_id,to_zone_id,r,x,b,rateA,...
//!     dcline.csv     dcline_id,from_bus_id,to_bus_id,status,Pf,Pt,...,Pmin,Pmax,...  (optional)
//!     zone.csv       zone_id,zone_name
//!     storage.json   storage parameters (optional)
//! ```
//!
//! Loading several interconnects concatenates their tables; element ids are
//! expected to be unique across interconnects.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gridscale_core::{
    Branch, BranchId, Bus, BusId, DcLine, DcLineId, GenCost, GenType, Grid, GridError,
    GridResult, Plant, PlantId, StorageParameters, ZoneId,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::source::GridLoader;

#[derive(Debug, Deserialize)]
struct BusRecord {
    bus_id: usize,
    #[serde(rename = "type", default = "default_bus_type")]
    bus_type: u8,
    #[serde(rename = "Pd", default)]
    pd: f64,
    #[serde(rename = "Qd", default)]
    qd: f64,
    zone_id: usize,
    #[serde(rename = "baseKV", default)]
    base_kv: f64,
    interconnect: String,
}

fn default_bus_type() -> u8 {
    1
}

#[derive(Debug, Deserialize)]
struct PlantRecord {
    plant_id: usize,
    bus_id: usize,
    zone_id: usize,
    #[serde(rename = "type")]
    gen_type: GenType,
    #[serde(rename = "Pg", default)]
    pg: f64,
    #[serde(default = "default_status")]
    status: u8,
    #[serde(rename = "Pmax")]
    pmax: f64,
    #[serde(rename = "Pmin")]
    pmin: f64,
    #[serde(default)]
    interconnect: String,
}

fn default_status() -> u8 {
    1
}

#[derive(Debug, Deserialize)]
struct GenCostRecord {
    plant_id: usize,
    #[serde(rename = "type", default = "default_curve_type")]
    curve_type: u8,
    #[serde(default)]
    startup: f64,
    #[serde(default)]
    shutdown: f64,
    #[serde(default = "default_n")]
    n: u8,
    c2: f64,
    c1: f64,
    c0: f64,
}

fn default_curve_type() -> u8 {
    2
}

fn default_n() -> u8 {
    3
}

#[derive(Debug, Deserialize)]
struct BranchRecord {
    branch_id: usize,
    from_bus_id: usize,
    to_bus_id: usize,
    from_zone_id: usize,
    to_zone_id: usize,
    #[serde(default)]
    r: f64,
    x: f64,
    #[serde(default)]
    b: f64,
    #[serde(rename = "rateA")]
    rate_a: f64,
    #[serde(rename = "rateB", default)]
    rate_b: f64,
    #[serde(rename = "rateC", default)]
    rate_c: f64,
    #[serde(default = "default_status")]
    status: u8,
    #[serde(default)]
    interconnect: String,
}

#[derive(Debug, Deserialize)]
struct DcLineRecord {
    dcline_id: usize,
    from_bus_id: usize,
    to_bus_id: usize,
    #[serde(default = "default_status")]
    status: u8,
    #[serde(rename = "Pf", default)]
    pf: f64,
    #[serde(rename = "Pt", default)]
    pt: f64,
    #[serde(rename = "Qf", default)]
    qf: f64,
    #[serde(rename = "Qt", default)]
    qt: f64,
    #[serde(rename = "Vf", default)]
    vf: f64,
    #[serde(rename = "Vt", default)]
    vt: f64,
    #[serde(rename = "Pmin")]
    pmin: f64,
    #[serde(rename = "Pmax")]
    pmax: f64,
    #[serde(rename = "QminF", default)]
    qminf: f64,
    #[serde(rename = "QmaxF", default)]
    qmaxf: f64,
    #[serde(rename = "QminT", default)]
    qmint: f64,
    #[serde(rename = "QmaxT", default)]
    qmaxt: f64,
    #[serde(default)]
    loss0: f64,
    #[serde(default)]
    loss1: f64,
    #[serde(default)]
    from_interconnect: String,
    #[serde(default)]
    to_interconnect: String,
}

#[derive(Debug, Deserialize)]
struct ZoneRecord {
    zone_id: usize,
    zone_name: String,
}

/// [`GridLoader`] over a directory of per-interconnect CSV tables.
#[derive(Debug, Clone)]
pub struct GridDirectory {
    root: PathBuf,
}

impl GridDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load_interconnect(&self, name: &str) -> GridResult<Grid> {
        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Err(GridError::NotFound(format!(
                "grid for interconnect '{}' ({})",
                name,
                dir.display()
            )));
        }
        for required in ["bus.csv", "plant.csv", "gencost.csv", "branch.csv", "zone.csv"] {
            let path = dir.join(required);
            if !path.is_file() {
                return Err(GridError::NotFound(format!(
                    "grid table '{}' for interconnect '{}'",
                    path.display(),
                    name
                )));
            }
        }
        Ok(read_interconnect(&dir, name)?)
    }
}

impl GridLoader for GridDirectory {
    fn load_grid(&self, interconnects: &[String]) -> GridResult<Grid> {
        if interconnects.is_empty() {
            return Err(GridError::InvalidArgument(
                "at least one interconnect is required".to_string(),
            ));
        }
        let mut grid = Grid::new();
        for name in interconnects {
            let part = self.load_interconnect(name)?;
            debug!(
                interconnect = %name,
                buses = part.bus.len(),
                plants = part.plant.len(),
                branches = part.branch.len(),
                dclines = part.dcline.len(),
                "loaded interconnect tables"
            );
            if grid.interconnects.is_empty() {
                grid.storage.parameters = part.storage.parameters.clone();
            }
            grid.merge(part)?;
        }
        Ok(grid)
    }
}

fn read_interconnect(dir: &Path, name: &str) -> Result<Grid> {
    let mut grid = Grid::new();
    grid.interconnects.push(name.to_string());

    for record in read_records::<BusRecord>(&dir.join("bus.csv"))? {
        grid.bus.insert(
            BusId::new(record.bus_id),
            Bus {
                bus_type: record.bus_type,
                pd: record.pd,
                qd: record.qd,
                zone_id: ZoneId::new(record.zone_id),
                base_kv: record.base_kv,
                interconnect: record.interconnect,
            },
        )?;
    }

    for record in read_records::<PlantRecord>(&dir.join("plant.csv"))? {
        grid.plant.insert(
            PlantId::new(record.plant_id),
            Plant {
                bus_id: BusId::new(record.bus_id),
                zone_id: ZoneId::new(record.zone_id),
                gen_type: record.gen_type,
                pg: record.pg,
                status: record.status != 0,
                pmax: record.pmax,
                pmin: record.pmin,
                interconnect: record.interconnect,
            },
        )?;
    }

    for record in read_records::<GenCostRecord>(&dir.join("gencost.csv"))? {
        grid.gencost.insert(
            PlantId::new(record.plant_id),
            GenCost {
                curve_type: record.curve_type,
                startup: record.startup,
                shutdown: record.shutdown,
                n: record.n,
                c2: record.c2,
                c1: record.c1,
                c0: record.c0,
            },
        )?;
    }

    for record in read_records::<BranchRecord>(&dir.join("branch.csv"))? {
        grid.branch.insert(
            BranchId::new(record.branch_id),
            Branch {
                from_bus_id: BusId::new(record.from_bus_id),
                to_bus_id: BusId::new(record.to_bus_id),
                from_zone_id: ZoneId::new(record.from_zone_id),
                to_zone_id: ZoneId::new(record.to_zone_id),
                r: record.r,
                x: record.x,
                b: record.b,
                rate_a: record.rate_a,
                rate_b: record.rate_b,
                rate_c: record.rate_c,
                status: record.status != 0,
                interconnect: record.interconnect,
            },
        )?;
    }

    let dcline_path = dir.join("dcline.csv");
    if dcline_path.is_file() {
        for record in read_records::<DcLineRecord>(&dcline_path)? {
            grid.dcline.insert(
                DcLineId::new(record.dcline_id),
                DcLine {
                    from_bus_id: BusId::new(record.from_bus_id),
                    to_bus_id: BusId::new(record.to_bus_id),
                    status: record.status != 0,
                    pf: record.pf,
                    pt: record.pt,
                    qf: record.qf,
                    qt: record.qt,
                    vf: record.vf,
                    vt: record.vt,
                    pmin: record.pmin,
                    pmax: record.pmax,
                    qminf: record.qminf,
                    qmaxf: record.qmaxf,
                    qmint: record.qmint,
                    qmaxt: record.qmaxt,
                    loss0: record.loss0,
                    loss1: record.loss1,
                    from_interconnect: record.from_interconnect,
                    to_interconnect: record.to_interconnect,
                },
            )?;
        }
    }

    for record in read_records::<ZoneRecord>(&dir.join("zone.csv"))? {
        grid.id2zone
            .insert(ZoneId::new(record.zone_id), record.zone_name);
    }

    let storage_path = dir.join("storage.json");
    if storage_path.is_file() {
        let file = File::open(&storage_path)
            .with_context(|| format!("opening storage parameters '{}'", storage_path.display()))?;
        grid.storage.parameters = serde_json::from_reader::<_, StorageParameters>(file)
            .with_context(|| format!("parsing storage parameters '{}'", storage_path.display()))?;
    }

    Ok(grid)
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening grid table '{}'", path.display()))?;
    let mut records = Vec::new();
    for (line, result) in reader.deserialize().enumerate() {
        let record: T = result
            .with_context(|| format!("parsing record {} of '{}'", line + 1, path.display()))?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_tables(root: &Path, name: &str, offset: usize) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("bus.csv"),
            format!(
                "bus_id,type,Pd,Qd,zone_id,baseKV,interconnect\n{b},1,10,0,{z},230,{name}\n{b2},1,0,0,{z},230,{name}\n",
                b = offset + 1,
                b2 = offset + 2,
                z = offset + 1,
            ),
        )
        .unwrap();
        fs::write(
            dir.join("plant.csv"),
            format!(
                "plant_id,bus_id,zone_id,type,Pg,status,Pmax,Pmin,interconnect\n{p},{b},{z},ng,50,1,100,10,{name}\n",
                p = offset + 1,
                b = offset + 1,
                z = offset + 1,
            ),
        )
        .unwrap();
        fs::write(
            dir.join("gencost.csv"),
            format!(
                "plant_id,type,startup,shutdown,n,c2,c1,c0\n{p},2,0,0,3,0.02,20,5\n",
                p = offset + 1
            ),
        )
        .unwrap();
        fs::write(
            dir.join("branch.csv"),
            format!(
                "branch_id,from_bus_id,to_bus_id,from_zone_id,to_zone_id,r,x,b,rateA,status\n{br},{b},{b2},{z},{z},0.01,0.1,0,200,1\n",
                br = offset + 1,
                b = offset + 1,
                b2 = offset + 2,
                z = offset + 1,
            ),
        )
        .unwrap();
        fs::write(
            dir.join("zone.csv"),
            format!("zone_id,zone_name\n{z},Zone {z}\n", z = offset + 1),
        )
        .unwrap();
    }

    #[test]
    fn loads_single_interconnect() {
        let tmp = TempDir::new().unwrap();
        write_tables(tmp.path(), "Western", 0);

        let grid = GridDirectory::new(tmp.path())
            .load_grid(&["Western".to_string()])
            .unwrap();

        assert_eq!(grid.bus.len(), 2);
        let plant = grid.plant.get(PlantId::new(1)).unwrap();
        assert_eq!(plant.gen_type, GenType::Ng);
        assert_eq!(plant.pmax, 100.0);
        assert!(plant.status);
        assert_eq!(grid.gencost.get(PlantId::new(1)).unwrap().c2, 0.02);
        let branch = grid.branch.get(BranchId::new(1)).unwrap();
        assert_eq!(branch.rate_a, 200.0);
        assert_eq!(branch.rate_b, 0.0);
        assert!(grid.dcline.is_empty());
        assert_eq!(grid.zone_name(ZoneId::new(1)), Some("Zone 1"));
        assert_eq!(grid.storage.parameters, StorageParameters::default());
    }

    #[test]
    fn concatenates_interconnects() {
        let tmp = TempDir::new().unwrap();
        write_tables(tmp.path(), "Western", 0);
        write_tables(tmp.path(), "Texas", 100);

        let grid = GridDirectory::new(tmp.path())
            .load_grid(&["Western".to_string(), "Texas".to_string()])
            .unwrap();

        assert_eq!(grid.interconnects, vec!["Western", "Texas"]);
        assert_eq!(grid.bus.len(), 4);
        assert_eq!(grid.plant.ids(), &[PlantId::new(1), PlantId::new(101)]);
        assert_eq!(grid.id2zone.len(), 2);
    }

    #[test]
    fn reads_dclines_and_storage_parameters() {
        let tmp = TempDir::new().unwrap();
        write_tables(tmp.path(), "Western", 0);
        let dir = tmp.path().join("Western");
        fs::write(
            dir.join("dcline.csv"),
            "dcline_id,from_bus_id,to_bus_id,status,Pf,Pt,Pmin,Pmax,from_interconnect,to_interconnect\n3,1,2,1,100,98,-100,100,Western,Western\n",
        )
        .unwrap();
        fs::write(dir.join("storage.json"), r#"{"duration": 2.0}"#).unwrap();

        let grid = GridDirectory::new(tmp.path())
            .load_grid(&["Western".to_string()])
            .unwrap();

        let line = grid.dcline.get(DcLineId::new(3)).unwrap();
        assert_eq!(line.pmin, -100.0);
        assert_eq!(line.from_interconnect, "Western");
        assert_eq!(grid.storage.parameters.duration, 2.0);
        assert_eq!(grid.storage.parameters.max_stor, 0.95);
    }

    #[test]
    fn missing_interconnect_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = GridDirectory::new(tmp.path())
            .load_grid(&["Eastern".to_string()])
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn malformed_table_is_reported() {
        let tmp = TempDir::new().unwrap();
        write_tables(tmp.path(), "Western", 0);
        let dir = tmp.path().join("Western");
        fs::write(
            dir.join("plant.csv"),
            "plant_id,bus_id,zone_id,type,Pmax,Pmin\n1,1,1,fusion,10,0\n",
        )
        .unwrap();

        let err = GridDirectory::new(tmp.path())
            .load_grid(&["Western".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("plant.csv"));
    }
}
