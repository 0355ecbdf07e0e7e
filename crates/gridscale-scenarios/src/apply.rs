use gridscale_core::diagnostics::categories::{EMPTY_MATCH, MISSING_SCOPE};
use gridscale_core::{
    BranchId, BusId, DcLine, DcLineId, GenCost, GenType, Grid, GridError, GridResult, PlantId,
    ScaleDiagnostics, StorageData, StorageGen, ZoneId,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::change_table::{Category, ChangeTable, Scope};

/// Ratio of receiving-end to sending-end flow for synthesized DC lines.
pub const NEW_DCLINE_PT_RATIO: f64 = 0.98;

/// Options for applying a change table to a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalerOptions {
    /// `Pt = ratio * capacity` for every new DC line.
    pub new_dcline_pt_ratio: f64,
}

impl Default for ScalerOptions {
    fn default() -> Self {
        Self {
            new_dcline_pt_ratio: NEW_DCLINE_PT_RATIO,
        }
    }
}

/// Apply a change table to a grid, modifying it in-place.
///
/// **Algorithm:**
/// 1. Scale generation: for each generation type (canonical order), plants
///    resolved by (zone, type) group and by plant id get `Pmax`/`Pmin`
///    multiplied; thermal plants also get `c0 *= f` and `c2 /= f` (`c2` is
///    kept when `f == 0`).
/// 2. Scale branches within a zone, or by id: `rateA *= f`, `x /= f`.
/// 3. Scale DC lines by id: `f == 0` switches the line off, otherwise
///    `Pmin`/`Pmax` are multiplied.
/// 4. Append one storage unit per bus id entry.
/// 5. Append new DC lines with ids continuing after the current maximum.
///
/// Empty groups and absent scopes are skipped and noted in the returned
/// diagnostics. Unknown plant, branch, dcline or bus ids abort with
/// [`GridError::Lookup`]; the grid may then be partially modified.
pub fn apply_change_table_to_grid(
    grid: &mut Grid,
    change_table: &ChangeTable,
    opts: &ScalerOptions,
) -> GridResult<ScaleDiagnostics> {
    let mut diag = ScaleDiagnostics::new();
    if change_table.is_empty() {
        return Ok(diag);
    }

    for gen_type in change_table.generation_types() {
        scale_generation(grid, change_table, gen_type, &mut diag)?;
    }
    if change_table.contains(Category::Branch) {
        scale_branches(grid, change_table, &mut diag)?;
    }
    if change_table.contains(Category::DcLine) {
        scale_dclines(grid, change_table, &mut diag)?;
    }
    if change_table.contains(Category::Storage) {
        add_storage(grid, change_table, &mut diag)?;
    }
    if change_table.contains(Category::NewDcLine) {
        add_new_dclines(grid, change_table, opts, &mut diag)?;
    }
    Ok(diag)
}

fn scale_generation(
    grid: &mut Grid,
    change_table: &ChangeTable,
    gen_type: GenType,
    diag: &mut ScaleDiagnostics,
) -> GridResult<()> {
    let category = Category::Generation(gen_type);

    match change_table.factors(category, Scope::ZoneId) {
        Some(factors) => {
            for (&zone, &factor) in factors {
                let plant_ids = grid.plants_in_zone(ZoneId::new(zone), gen_type);
                if plant_ids.is_empty() {
                    note_empty_match(diag, category, zone);
                    continue;
                }
                debug!(%gen_type, zone, factor, plants = plant_ids.len(), "scaling zone generation");
                for id in plant_ids {
                    scale_plant(grid, id, gen_type, factor)?;
                    diag.stats.plants_scaled += 1;
                }
            }
        }
        None => note_missing_scope(diag, category, Scope::ZoneId),
    }

    match change_table.factors(category, Scope::PlantId) {
        Some(factors) => {
            for (&id, &factor) in factors {
                scale_plant(grid, PlantId::new(id), gen_type, factor)?;
                diag.stats.plants_scaled += 1;
            }
        }
        None => note_missing_scope(diag, category, Scope::PlantId),
    }
    Ok(())
}

/// Thermal handling follows the category the edit was listed under.
fn scale_plant(grid: &mut Grid, id: PlantId, gen_type: GenType, factor: f64) -> GridResult<()> {
    let plant = grid
        .plant
        .get_mut(id)
        .ok_or_else(|| GridError::Lookup(format!("plant {} not in grid", id.value())))?;
    plant.pmax *= factor;
    plant.pmin *= factor;

    if gen_type.is_thermal() {
        let cost = grid
            .gencost
            .get_mut(id)
            .ok_or_else(|| GridError::Lookup(format!("no gencost for plant {}", id.value())))?;
        cost.c0 *= factor;
        if factor != 0.0 {
            cost.c2 /= factor;
        }
    }
    Ok(())
}

fn scale_branches(
    grid: &mut Grid,
    change_table: &ChangeTable,
    diag: &mut ScaleDiagnostics,
) -> GridResult<()> {
    match change_table.factors(Category::Branch, Scope::ZoneId) {
        Some(factors) => {
            for (&zone, &factor) in factors {
                let branch_ids = grid.branches_within_zone(ZoneId::new(zone));
                if branch_ids.is_empty() {
                    note_empty_match(diag, Category::Branch, zone);
                    continue;
                }
                debug!(zone, factor, branches = branch_ids.len(), "scaling intra-zone branches");
                for id in branch_ids {
                    scale_branch(grid, id, factor)?;
                    diag.stats.branches_scaled += 1;
                }
            }
        }
        None => note_missing_scope(diag, Category::Branch, Scope::ZoneId),
    }

    match change_table.factors(Category::Branch, Scope::BranchId) {
        Some(factors) => {
            for (&id, &factor) in factors {
                scale_branch(grid, BranchId::new(id), factor)?;
                diag.stats.branches_scaled += 1;
            }
        }
        None => note_missing_scope(diag, Category::Branch, Scope::BranchId),
    }
    Ok(())
}

fn scale_branch(grid: &mut Grid, id: BranchId, factor: f64) -> GridResult<()> {
    let branch = grid
        .branch
        .get_mut(id)
        .ok_or_else(|| GridError::Lookup(format!("branch {} not in grid", id.value())))?;
    branch.rate_a *= factor;
    branch.x /= factor;
    Ok(())
}

fn scale_dclines(
    grid: &mut Grid,
    change_table: &ChangeTable,
    diag: &mut ScaleDiagnostics,
) -> GridResult<()> {
    let Some(factors) = change_table.factors(Category::DcLine, Scope::DcLineId) else {
        note_missing_scope(diag, Category::DcLine, Scope::DcLineId);
        return Ok(());
    };
    for (&id, &factor) in factors {
        let line = grid
            .dcline
            .get_mut(DcLineId::new(id))
            .ok_or_else(|| GridError::Lookup(format!("dcline {} not in grid", id)))?;
        if factor == 0.0 {
            line.status = false;
            diag.stats.dclines_deactivated += 1;
        } else {
            line.pmin *= factor;
            line.pmax *= factor;
            diag.stats.dclines_scaled += 1;
        }
    }
    Ok(())
}

/// Append one storage unit per `bus_id` entry; the entry value is the unit's
/// power capacity in MW.
fn add_storage(
    grid: &mut Grid,
    change_table: &ChangeTable,
    diag: &mut ScaleDiagnostics,
) -> GridResult<()> {
    let Some(capacities) = change_table.factors(Category::Storage, Scope::BusId) else {
        note_missing_scope(diag, Category::Storage, Scope::BusId);
        return Ok(());
    };

    // unit indices continue after every plant and existing storage unit
    let mut unit_idx = grid.plant.len() + grid.storage.len();
    let params = grid.storage.parameters.clone();
    for (&bus, &capacity) in capacities {
        let bus_id = BusId::new(bus);
        if !grid.bus.contains(bus_id) {
            return Err(GridError::Lookup(format!(
                "storage bus {} not in grid",
                bus
            )));
        }
        unit_idx += 1;

        grid.storage.gen.push(StorageGen {
            bus_id,
            vg: 1.0,
            mbase: 100.0,
            status: true,
            pmax: capacity,
            pmin: -capacity,
            ramp_10: capacity,
            ramp_30: capacity,
            ..StorageGen::default()
        });
        grid.storage.gencost.push(GenCost {
            curve_type: 2,
            n: 3,
            ..GenCost::default()
        });
        grid.storage.genfuel.push("ess".to_string());

        let energy = capacity * params.duration;
        grid.storage.storage_data.push(StorageData {
            unit_idx,
            expected_terminal_storage_max: energy * params.max_stor,
            expected_terminal_storage_min: energy / 2.0,
            initial_storage: energy / 2.0,
            initial_storage_lower_bound: energy / 2.0,
            initial_storage_upper_bound: energy / 2.0,
            initial_storage_cost: params.energy_price,
            terminal_storage_price: params.energy_price,
            min_storage_level: energy * params.min_stor,
            max_storage_level: energy * params.max_stor,
            out_eff: params.out_eff,
            in_eff: params.in_eff,
            loss_factor: 0.0,
            rho: 1.0,
        });
        debug!(bus, capacity, unit_idx, "added storage unit");
        diag.stats.storage_added += 1;
    }
    Ok(())
}

fn add_new_dclines(
    grid: &mut Grid,
    change_table: &ChangeTable,
    opts: &ScalerOptions,
    diag: &mut ScaleDiagnostics,
) -> GridResult<()> {
    let descriptors = change_table.new_dclines();
    let first_id = grid
        .dcline
        .max_id()
        .map(|id| id.value() + 1)
        .unwrap_or(0);

    let mut rows = Vec::with_capacity(descriptors.len());
    for (offset, entry) in descriptors.iter().enumerate() {
        let from_interconnect = bus_interconnect(grid, entry.from_bus_id)?;
        let to_interconnect = bus_interconnect(grid, entry.to_bus_id)?;
        let mut line = DcLine::new(entry.from_bus_id, entry.to_bus_id)
            .with_p_limits(-entry.capacity, entry.capacity);
        line.status = true;
        line.pf = entry.capacity;
        line.pt = opts.new_dcline_pt_ratio * entry.capacity;
        line.from_interconnect = from_interconnect;
        line.to_interconnect = to_interconnect;
        rows.push((DcLineId::new(first_id + offset), line));
    }

    diag.stats.dclines_added += rows.len();
    debug!(count = rows.len(), first_id, "adding new dclines");
    grid.dcline.extend(rows)
}

fn bus_interconnect(grid: &Grid, bus: BusId) -> GridResult<String> {
    grid.bus
        .get(bus)
        .map(|b| b.interconnect.clone())
        .ok_or_else(|| GridError::Lookup(format!("dcline endpoint bus {} not in grid", bus.value())))
}

fn note_empty_match(diag: &mut ScaleDiagnostics, category: Category, zone: usize) {
    debug!(%category, zone, "zone group matched nothing");
    diag.add_warning_with_entity(
        EMPTY_MATCH,
        "zone group matched no assets",
        &format!("{} zone {}", category, zone),
    );
}

fn note_missing_scope(diag: &mut ScaleDiagnostics, category: Category, scope: Scope) {
    diag.add_warning_with_entity(
        MISSING_SCOPE,
        &format!("no {} entries", scope),
        category.name(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change_table::NewDcLine;
    use gridscale_core::{Branch, Bus, Plant};

    fn zone(id: usize) -> ZoneId {
        ZoneId::new(id)
    }

    fn small_grid() -> Grid {
        let mut grid = Grid::new();
        grid.interconnects.push("Western".into());
        grid.id2zone.insert(zone(1), "Washington".into());
        grid.id2zone.insert(zone(2), "Oregon".into());
        for (bus, z) in [(1, 1), (2, 1), (3, 2)] {
            grid.bus
                .insert(BusId::new(bus), Bus::new(zone(z), "Western"))
                .unwrap();
        }
        grid.plant
            .insert(
                PlantId::new(10),
                Plant::new(BusId::new(1), zone(1), GenType::Coal).with_p_limits(10.0, 100.0),
            )
            .unwrap();
        grid.gencost
            .insert(PlantId::new(10), GenCost::quadratic(5.0, 20.0, 0.02))
            .unwrap();
        grid.plant
            .insert(
                PlantId::new(11),
                Plant::new(BusId::new(3), zone(2), GenType::Wind).with_p_limits(0.0, 50.0),
            )
            .unwrap();
        grid.gencost
            .insert(PlantId::new(11), GenCost::quadratic(0.0, 0.0, 0.0))
            .unwrap();
        grid.branch
            .insert(
                BranchId::new(0),
                Branch::new(BusId::new(1), BusId::new(2), zone(1), zone(1)).with_rating(200.0, 0.1),
            )
            .unwrap();
        grid.branch
            .insert(
                BranchId::new(1),
                Branch::new(BusId::new(2), BusId::new(3), zone(1), zone(2)).with_rating(300.0, 0.2),
            )
            .unwrap();
        grid
    }

    #[test]
    fn wind_plant_edit_leaves_cost_curve_alone() {
        let mut grid = small_grid();
        let mut ct = ChangeTable::new();
        ct.set_factor(Category::Generation(GenType::Wind), Scope::PlantId, 11, 3.0)
            .unwrap();

        apply_change_table_to_grid(&mut grid, &ct, &ScalerOptions::default()).unwrap();

        assert_eq!(grid.plant.get(PlantId::new(11)).unwrap().pmax, 150.0);
        assert_eq!(
            grid.gencost.get(PlantId::new(11)).unwrap(),
            &GenCost::quadratic(0.0, 0.0, 0.0)
        );
    }

    #[test]
    fn zone_branch_edit_only_touches_intra_zone_branches() {
        let mut grid = small_grid();
        let mut ct = ChangeTable::new();
        ct.set_factor(Category::Branch, Scope::ZoneId, 1, 2.0).unwrap();

        let diag = apply_change_table_to_grid(&mut grid, &ct, &ScalerOptions::default()).unwrap();

        let inside = grid.branch.get(BranchId::new(0)).unwrap();
        assert_eq!(inside.rate_a, 400.0);
        assert!((inside.x - 0.05).abs() < 1e-12);
        let across = grid.branch.get(BranchId::new(1)).unwrap();
        assert_eq!(across.rate_a, 300.0);
        assert_eq!(diag.stats.branches_scaled, 1);
    }

    #[test]
    fn branch_id_edit() {
        let mut grid = small_grid();
        let mut ct = ChangeTable::new();
        ct.set_factor(Category::Branch, Scope::BranchId, 1, 0.5).unwrap();

        apply_change_table_to_grid(&mut grid, &ct, &ScalerOptions::default()).unwrap();

        let branch = grid.branch.get(BranchId::new(1)).unwrap();
        assert_eq!(branch.rate_a, 150.0);
        assert!((branch.x - 0.4).abs() < 1e-12);
    }

    #[test]
    fn empty_group_and_missing_scope_are_noted_not_fatal() {
        let mut grid = small_grid();
        let base = grid.clone();
        let mut ct = ChangeTable::new();
        ct.set_factor(Category::Generation(GenType::Ng), Scope::ZoneId, 1, 2.0)
            .unwrap();
        ct.set_factor(Category::Branch, Scope::ZoneId, 2, 2.0).unwrap();

        let diag = apply_change_table_to_grid(&mut grid, &ct, &ScalerOptions::default()).unwrap();

        assert_eq!(grid, base);
        assert_eq!(diag.issues_by_category(EMPTY_MATCH).count(), 2);
        // ng lacks plant_id, branch lacks branch_id
        assert_eq!(diag.issues_by_category(MISSING_SCOPE).count(), 2);
    }

    #[test]
    fn unknown_plant_id_is_lookup_error() {
        let mut grid = small_grid();
        let mut ct = ChangeTable::new();
        ct.set_factor(Category::Generation(GenType::Coal), Scope::PlantId, 99, 2.0)
            .unwrap();

        let err = apply_change_table_to_grid(&mut grid, &ct, &ScalerOptions::default());
        assert!(matches!(err, Err(GridError::Lookup(_))));
    }

    #[test]
    fn unknown_dcline_id_is_lookup_error() {
        let mut grid = small_grid();
        let mut ct = ChangeTable::new();
        ct.set_factor(Category::DcLine, Scope::DcLineId, 4, 0.0).unwrap();

        let err = apply_change_table_to_grid(&mut grid, &ct, &ScalerOptions::default());
        assert!(matches!(err, Err(GridError::Lookup(_))));
    }

    #[test]
    fn storage_unit_index_and_energy_bounds() {
        let mut grid = small_grid();
        let mut ct = ChangeTable::new();
        ct.set_factor(Category::Storage, Scope::BusId, 2, 10.0).unwrap();
        ct.set_factor(Category::Storage, Scope::BusId, 3, 20.0).unwrap();

        apply_change_table_to_grid(&mut grid, &ct, &ScalerOptions::default()).unwrap();

        let data = &grid.storage.storage_data;
        assert_eq!(data.len(), 2);
        // two plants in the grid, so units are numbered 3 and 4
        assert_eq!(data[0].unit_idx, 3);
        assert_eq!(data[1].unit_idx, 4);
        // 10 MW * 4 h
        assert!((data[0].max_storage_level - 38.0).abs() < 1e-9);
        assert!((data[0].min_storage_level - 2.0).abs() < 1e-9);
        assert!((data[0].expected_terminal_storage_max - 38.0).abs() < 1e-9);
        assert_eq!(data[0].expected_terminal_storage_min, 20.0);
        assert_eq!(data[0].initial_storage, 20.0);
        assert_eq!(data[0].initial_storage_cost, 20.0);
        assert_eq!(data[0].terminal_storage_price, 20.0);
        assert_eq!(data[0].out_eff, 0.9);
        assert_eq!(data[0].rho, 1.0);
        assert_eq!(data[0].loss_factor, 0.0);
        assert_eq!(grid.storage.gen[1].bus_id, BusId::new(3));
        assert_eq!(grid.storage.gen[1].ramp_30, 20.0);
        assert_eq!(grid.storage.gencost[0].curve_type, 2);
        assert_eq!(grid.storage.gencost[0].n, 3);
        assert_eq!(grid.storage.gencost[0].c1, 0.0);
    }

    #[test]
    fn storage_on_unknown_bus_is_lookup_error() {
        let mut grid = small_grid();
        let mut ct = ChangeTable::new();
        ct.set_factor(Category::Storage, Scope::BusId, 42, 10.0).unwrap();

        let err = apply_change_table_to_grid(&mut grid, &ct, &ScalerOptions::default());
        assert!(matches!(err, Err(GridError::Lookup(_))));
    }

    #[test]
    fn new_dcline_copies_interconnects_and_uses_pt_ratio() {
        let mut grid = small_grid();
        grid.bus
            .insert(BusId::new(7), Bus::new(zone(3), "Texas"))
            .unwrap();
        let mut ct = ChangeTable::new();
        ct.add_new_dcline(NewDcLine {
            from_bus_id: BusId::new(1),
            to_bus_id: BusId::new(7),
            capacity: 200.0,
        })
        .unwrap();
        let opts = ScalerOptions {
            new_dcline_pt_ratio: 0.95,
        };

        apply_change_table_to_grid(&mut grid, &ct, &opts).unwrap();

        let line = grid.dcline.get(DcLineId::new(0)).unwrap();
        assert!(line.status);
        assert_eq!(line.pf, 200.0);
        assert_eq!(line.pt, 190.0);
        assert_eq!((line.pmin, line.pmax), (-200.0, 200.0));
        assert_eq!(line.from_interconnect, "Western");
        assert_eq!(line.to_interconnect, "Texas");
        assert_eq!(line.qf, 0.0);
    }
}
