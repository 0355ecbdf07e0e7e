use gridscale_core::diagnostics::categories::{EMPTY_MATCH, MISSING_SCOPE};
use gridscale_core::{
    GenType, Grid, GridError, GridResult, PlantId, Profile, ScaleDiagnostics, ZoneId,
};
use gridscale_io::ResourceKind;
use tracing::{debug, info};

use crate::change_table::{Category, ChangeTable, Scope};

const WIND_TYPES: &[GenType] = &[GenType::Wind, GenType::WindOffshore];
const SOLAR_TYPES: &[GenType] = &[GenType::Solar];
const HYDRO_TYPES: &[GenType] = &[GenType::Hydro];

/// Generation categories whose edits touch the profile of `kind`.
pub fn profile_categories(kind: ResourceKind) -> GridResult<&'static [GenType]> {
    match kind {
        ResourceKind::Wind => Ok(WIND_TYPES),
        ResourceKind::Solar => Ok(SOLAR_TYPES),
        ResourceKind::Hydro => Ok(HYDRO_TYPES),
        ResourceKind::Demand => Err(GridError::InvalidArgument(
            "demand is scaled by zone, use the demand applier".to_string(),
        )),
    }
}

/// Scale the plant columns of a power-output profile.
///
/// Plants are resolved on `grid`, which must be the unscaled base grid:
/// zone groups first, then explicit plant ids. A resolved plant that has
/// no column in `profile` is a [`GridError::Lookup`].
pub fn apply_change_table_to_profile(
    profile: &mut Profile,
    grid: &Grid,
    change_table: &ChangeTable,
    kind: ResourceKind,
    diag: &mut ScaleDiagnostics,
) -> GridResult<()> {
    for &gen_type in profile_categories(kind)? {
        let category = Category::Generation(gen_type);
        if !change_table.contains(category) {
            continue;
        }

        match change_table.factors(category, Scope::ZoneId) {
            Some(factors) => {
                for (&zone, &factor) in factors {
                    let plant_ids = grid.plants_in_zone(ZoneId::new(zone), gen_type);
                    if plant_ids.is_empty() {
                        debug!(%category, zone, "zone group matched nothing");
                        diag.add_warning_with_entity(
                            EMPTY_MATCH,
                            "zone group matched no profile columns",
                            &format!("{} zone {}", category, zone),
                        );
                        continue;
                    }
                    for id in plant_ids {
                        scale_plant_column(profile, id, factor, diag)?;
                    }
                }
            }
            None => diag.add_warning_with_entity(
                MISSING_SCOPE,
                "no zone_id entries",
                category.name(),
            ),
        }

        match change_table.factors(category, Scope::PlantId) {
            Some(factors) => {
                for (&id, &factor) in factors {
                    scale_plant_column(profile, PlantId::new(id), factor, diag)?;
                }
            }
            None => diag.add_warning_with_entity(
                MISSING_SCOPE,
                "no plant_id entries",
                category.name(),
            ),
        }
    }
    Ok(())
}

fn scale_plant_column(
    profile: &mut Profile,
    id: PlantId,
    factor: f64,
    diag: &mut ScaleDiagnostics,
) -> GridResult<()> {
    profile.scale_column(id.value(), factor).map_err(|_| {
        GridError::Lookup(format!("plant {} has no profile column", id.value()))
    })?;
    diag.stats.profile_columns_scaled += 1;
    Ok(())
}

/// Scale zone columns of a demand profile. Every edited zone must be named
/// in the grid's zone map and present as a column.
pub fn apply_change_table_to_demand(
    profile: &mut Profile,
    grid: &Grid,
    change_table: &ChangeTable,
    diag: &mut ScaleDiagnostics,
) -> GridResult<()> {
    let Some(factors) = change_table.factors(Category::Demand, Scope::ZoneId) else {
        if change_table.contains(Category::Demand) {
            diag.add_warning_with_entity(MISSING_SCOPE, "no zone_id entries", "demand");
        }
        return Ok(());
    };

    for (&zone, &factor) in factors {
        let name = grid.zone_name(ZoneId::new(zone)).ok_or_else(|| {
            GridError::Lookup(format!("demand zone {} has no name in the grid", zone))
        })?;
        info!("Multiply demand in {} (#{}) by {:.2}", name, zone, factor);
        profile.scale_column(zone, factor).map_err(|_| {
            GridError::Lookup(format!("zone {} ({}) has no demand column", zone, name))
        })?;
        diag.stats.profile_columns_scaled += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gridscale_core::{BusId, Plant};

    fn grid() -> Grid {
        let mut grid = Grid::new();
        grid.id2zone.insert(ZoneId::new(1), "Washington".into());
        for (id, zone, gen_type) in [
            (1, 1, GenType::Wind),
            (2, 1, GenType::WindOffshore),
            (3, 2, GenType::Wind),
            (4, 1, GenType::Solar),
        ] {
            grid.plant
                .insert(
                    PlantId::new(id),
                    Plant::new(BusId::new(id), ZoneId::new(zone), gen_type),
                )
                .unwrap();
        }
        grid
    }

    fn profile(columns: Vec<usize>) -> Profile {
        let stamps = vec![
            Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2016, 1, 1, 1, 0, 0).unwrap(),
        ];
        let width = columns.len();
        Profile::from_rows(stamps, columns, vec![vec![1.0; width], vec![2.0; width]]).unwrap()
    }

    #[test]
    fn wind_covers_onshore_and_offshore() {
        let mut ct = ChangeTable::new();
        ct.set_factor(Category::Generation(GenType::Wind), Scope::ZoneId, 1, 2.0)
            .unwrap();
        ct.set_factor(
            Category::Generation(GenType::WindOffshore),
            Scope::PlantId,
            2,
            3.0,
        )
        .unwrap();
        let mut wind = profile(vec![1, 2, 3]);
        let mut diag = ScaleDiagnostics::new();

        apply_change_table_to_profile(&mut wind, &grid(), &ct, ResourceKind::Wind, &mut diag)
            .unwrap();

        assert_eq!(wind.column(1).unwrap(), vec![2.0, 4.0]);
        assert_eq!(wind.column(2).unwrap(), vec![3.0, 6.0]);
        assert_eq!(wind.column(3).unwrap(), vec![1.0, 2.0]);
        assert_eq!(diag.stats.profile_columns_scaled, 2);
    }

    #[test]
    fn missing_plant_column_is_lookup_error() {
        let mut ct = ChangeTable::new();
        ct.set_factor(Category::Generation(GenType::Solar), Scope::PlantId, 4, 2.0)
            .unwrap();
        let mut solar = profile(vec![5]);

        let err = apply_change_table_to_profile(
            &mut solar,
            &grid(),
            &ct,
            ResourceKind::Solar,
            &mut ScaleDiagnostics::new(),
        );
        assert!(matches!(err, Err(GridError::Lookup(_))));
    }

    #[test]
    fn demand_kind_is_rejected_for_plant_profiles() {
        let err = profile_categories(ResourceKind::Demand);
        assert!(matches!(err, Err(GridError::InvalidArgument(_))));
    }

    #[test]
    fn demand_zone_without_name_is_lookup_error() {
        let mut ct = ChangeTable::new();
        ct.set_factor(Category::Demand, Scope::ZoneId, 2, 1.1).unwrap();
        let mut demand = profile(vec![1, 2]);

        let err = apply_change_table_to_demand(
            &mut demand,
            &grid(),
            &ct,
            &mut ScaleDiagnostics::new(),
        );
        assert!(matches!(err, Err(GridError::Lookup(_))));
    }

    #[test]
    fn demand_scales_named_zone() {
        let mut ct = ChangeTable::new();
        ct.set_factor(Category::Demand, Scope::ZoneId, 1, 1.5).unwrap();
        let mut demand = profile(vec![1, 2]);

        apply_change_table_to_demand(&mut demand, &grid(), &ct, &mut ScaleDiagnostics::new())
            .unwrap();

        assert_eq!(demand.column(1).unwrap(), vec![1.5, 3.0]);
        assert_eq!(demand.column(2).unwrap(), vec![1.0, 2.0]);
    }
}
