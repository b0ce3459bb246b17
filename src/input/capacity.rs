//! Code for reading the capacity schedule replayed by the [`ReplayEngine`].
//!
//! [`ReplayEngine`]: crate::engine::ReplayEngine
use super::{input_err_msg, read_csv};
use crate::component::{ComponentID, LocationID};
use crate::engine::CapacitySchedule;
use crate::id::IDCollection;
use crate::model::{EnergySystemModel, OptimalValues};
use crate::units::Capacity;
use anyhow::{Context, Result, bail, ensure};
use log::warn;
use serde::Deserialize;
use std::path::Path;

const CAPACITIES_FILE_NAME: &str = "capacities.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct CapacityRaw {
    milestone_year: u32,
    domain_id: String,
    component_id: String,
    location_id: String,
    to_location_id: Option<String>,
    capacity: Capacity,
}

/// Read the capacity schedule from a CSV file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `model` - The model the capacities refer to
/// * `milestone_years` - The milestone years of the campaign. Every milestone year must have at
///   least one entry.
pub fn read_capacity_schedule(
    model_dir: &Path,
    model: &EnergySystemModel,
    milestone_years: &[u32],
) -> Result<CapacitySchedule> {
    let file_path = model_dir.join(CAPACITIES_FILE_NAME);
    let capacities_csv = read_csv(&file_path)?;
    read_capacity_schedule_from_iter(capacities_csv, model, milestone_years)
        .with_context(|| input_err_msg(&file_path))
}

/// Add a capacity to the values scheduled for a component.
///
/// A component's capacities must be given either all per location or all per pair of locations.
fn insert_capacity(
    values: &mut OptimalValues,
    location_id: LocationID,
    to_location_id: Option<LocationID>,
    capacity: Capacity,
) -> Result<()> {
    let existing = match (values, to_location_id) {
        (OptimalValues::Locational(map), None) => map.insert(location_id.clone(), capacity),
        (OptimalValues::Linked(table), Some(to_location_id)) => table
            .entry(location_id.clone())
            .or_default()
            .insert(to_location_id, Some(capacity))
            .flatten(),
        _ => bail!("Cannot mix capacities for single locations and pairs of locations"),
    };
    ensure!(
        existing.is_none(),
        "Duplicate capacity found for {location_id}"
    );

    Ok(())
}

fn read_capacity_schedule_from_iter<I>(
    iter: I,
    model: &EnergySystemModel,
    milestone_years: &[u32],
) -> Result<CapacitySchedule>
where
    I: Iterator<Item = CapacityRaw>,
{
    let mut schedule = CapacitySchedule::new();
    for row in iter {
        let component = model
            .get_component(&row.domain_id, &row.component_id)
            .with_context(|| {
                format!(
                    "Component {} not found in domain {}",
                    row.component_id, row.domain_id
                )
            })?;
        let location_id = model.locations().get_id_by_str(&row.location_id)?;
        let to_location_id = row
            .to_location_id
            .as_deref()
            .map(|id| model.locations().get_id_by_str(id))
            .transpose()?;
        ensure!(
            row.capacity.is_finite() && row.capacity >= Capacity(0.0),
            "Capacity must be a finite, non-negative number"
        );

        if !milestone_years.contains(&row.milestone_year) {
            warn!(
                "Capacity for {} in {} is ignored, as it is not a milestone year",
                component.id, row.milestone_year
            );
            continue;
        }

        let component_id: ComponentID = component.id.clone();
        let values = schedule
            .entry(row.milestone_year)
            .or_default()
            .entry(component_id)
            .or_insert_with(|| {
                if to_location_id.is_some() {
                    OptimalValues::Linked(Default::default())
                } else {
                    OptimalValues::Locational(Default::default())
                }
            });
        insert_capacity(values, location_id, to_location_id, row.capacity).with_context(|| {
            format!(
                "Invalid capacity for {} in {}",
                component.id, row.milestone_year
            )
        })?;
    }

    for year in milestone_years {
        ensure!(
            schedule.contains_key(year),
            "No capacities given for milestone year {year}"
        );
    }

    // Entries in milestone year order
    schedule.sort_keys();

    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::fixture::{assert_error, component, solved_model};
    use indexmap::indexmap;
    use rstest::{fixture, rstest};

    #[fixture]
    fn model(component: Component) -> EnergySystemModel {
        solved_model(component, &[])
    }

    fn row(milestone_year: u32, location_id: &str, to_location_id: Option<&str>) -> CapacityRaw {
        CapacityRaw {
            milestone_year,
            domain_id: "SourceSinkModel".into(),
            component_id: "wind".into(),
            location_id: location_id.into(),
            to_location_id: to_location_id.map(Into::into),
            capacity: Capacity(1.0),
        }
    }

    #[rstest]
    fn test_read_capacity_schedule_from_iter(model: EnergySystemModel) {
        let rows = [
            row(2030, "DE", None),
            row(2020, "DE", None),
            row(2020, "FR", None),
            row(2025, "FR", None),
        ];
        let schedule =
            read_capacity_schedule_from_iter(rows.into_iter(), &model, &[2020, 2030]).unwrap();
        assert_eq!(schedule.keys().copied().collect::<Vec<_>>(), [2020, 2030]);
        assert_eq!(
            schedule[&2020]["wind"],
            OptimalValues::Locational(indexmap! {
                "DE".into() => Capacity(1.0),
                "FR".into() => Capacity(1.0),
            })
        );
    }

    #[rstest]
    fn test_read_capacity_schedule_from_iter_linked(model: EnergySystemModel) {
        let rows = [row(2020, "DE", Some("FR")), row(2020, "FR", Some("DE"))];
        let schedule =
            read_capacity_schedule_from_iter(rows.into_iter(), &model, &[2020]).unwrap();
        assert_eq!(
            schedule[&2020]["wind"],
            OptimalValues::Linked(indexmap! {
                "DE".into() => indexmap! { "FR".into() => Some(Capacity(1.0)) },
                "FR".into() => indexmap! { "DE".into() => Some(Capacity(1.0)) },
            })
        );
    }

    #[rstest]
    fn test_read_capacity_schedule_from_iter_mixed(model: EnergySystemModel) {
        let rows = [row(2020, "DE", None), row(2020, "DE", Some("FR"))];
        assert_error!(
            read_capacity_schedule_from_iter(rows.into_iter(), &model, &[2020]),
            "Invalid capacity for wind in 2020"
        );
    }

    #[rstest]
    fn test_read_capacity_schedule_from_iter_duplicate(model: EnergySystemModel) {
        let rows = [row(2020, "DE", None), row(2020, "DE", None)];
        assert_error!(
            read_capacity_schedule_from_iter(rows.into_iter(), &model, &[2020]),
            "Invalid capacity for wind in 2020"
        );
    }

    #[rstest]
    fn test_read_capacity_schedule_from_iter_unknown_component(model: EnergySystemModel) {
        let rows = [CapacityRaw {
            component_id: "solar".into(),
            ..row(2020, "DE", None)
        }];
        assert_error!(
            read_capacity_schedule_from_iter(rows.into_iter(), &model, &[2020]),
            "Component solar not found in domain SourceSinkModel"
        );
    }

    #[rstest]
    fn test_read_capacity_schedule_from_iter_missing_year(model: EnergySystemModel) {
        let rows = [row(2020, "DE", None)];
        assert_error!(
            read_capacity_schedule_from_iter(rows.into_iter(), &model, &[2020, 2030]),
            "No capacities given for milestone year 2030"
        );
    }
}
