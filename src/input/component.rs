//! Code for reading components from a CSV file.
use super::{input_err_msg, read_csv};
use crate::component::{
    CapacityValues, Component, ComponentID, LocationID, LocationMap, SharedPotentialID,
};
use crate::id::IDCollection;
use crate::model::DomainID;
use crate::units::{Capacity, Emissions, Year};
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use indexmap::map::{Entry, IndexMap};
use serde::Deserialize;
use std::path::Path;

const COMPONENTS_FILE_NAME: &str = "components.csv";

/// A row of the components CSV file, describing a component in one location
#[derive(Debug, Deserialize, PartialEq)]
struct ComponentRaw {
    domain_id: DomainID,
    component_id: ComponentID,
    location_id: String,
    technical_lifetime: Year,
    capacity_fix: Option<Capacity>,
    capacity_max: Option<Capacity>,
    capacity_min: Option<Capacity>,
    shared_potential_id: Option<SharedPotentialID>,
    yearly_limit: Option<Emissions>,
}

/// The data for one component, gathered across the rows for each of its locations
struct ComponentData {
    domain_id: DomainID,
    technical_lifetime: LocationMap<Year>,
    capacity_fix: LocationMap<Capacity>,
    capacity_max: LocationMap<Capacity>,
    capacity_min: LocationMap<Capacity>,
    shared_potential_id: Option<SharedPotentialID>,
    yearly_limit: Option<Emissions>,
}

impl ComponentData {
    fn new(row: &ComponentRaw) -> Self {
        Self {
            domain_id: row.domain_id.clone(),
            technical_lifetime: LocationMap::new(),
            capacity_fix: LocationMap::new(),
            capacity_max: LocationMap::new(),
            capacity_min: LocationMap::new(),
            shared_potential_id: row.shared_potential_id.clone(),
            yearly_limit: row.yearly_limit,
        }
    }

    /// Add the values for the row's location, checking the row agrees with earlier rows
    fn add_location(&mut self, location_id: LocationID, row: &ComponentRaw) -> Result<()> {
        ensure!(
            self.domain_id == row.domain_id,
            "Component is assigned to more than one domain ({} and {})",
            self.domain_id,
            row.domain_id
        );
        ensure!(
            self.shared_potential_id == row.shared_potential_id,
            "shared_potential_id must be the same in every location"
        );
        ensure!(
            self.yearly_limit == row.yearly_limit,
            "yearly_limit must be the same in every location"
        );
        ensure!(
            !self.technical_lifetime.contains_key(&location_id),
            "Duplicate entry for location {location_id}"
        );

        let values = [
            (&mut self.capacity_fix, row.capacity_fix),
            (&mut self.capacity_max, row.capacity_max),
            (&mut self.capacity_min, row.capacity_min),
        ];
        for (map, value) in values {
            if let Some(value) = value {
                map.insert(location_id.clone(), value);
            }
        }
        self.technical_lifetime
            .insert(location_id, row.technical_lifetime);

        Ok(())
    }

    fn into_component(self, id: ComponentID) -> Component {
        let to_values = |map: LocationMap<Capacity>| {
            (!map.is_empty()).then_some(CapacityValues::Locational(map))
        };

        let mut component = Component::new(id, self.technical_lifetime);
        component.capacity_fix = to_values(self.capacity_fix);
        component.capacity_max = to_values(self.capacity_max);
        component.capacity_min = to_values(self.capacity_min);
        component.shared_potential_id = self.shared_potential_id;
        component.yearly_limit = self.yearly_limit;

        component
    }
}

/// Check the values given for a component in one location
fn check_component_row(row: &ComponentRaw) -> Result<()> {
    ensure!(
        row.technical_lifetime.is_finite() && row.technical_lifetime > Year(0.0),
        "technical_lifetime must be a finite number greater than zero"
    );

    let capacities = [
        ("capacity_fix", row.capacity_fix),
        ("capacity_max", row.capacity_max),
        ("capacity_min", row.capacity_min),
    ];
    for (name, value) in capacities {
        if let Some(value) = value {
            ensure!(
                value.is_finite() && value >= Capacity(0.0),
                "{name} must be a finite, non-negative number"
            );
        }
    }

    if let (Some(min), Some(max)) = (row.capacity_min, row.capacity_max) {
        ensure!(min <= max, "capacity_min ({min}) exceeds capacity_max ({max})");
    }

    if let Some(limit) = row.yearly_limit {
        ensure!(
            limit.is_finite() && limit >= Emissions(0.0),
            "yearly_limit must be a finite, non-negative number"
        );
    }

    Ok(())
}

/// Read components from a CSV file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `locations` - The model's locations
///
/// # Returns
///
/// The components along with the ID of their domain, in file order
pub fn read_components(
    model_dir: &Path,
    locations: &IndexSet<LocationID>,
) -> Result<Vec<(DomainID, Component)>> {
    let file_path = model_dir.join(COMPONENTS_FILE_NAME);
    let components_csv = read_csv(&file_path)?;
    read_components_from_iter(components_csv, locations)
        .with_context(|| input_err_msg(&file_path))
}

fn read_components_from_iter<I>(
    iter: I,
    locations: &IndexSet<LocationID>,
) -> Result<Vec<(DomainID, Component)>>
where
    I: Iterator<Item = ComponentRaw>,
{
    let mut components: IndexMap<ComponentID, ComponentData> = IndexMap::new();
    for row in iter {
        let component_id = row.component_id.clone();
        let location_id = locations.get_id_by_str(&row.location_id)?;
        check_component_row(&row)
            .with_context(|| format!("Invalid entry for {component_id} in {location_id}"))?;

        let data = match components.entry(component_id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(ComponentData::new(&row)),
        };
        data.add_location(location_id, &row)
            .with_context(|| format!("Invalid entries for component {component_id}"))?;
    }

    Ok(components
        .into_iter()
        .map(|(id, data)| (data.domain_id.clone(), data.into_component(id)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, locations};
    use indexmap::indexmap;
    use rstest::rstest;

    fn row() -> ComponentRaw {
        ComponentRaw {
            domain_id: "SourceSinkModel".into(),
            component_id: "wind".into(),
            location_id: "DE".into(),
            technical_lifetime: Year(20.0),
            capacity_fix: None,
            capacity_max: Some(Capacity(10.0)),
            capacity_min: None,
            shared_potential_id: Some("wind_potential".into()),
            yearly_limit: None,
        }
    }

    #[rstest]
    fn test_read_components_from_iter(locations: IndexSet<LocationID>) {
        let rows = [
            ComponentRaw {
                location_id: "FR".into(),
                capacity_max: None,
                ..row()
            },
            row(),
        ];
        let components = read_components_from_iter(rows.into_iter(), &locations).unwrap();
        assert_eq!(components.len(), 1);

        let (domain_id, component) = &components[0];
        assert_eq!(*domain_id, "SourceSinkModel".into());
        assert_eq!(component.id, "wind".into());
        assert!(!component.is_stock());
        assert_eq!(
            component.technical_lifetime,
            indexmap! { "FR".into() => Year(20.0), "DE".into() => Year(20.0) }
        );
        assert_eq!(component.lifetime, component.technical_lifetime);
        assert_eq!(
            component.capacity_max,
            Some(CapacityValues::Locational(
                indexmap! { "DE".into() => Capacity(10.0) }
            ))
        );
        assert_eq!(component.capacity_fix, None);
        assert_eq!(component.shared_potential_id, Some("wind_potential".into()));
    }

    #[rstest]
    fn test_read_components_from_iter_unknown_location(locations: IndexSet<LocationID>) {
        let row = ComponentRaw {
            location_id: "UK".into(),
            ..row()
        };
        assert_error!(
            read_components_from_iter([row].into_iter(), &locations),
            "Unknown ID UK found"
        );
    }

    #[rstest]
    fn test_read_components_from_iter_duplicate_location(locations: IndexSet<LocationID>) {
        let rows = [row(), row()];
        assert_error!(
            read_components_from_iter(rows.into_iter(), &locations),
            "Invalid entries for component wind"
        );
    }

    #[rstest]
    fn test_read_components_from_iter_two_domains(locations: IndexSet<LocationID>) {
        let rows = [
            ComponentRaw {
                domain_id: "StorageModel".into(),
                location_id: "FR".into(),
                ..row()
            },
            row(),
        ];
        let result = read_components_from_iter(rows.into_iter(), &locations);
        assert_eq!(
            result.unwrap_err().chain().nth(1).unwrap().to_string(),
            "Component is assigned to more than one domain (StorageModel and SourceSinkModel)"
        );
    }

    #[rstest]
    #[case(ComponentRaw { technical_lifetime: Year(0.0), ..row() })]
    #[case(ComponentRaw { technical_lifetime: Year(f64::INFINITY), ..row() })]
    #[case(ComponentRaw { capacity_fix: Some(Capacity(-1.0)), ..row() })]
    #[case(ComponentRaw { capacity_min: Some(Capacity(20.0)), ..row() })]
    #[case(ComponentRaw { yearly_limit: Some(Emissions(f64::NAN)), ..row() })]
    fn test_read_components_from_iter_invalid(
        locations: IndexSet<LocationID>,
        #[case] invalid: ComponentRaw,
    ) {
        assert_error!(
            read_components_from_iter([invalid].into_iter(), &locations),
            "Invalid entry for wind in DE"
        );
    }
}
