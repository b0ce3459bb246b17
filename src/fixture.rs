//! Fixtures for tests

use crate::component::{CapacityValues, Component, LocationID, SharedPotentialID};
use crate::model::{EnergySystemModel, OptimalValues};
use crate::units::{Capacity, Year};
use indexmap::{IndexSet, indexmap};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

fn default_locations() -> IndexSet<LocationID> {
    ["DE".into(), "FR".into()].into_iter().collect()
}

#[fixture]
pub fn locations() -> IndexSet<LocationID> {
    default_locations()
}

#[fixture]
pub fn component(locations: IndexSet<LocationID>) -> Component {
    let mut component = Component::new(
        "wind".into(),
        locations
            .iter()
            .map(|location| (location.clone(), Year(20.0)))
            .collect(),
    );
    component.capacity_max = Some(CapacityValues::Locational(
        locations
            .iter()
            .map(|location| (location.clone(), Capacity(10.0)))
            .collect(),
    ));
    component.shared_potential_id = Some(SharedPotentialID::new("wind_potential"));

    component
}

/// A model containing only `component`, in the `SourceSinkModel` domain, with the given optimal
/// capacities
pub fn solved_model(component: Component, capacities: &[(&str, f64)]) -> EnergySystemModel {
    let mut model = EnergySystemModel::new(default_locations());
    let id = component.id.clone();
    model.add("SourceSinkModel".into(), component).unwrap();

    let values = OptimalValues::Locational(
        capacities
            .iter()
            .map(|(location, value)| ((*location).into(), Capacity(*value)))
            .collect(),
    );
    model.domains_mut()["SourceSinkModel"].set_optimal_capacities(Some(indexmap! { id => values }));

    model
}
