//! Carrying installed capacity over from one milestone year to the next.
//!
//! After a milestone year has been optimised, the capacity built in that year is turned into a
//! *stock* component with a fixed capacity, so that the next optimisation only decides on new
//! capacity on top of it. Stock components age by the number of represented years at every step
//! and are retired once their remaining lifetime runs out.
use crate::component::{CapacityValues, Component, LocationID, LocationMap};
use crate::model::{DomainID, EnergySystemModel, OptimalValues};
use crate::units::Year;
use anyhow::{Context, Result};
use indexmap::IndexSet;
use log::{debug, info};

/// Convert optimal capacity values into fixed capacity values.
///
/// Location-by-location tables are flattened into one value per pair of locations. Pairs which are
/// not applicable are dropped, whereas pairs with zero capacity are kept.
pub fn capacity_from_optimal_values(values: &OptimalValues) -> CapacityValues {
    match values {
        OptimalValues::Locational(map) => CapacityValues::Locational(map.clone()),
        OptimalValues::Linked(table) => CapacityValues::Linked(
            table
                .iter()
                .flat_map(|(from, row)| {
                    row.iter().filter_map(move |(to, capacity)| {
                        capacity.map(|capacity| ((from.clone(), to.clone()), capacity))
                    })
                })
                .collect(),
        ),
    }
}

/// Create a stock component representing the capacity of `component` installed in
/// `milestone_year`.
///
/// Returns `None` if the installed capacity would not outlive the represented years in at least
/// one location.
fn create_stock(
    component: &Component,
    optimal_values: &OptimalValues,
    milestone_year: u32,
    represented_years: Year,
) -> Option<Component> {
    let lifetime: LocationMap<Year> = component
        .technical_lifetime
        .iter()
        .map(|(location, technical_lifetime)| {
            (location.clone(), *technical_lifetime - represented_years)
        })
        .collect();
    if lifetime.values().any(|lifetime| *lifetime <= Year(0.0)) {
        debug!(
            "Capacity of {} installed in {milestone_year} does not outlive the represented years",
            component.id
        );
        return None;
    }

    let mut stock = component.to_stock(milestone_year, lifetime);
    if component.capacity_fix.is_none() {
        stock.capacity_fix = Some(capacity_from_optimal_values(optimal_values));
    }

    Some(stock)
}

/// Age a stock component by the represented years, retiring it if its lifetime has run out
fn decay_stock(
    component: &mut Component,
    represented_years: Year,
    locations: &IndexSet<LocationID>,
) {
    for lifetime in component.lifetime.values_mut() {
        *lifetime = *lifetime - represented_years;
    }

    if component.any_lifetime_expired() {
        debug!("Retiring {} {}", component.kind, component.id);
        component.retire(locations);
    }
}

/// Prepare a solved model for the next milestone year.
///
/// For every domain with optimal capacities:
///
/// * capacity of original components is materialised as new stock components named
///   `<name>_stock_<milestone_year>`, unless it does not outlive the represented years
/// * existing stock components are aged by `nb_of_represented_years` and retired (capacity bounds
///   zeroed, shared potential cleared) once their lifetime runs out in any location
///
/// Domains without optimal capacities are left unchanged. Original components are never modified.
///
/// # Arguments
///
/// * `model` - The model solved for `milestone_year`. The caller is responsible for keeping a copy
///   if the solved state is still needed.
/// * `milestone_year` - The year which has just been optimised
/// * `nb_of_represented_years` - The number of years represented by each optimisation
///
/// # Returns
///
/// The model to optimise for the next milestone year, or an error if a stock component could not
/// be registered.
pub fn roll_stock(
    mut model: EnergySystemModel,
    milestone_year: u32,
    nb_of_represented_years: u32,
) -> Result<EnergySystemModel> {
    let represented_years = Year::whole(nb_of_represented_years);
    let locations = model.locations().clone();
    let domain_ids: Vec<DomainID> = model.domains().keys().cloned().collect();

    for domain_id in domain_ids {
        let mut new_stock = Vec::new();
        {
            let (components, optimal_capacities) = model.domains_mut()[&domain_id].split_mut();
            let Some(optimal_capacities) = optimal_capacities else {
                debug!("No optimal capacities for domain {domain_id}");
                continue;
            };

            for (component_id, optimal_values) in optimal_capacities {
                let component = components.get_mut(component_id).with_context(|| {
                    format!("Optimal capacities found for unknown component {component_id}")
                })?;

                if component.is_stock() {
                    decay_stock(component, represented_years, &locations);
                } else if let Some(stock) =
                    create_stock(component, optimal_values, milestone_year, represented_years)
                {
                    new_stock.push(stock);
                }
            }
        }

        for stock in new_stock {
            info!("Adding stock component {} to {domain_id}", stock.id);
            model.add(domain_id.clone(), stock)?;
        }
    }

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentID, ComponentKind, SharedPotentialID};
    use crate::fixture::{assert_error, component, locations, solved_model};
    use crate::model::OptimalCapacities;
    use crate::units::Capacity;
    use indexmap::{IndexMap, indexmap};
    use rstest::rstest;

    const DOMAIN: &str = "SourceSinkModel";

    fn capacities(values: &[(&str, f64)]) -> LocationMap<Capacity> {
        values
            .iter()
            .map(|(location, value)| ((*location).into(), Capacity(*value)))
            .collect()
    }

    fn lifetimes(value: f64, locations: &IndexSet<LocationID>) -> LocationMap<Year> {
        locations
            .iter()
            .map(|location| (location.clone(), Year(value)))
            .collect()
    }

    #[rstest]
    fn test_roll_stock_lifetime_equal_to_represented_years(
        mut component: Component,
        locations: IndexSet<LocationID>,
    ) {
        component.technical_lifetime = lifetimes(10.0, &locations);
        let model = solved_model(component, &[("DE", 5.0), ("FR", 5.0)]);

        let model = roll_stock(model, 2020, 10).unwrap();
        assert!(model.get_component(DOMAIN, "wind_stock_2020").is_none());
        assert_eq!(model.iter_components().count(), 1);
    }

    #[rstest]
    fn test_roll_stock_lifetime_expired_in_one_location(mut component: Component) {
        component.technical_lifetime = indexmap! {
            "DE".into() => Year(15.0),
            "FR".into() => Year(10.0),
        };
        let model = solved_model(component, &[("DE", 5.0), ("FR", 5.0)]);

        let model = roll_stock(model, 2020, 10).unwrap();
        assert!(model.get_component(DOMAIN, "wind_stock_2020").is_none());
    }

    #[rstest]
    fn test_roll_stock_creates_stock(mut component: Component, locations: IndexSet<LocationID>) {
        component.technical_lifetime = lifetimes(15.0, &locations);
        let original = component.clone();
        let model = solved_model(component, &[("DE", 5.0), ("FR", 5.0)]);

        let model = roll_stock(model, 2020, 10).unwrap();
        let stock = model.get_component(DOMAIN, "wind_stock_2020").unwrap();
        assert_eq!(stock.lifetime, lifetimes(5.0, &locations));
        assert_eq!(
            stock.capacity_fix,
            Some(CapacityValues::Locational(capacities(&[
                ("DE", 5.0),
                ("FR", 5.0)
            ])))
        );
        assert_eq!(
            stock.kind,
            ComponentKind::Stock {
                origin: "wind".into(),
                milestone_year: 2020
            }
        );
        assert_eq!(stock.technical_lifetime, original.technical_lifetime);
        assert_eq!(stock.capacity_max, original.capacity_max);

        // The original component is left untouched
        assert_eq!(model.get_component(DOMAIN, "wind"), Some(&original));
    }

    #[rstest]
    fn test_roll_stock_keeps_existing_capacity_fix(
        mut component: Component,
        locations: IndexSet<LocationID>,
    ) {
        component.technical_lifetime = lifetimes(15.0, &locations);
        let fixed = CapacityValues::Locational(capacities(&[("DE", 1.0), ("FR", 2.0)]));
        component.capacity_fix = Some(fixed.clone());
        let model = solved_model(component, &[("DE", 1.0), ("FR", 2.0)]);

        let model = roll_stock(model, 2020, 10).unwrap();
        let stock = model.get_component(DOMAIN, "wind_stock_2020").unwrap();
        assert_eq!(stock.capacity_fix, Some(fixed));
    }

    #[rstest]
    fn test_roll_stock_expires_existing_stock(
        component: Component,
        locations: IndexSet<LocationID>,
    ) {
        let mut stock = component.to_stock(2010, lifetimes(5.0, &locations));
        stock.capacity_fix = Some(CapacityValues::Locational(capacities(&[
            ("DE", 5.0),
            ("FR", 5.0),
        ])));
        stock.shared_potential_id = Some(SharedPotentialID::new("wind_potential"));
        let stock_id = stock.id.clone();
        let model = solved_model(stock, &[("DE", 5.0), ("FR", 5.0)]);

        let model = roll_stock(model, 2020, 10).unwrap();
        let stock = model.get_component(DOMAIN, &stock_id.0).unwrap();
        let zeros = Some(CapacityValues::zeros(&locations));
        assert_eq!(stock.lifetime, lifetimes(-5.0, &locations));
        assert_eq!(stock.capacity_fix, zeros);
        assert_eq!(stock.capacity_max, zeros);
        assert_eq!(stock.capacity_min, zeros);
        assert!(stock.shared_potential_id.is_none());

        // No stock of stock is created
        assert_eq!(model.iter_components().count(), 1);
    }

    #[rstest]
    fn test_roll_stock_ages_existing_stock(component: Component, locations: IndexSet<LocationID>) {
        let mut stock = component.to_stock(2010, lifetimes(25.0, &locations));
        let capacity_fix = Some(CapacityValues::Locational(capacities(&[("DE", 5.0)])));
        stock.capacity_fix = capacity_fix.clone();
        let stock_id = stock.id.clone();
        let model = solved_model(stock, &[("DE", 5.0)]);

        let model = roll_stock(model, 2020, 10).unwrap();
        let stock = model.get_component(DOMAIN, &stock_id.0).unwrap();
        assert_eq!(stock.lifetime, lifetimes(15.0, &locations));
        assert_eq!(stock.capacity_fix, capacity_fix);
        assert!(stock.shared_potential_id.is_some());
    }

    #[rstest]
    fn test_roll_stock_no_optimal_capacities(
        locations: IndexSet<LocationID>,
        component: Component,
    ) {
        let mut model = EnergySystemModel::new(locations);
        model.add(DOMAIN.into(), component).unwrap();
        let before = model.clone();

        let model = roll_stock(model, 2020, 10).unwrap();
        assert_eq!(model, before);
    }

    #[rstest]
    fn test_roll_stock_unknown_component(component: Component) {
        let mut model = solved_model(component, &[("DE", 5.0)]);
        let capacities: OptimalCapacities = indexmap! {
            ComponentID::new("solar") => OptimalValues::Locational(capacities(&[("DE", 1.0)]))
        };
        model.domains_mut()[DOMAIN].set_optimal_capacities(Some(capacities));

        assert_error!(
            roll_stock(model, 2020, 10),
            "Optimal capacities found for unknown component solar"
        );
    }

    #[rstest]
    fn test_roll_stock_collision(mut component: Component, locations: IndexSet<LocationID>) {
        component.technical_lifetime = lifetimes(15.0, &locations);
        let mut model = solved_model(component, &[("DE", 5.0)]);
        model
            .add(
                "StorageModel".into(),
                Component::new("wind_stock_2020".into(), IndexMap::new()),
            )
            .unwrap();

        assert_error!(
            roll_stock(model, 2020, 10),
            "Component wind_stock_2020 is already registered"
        );
    }

    #[test]
    fn test_capacity_from_optimal_values_linked() {
        let de = LocationID::new("DE");
        let fr = LocationID::new("FR");
        let table = OptimalValues::Linked(indexmap! {
            de.clone() => indexmap! { de.clone() => None, fr.clone() => Some(Capacity(3.0)) },
            fr.clone() => indexmap! { de.clone() => Some(Capacity(0.0)), fr.clone() => None },
        });

        assert_eq!(
            capacity_from_optimal_values(&table),
            CapacityValues::Linked(indexmap! {
                (de.clone(), fr.clone()) => Capacity(3.0),
                (fr, de) => Capacity(0.0),
            })
        );
    }
}
