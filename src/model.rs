//! The energy system model: locations plus components grouped by modelling domain.
use crate::component::{Component, ComponentID, ComponentMap, LocationID, LocationMap};
use crate::id::{HasID, define_id_type};
use crate::units::Capacity;
use anyhow::{Result, ensure};
use indexmap::{IndexMap, IndexSet};

pub mod parameters;
pub use parameters::CampaignParameters;

define_id_type! {DomainID}

/// A map of [`ModelingDomain`]s, keyed by domain ID
pub type DomainMap = IndexMap<DomainID, ModelingDomain>;

/// Optimal values of a component's capacity variables
#[derive(Clone, Debug, PartialEq)]
pub enum OptimalValues {
    /// One value per location
    Locational(LocationMap<Capacity>),
    /// A location-by-location table, e.g. for transmission components.
    ///
    /// Entries are `None` where a pair of locations is not applicable (as opposed to having zero
    /// capacity).
    Linked(IndexMap<LocationID, LocationMap<Option<Capacity>>>),
}

/// The optimal capacities found for the components of a domain, in the order the engine reported
/// them
pub type OptimalCapacities = IndexMap<ComponentID, OptimalValues>;

/// A group of components which are modelled with the same technique (e.g. sources and sinks,
/// conversion, storage or transmission)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelingDomain {
    /// Components in this domain
    pub components: ComponentMap,
    /// Results of the most recent optimisation, if any
    optimal_capacities: Option<OptimalCapacities>,
}

impl ModelingDomain {
    /// The optimal capacities from the most recent optimisation.
    ///
    /// Returns `None` if the domain has not been optimised or has no capacity variables.
    pub fn optimal_capacities(&self) -> Option<&OptimalCapacities> {
        self.optimal_capacities.as_ref()
    }

    /// The domain's components, mutably, along with the optimal capacities
    pub fn split_mut(&mut self) -> (&mut ComponentMap, Option<&OptimalCapacities>) {
        (&mut self.components, self.optimal_capacities.as_ref())
    }

    /// Store the results of an optimisation
    pub fn set_optimal_capacities(&mut self, capacities: Option<OptimalCapacities>) {
        self.optimal_capacities = capacities;
    }
}

/// An energy system model
#[derive(Clone, Debug, PartialEq)]
pub struct EnergySystemModel {
    /// The locations which can be referred to by components
    locations: IndexSet<LocationID>,
    /// Components grouped by modelling domain
    domains: DomainMap,
}

impl EnergySystemModel {
    /// Create a new model with no components
    pub fn new(locations: IndexSet<LocationID>) -> Self {
        Self {
            locations,
            domains: DomainMap::new(),
        }
    }

    /// The model's locations
    pub fn locations(&self) -> &IndexSet<LocationID> {
        &self.locations
    }

    /// The model's domains
    pub fn domains(&self) -> &DomainMap {
        &self.domains
    }

    /// The model's domains, mutably
    pub fn domains_mut(&mut self) -> &mut DomainMap {
        &mut self.domains
    }

    /// Look up a component by domain and ID
    pub fn get_component(&self, domain_id: &str, component_id: &str) -> Option<&Component> {
        self.domains.get(domain_id)?.components.get(component_id)
    }

    /// Look up a component by domain and ID, mutably
    pub fn get_component_mut(
        &mut self,
        domain_id: &str,
        component_id: &str,
    ) -> Option<&mut Component> {
        self.domains
            .get_mut(domain_id)?
            .components
            .get_mut(component_id)
    }

    /// Iterate over all components in the model, along with the ID of their domain
    pub fn iter_components(&self) -> impl Iterator<Item = (&DomainID, &Component)> {
        self.domains.iter().flat_map(|(domain_id, domain)| {
            domain
                .components
                .values()
                .map(move |component| (domain_id, component))
        })
    }

    /// Register a component in the given domain, creating the domain if necessary.
    ///
    /// Fails if a component with the same name already exists in any domain.
    pub fn add(&mut self, domain_id: DomainID, component: Component) -> Result<()> {
        let id = component.get_id();
        ensure!(
            !self
                .domains
                .values()
                .any(|domain| domain.components.contains_key(id)),
            "Component {id} is already registered"
        );

        self.domains
            .entry(domain_id)
            .or_default()
            .components
            .insert(id.clone(), component);

        Ok(())
    }
}
