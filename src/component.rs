//! Components are the technologies (sources, sinks, conversions, storage, transmission) which make
//! up an energy system model.
//!
//! A component is either an *original* component, whose capacity is freely re-optimised in every
//! milestone year, or a *stock* component, which represents capacity installed in an earlier
//! milestone year and carried forward with a fixed capacity.
use crate::id::{define_id_getter, define_id_type};
use crate::units::{Capacity, Emissions, Year};
use indexmap::IndexMap;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

define_id_type! {ComponentID}
define_id_type! {LocationID}
define_id_type! {SharedPotentialID}

/// A map of [`Component`]s, keyed by component ID
pub type ComponentMap = IndexMap<ComponentID, Component>;

/// A per-location value (e.g. a lifetime or a capacity)
pub type LocationMap<T> = IndexMap<LocationID, T>;

/// The separator used when naming stock components
const STOCK_MARKER: &str = "_stock_";

/// Whether a component is freely optimised or carried over from an earlier milestone year
#[derive(Clone, Debug, PartialEq, strum::Display)]
pub enum ComponentKind {
    /// A component whose capacity is optimised in every milestone year
    #[strum(serialize = "original")]
    Original,
    /// Capacity installed in an earlier milestone year, fixed from then on
    #[strum(serialize = "stock")]
    Stock {
        /// The component this stock was derived from
        origin: ComponentID,
        /// The milestone year in which the capacity was installed
        milestone_year: u32,
    },
}

/// The role of a component, as written to output files
#[derive(Clone, Copy, Debug, PartialEq, SerializeLabeledStringEnum, DeserializeLabeledStringEnum)]
pub enum ComponentRole {
    #[string = "original"]
    /// See [`ComponentKind::Original`]
    Original,
    #[string = "stock"]
    /// See [`ComponentKind::Stock`]
    Stock,
}

/// Capacity values for a component, either one per location or one per pair of locations
#[derive(Clone, Debug, PartialEq)]
pub enum CapacityValues {
    /// One value per location
    Locational(LocationMap<Capacity>),
    /// One value per `(from, to)` pair of locations, as used for transmission components
    Linked(IndexMap<(LocationID, LocationID), Capacity>),
}

impl CapacityValues {
    /// A zero capacity at each of the given locations
    pub fn zeros<'a, I>(locations: I) -> Self
    where
        I: IntoIterator<Item = &'a LocationID>,
    {
        Self::Locational(
            locations
                .into_iter()
                .map(|location| (location.clone(), Capacity(0.0)))
                .collect(),
        )
    }

    /// Iterate over the capacity values, labelled with their location (or pair of locations)
    pub fn iter(&self) -> Box<dyn Iterator<Item = (LocationKey<'_>, Capacity)> + '_> {
        match self {
            Self::Locational(map) => Box::new(
                map.iter()
                    .map(|(location, capacity)| (LocationKey::Single(location), *capacity)),
            ),
            Self::Linked(map) => Box::new(
                map.iter()
                    .map(|((from, to), capacity)| (LocationKey::Pair(from, to), *capacity)),
            ),
        }
    }

    /// Look up the capacity for a location (or pair of locations)
    pub fn get(&self, key: &LocationKey) -> Option<Capacity> {
        match (self, key) {
            (Self::Locational(map), LocationKey::Single(location)) => map.get(*location).copied(),
            (Self::Linked(map), LocationKey::Pair(from, to)) => {
                map.get(&((*from).clone(), (*to).clone())).copied()
            }
            _ => None,
        }
    }

    /// Whether all values are zero
    pub fn is_zero(&self) -> bool {
        self.iter().all(|(_, capacity)| capacity == Capacity(0.0))
    }
}

/// Identifies a single capacity value within [`CapacityValues`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LocationKey<'a> {
    /// A single location
    Single(&'a LocationID),
    /// A `(from, to)` pair of locations
    Pair(&'a LocationID, &'a LocationID),
}

impl LocationKey<'_> {
    /// The first location referred to by this key
    pub fn location(&self) -> &LocationID {
        match self {
            Self::Single(location) | Self::Pair(location, _) => location,
        }
    }

    /// The second location of a pair, if any
    pub fn to_location(&self) -> Option<&LocationID> {
        match self {
            Self::Single(_) => None,
            Self::Pair(_, to) => Some(to),
        }
    }
}

/// A component of an energy system model
#[derive(Clone, Debug, PartialEq)]
pub struct Component {
    /// Unique name of the component
    pub id: ComponentID,
    /// Whether this is an original or a stock component
    pub kind: ComponentKind,
    /// Total service life of the technology in each location. Never changes.
    pub technical_lifetime: LocationMap<Year>,
    /// Remaining service life in each location
    pub lifetime: LocationMap<Year>,
    /// Fixed capacity, if any
    pub capacity_fix: Option<CapacityValues>,
    /// Upper bound on capacity, if any
    pub capacity_max: Option<CapacityValues>,
    /// Lower bound on capacity, if any
    pub capacity_min: Option<CapacityValues>,
    /// Components with the same ID share a capacity potential
    pub shared_potential_id: Option<SharedPotentialID>,
    /// Annual limit on the commodity flowing through this component (e.g. CO2 emissions)
    pub yearly_limit: Option<Emissions>,
}
define_id_getter! {Component, ComponentID}

impl Component {
    /// Create a new original component, whose remaining lifetime equals its technical lifetime
    pub fn new(id: ComponentID, technical_lifetime: LocationMap<Year>) -> Self {
        Self {
            id,
            kind: ComponentKind::Original,
            lifetime: technical_lifetime.clone(),
            technical_lifetime,
            capacity_fix: None,
            capacity_max: None,
            capacity_min: None,
            shared_potential_id: None,
            yearly_limit: None,
        }
    }

    /// Whether this component represents capacity carried over from an earlier milestone year
    pub fn is_stock(&self) -> bool {
        matches!(self.kind, ComponentKind::Stock { .. })
    }

    /// The role of this component, for output files
    pub fn role(&self) -> ComponentRole {
        match self.kind {
            ComponentKind::Original => ComponentRole::Original,
            ComponentKind::Stock { .. } => ComponentRole::Stock,
        }
    }

    /// The ID of the component a stock component was derived from
    pub fn origin(&self) -> Option<&ComponentID> {
        match &self.kind {
            ComponentKind::Original => None,
            ComponentKind::Stock { origin, .. } => Some(origin),
        }
    }

    /// Whether the remaining lifetime has run out in at least one location
    pub fn any_lifetime_expired(&self) -> bool {
        self.lifetime.values().any(|lifetime| *lifetime <= Year(0.0))
    }

    /// Create a stock component from this one, representing capacity installed in `milestone_year`
    ///
    /// The stock is a full duplicate of `self`, except for its name, kind and remaining lifetime.
    pub fn to_stock(&self, milestone_year: u32, lifetime: LocationMap<Year>) -> Self {
        Self {
            id: stock_id(&self.id, milestone_year),
            kind: ComponentKind::Stock {
                origin: self.id.clone(),
                milestone_year,
            },
            lifetime,
            ..self.clone()
        }
    }

    /// Permanently retire a component by zeroing its capacity bounds at every location.
    ///
    /// The component is also removed from any shared capacity potential.
    pub fn retire<'a, I>(&mut self, locations: I)
    where
        I: IntoIterator<Item = &'a LocationID> + Clone,
    {
        self.capacity_fix = Some(CapacityValues::zeros(locations.clone()));
        self.capacity_max = Some(CapacityValues::zeros(locations.clone()));
        self.capacity_min = Some(CapacityValues::zeros(locations));
        self.shared_potential_id = None;
    }
}

/// The name given to stock derived from `id` in `milestone_year`
pub fn stock_id(id: &ComponentID, milestone_year: u32) -> ComponentID {
    format!("{id}{STOCK_MARKER}{milestone_year}").into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{component, locations};
    use indexmap::IndexSet;
    use rstest::rstest;

    #[rstest]
    fn test_to_stock(component: Component) {
        let lifetime: LocationMap<Year> = [("DE".into(), Year(5.0))].into_iter().collect();
        let stock = component.to_stock(2020, lifetime.clone());
        assert_eq!(stock.id, ComponentID::new("wind_stock_2020"));
        assert_eq!(
            stock.kind,
            ComponentKind::Stock {
                origin: "wind".into(),
                milestone_year: 2020
            }
        );
        assert_eq!(stock.lifetime, lifetime);
        assert_eq!(stock.technical_lifetime, component.technical_lifetime);
        assert_eq!(stock.capacity_max, component.capacity_max);
        assert_eq!(stock.shared_potential_id, component.shared_potential_id);
        assert!(stock.is_stock());
        assert!(!component.is_stock());
        assert_eq!(stock.origin(), Some(&component.id));
    }

    #[rstest]
    fn test_retire(mut component: Component, locations: IndexSet<LocationID>) {
        component.retire(&locations);
        let zeros = Some(CapacityValues::zeros(&locations));
        assert_eq!(component.capacity_fix, zeros);
        assert_eq!(component.capacity_max, zeros);
        assert_eq!(component.capacity_min, zeros);
        assert!(component.shared_potential_id.is_none());
        assert!(component.capacity_fix.unwrap().is_zero());
    }

    #[rstest]
    #[case(&[10.0, 10.0], false)]
    #[case(&[10.0, 0.0], true)]
    #[case(&[-5.0, 3.0], true)]
    fn test_any_lifetime_expired(
        mut component: Component,
        #[case] lifetimes: &[f64],
        #[case] expected: bool,
    ) {
        component.lifetime = ["DE", "FR"]
            .into_iter()
            .zip(lifetimes)
            .map(|(location, lifetime)| (location.into(), Year(*lifetime)))
            .collect();
        assert_eq!(component.any_lifetime_expired(), expected);
    }

    #[test]
    fn test_capacity_values_get() {
        let de = LocationID::new("DE");
        let fr = LocationID::new("FR");
        let linked = CapacityValues::Linked(
            [((de.clone(), fr.clone()), Capacity(2.0))]
                .into_iter()
                .collect(),
        );
        assert_eq!(linked.get(&LocationKey::Pair(&de, &fr)), Some(Capacity(2.0)));
        assert_eq!(linked.get(&LocationKey::Pair(&fr, &de)), None);
        assert_eq!(linked.get(&LocationKey::Single(&de)), None);
    }
}
