//! The interface to the energy system modelling engine which clusters and optimises a model.
//!
//! The myopic campaign only needs two operations from an engine: clustering of time series data
//! and optimisation of a model, after which each domain's optimal capacities are available on the
//! model. The [`ReplayEngine`] provided here reports a prescribed capacity schedule as the optimum,
//! which allows a campaign to be run without a solver.
use crate::component::{CapacityValues, Component, ComponentID};
use crate::model::{EnergySystemModel, OptimalCapacities, OptimalValues};
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use log::{debug, info};

/// Capacities scheduled for each component, keyed by milestone year
pub type CapacitySchedule = IndexMap<u32, IndexMap<ComponentID, OptimalValues>>;

/// Options for a single optimisation
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizationOptions {
    /// The milestone year being optimised
    pub milestone_year: u32,
    /// Whether the optimisation problem should be declared anew
    pub declares_optimization_problem: bool,
    /// Whether to optimise on clustered time series data
    pub time_series_aggregation: bool,
    /// Name of the solver's log file
    pub log_file_name: String,
    /// Number of threads the solver may use
    pub threads: u32,
    /// Identifier of the solver to use
    pub solver: String,
    /// Time limit for the solve, in seconds
    pub time_limit: Option<f64>,
    /// Solver-specific options
    pub optimization_specs: String,
    /// Whether to warm-start the solver
    pub warmstart: bool,
}

/// An energy system modelling engine
pub trait Engine {
    /// Cluster the model's time series data into typical periods
    fn cluster(
        &mut self,
        model: &mut EnergySystemModel,
        number_of_typical_periods: u32,
        number_of_time_steps_per_period: u32,
    ) -> Result<()>;

    /// Optimise the model, storing each domain's optimal capacities on it.
    ///
    /// Fails if the problem is infeasible or the solver fails.
    fn optimize(
        &mut self,
        model: &mut EnergySystemModel,
        options: &OptimizationOptions,
    ) -> Result<()>;
}

/// An engine which reports a prescribed capacity schedule as the optimal solution.
///
/// Original components take the capacities scheduled for them in the milestone year being
/// optimised. Components with a fixed capacity (including all stock components) report that
/// capacity.
#[derive(Debug, Default)]
pub struct ReplayEngine {
    schedule: CapacitySchedule,
    typical_periods: Option<(u32, u32)>,
}

impl ReplayEngine {
    /// Create a new [`ReplayEngine`] from a capacity schedule
    pub fn new(schedule: CapacitySchedule) -> Self {
        Self {
            schedule,
            typical_periods: None,
        }
    }

    /// The clustering last requested, as `(typical periods, time steps per period)`
    pub fn typical_periods(&self) -> Option<(u32, u32)> {
        self.typical_periods
    }
}

/// Convert fixed capacity values into the form reported by an optimisation
fn optimal_values_from_capacity(values: &CapacityValues) -> OptimalValues {
    match values {
        CapacityValues::Locational(map) => OptimalValues::Locational(map.clone()),
        CapacityValues::Linked(map) => {
            let mut table: IndexMap<_, IndexMap<_, _>> = IndexMap::new();
            for ((from, to), capacity) in map {
                table
                    .entry(from.clone())
                    .or_default()
                    .insert(to.clone(), Some(*capacity));
            }
            OptimalValues::Linked(table)
        }
    }
}

/// Check that scheduled capacities respect the component's capacity bounds
fn check_bounds(component: &Component, values: &OptimalValues) -> Result<()> {
    let OptimalValues::Locational(values) = values else {
        return Ok(());
    };

    for (location, capacity) in values {
        if let Some(CapacityValues::Locational(max)) = &component.capacity_max {
            if let Some(max) = max.get(location) {
                ensure!(
                    capacity <= max,
                    "Infeasible: capacity of {} in {location} ({capacity}) exceeds its maximum \
                    ({max})",
                    component.id
                );
            }
        }
        if let Some(CapacityValues::Locational(min)) = &component.capacity_min {
            if let Some(min) = min.get(location) {
                ensure!(
                    capacity >= min,
                    "Infeasible: capacity of {} in {location} ({capacity}) is below its minimum \
                    ({min})",
                    component.id
                );
            }
        }
    }

    Ok(())
}

impl Engine for ReplayEngine {
    fn cluster(
        &mut self,
        _model: &mut EnergySystemModel,
        number_of_typical_periods: u32,
        number_of_time_steps_per_period: u32,
    ) -> Result<()> {
        ensure!(
            number_of_typical_periods > 0 && number_of_time_steps_per_period > 0,
            "Cannot cluster into {number_of_typical_periods} periods of \
            {number_of_time_steps_per_period} time steps"
        );
        debug!(
            "Clustering into {number_of_typical_periods} typical periods of \
            {number_of_time_steps_per_period} time steps"
        );
        self.typical_periods = Some((number_of_typical_periods, number_of_time_steps_per_period));

        Ok(())
    }

    fn optimize(
        &mut self,
        model: &mut EnergySystemModel,
        options: &OptimizationOptions,
    ) -> Result<()> {
        let year = options.milestone_year;
        if options.time_series_aggregation && self.typical_periods.is_none() {
            bail!("Time series aggregation requested, but the model has not been clustered");
        }

        let scheduled = self
            .schedule
            .get(&year)
            .with_context(|| format!("No capacities scheduled for milestone year {year}"))?;
        for component_id in scheduled.keys() {
            ensure!(
                model
                    .iter_components()
                    .any(|(_, component)| component.id == *component_id),
                "Capacities scheduled for unknown component {component_id}"
            );
        }

        info!(
            "Replaying capacities for {year} (solver: {}, threads: {}, log file: {})",
            options.solver, options.threads, options.log_file_name
        );
        for domain in model.domains_mut().values_mut() {
            let mut capacities = OptimalCapacities::new();
            for component in domain.components.values() {
                let values = if let Some(capacity_fix) = &component.capacity_fix {
                    optimal_values_from_capacity(capacity_fix)
                } else if let Some(values) = scheduled.get(&component.id) {
                    check_bounds(component, values)?;
                    values.clone()
                } else {
                    continue;
                };
                capacities.insert(component.id.clone(), values);
            }

            domain.set_optimal_capacities((!capacities.is_empty()).then_some(capacities));
        }

        Ok(())
    }
}
