//! Planning of the time horizon for a myopic campaign.
//!
//! The horizon is described by a start year plus any two of: an end year, the number of steps
//! after the start year and the number of years represented by each step. The missing value is
//! derived from the others. CO2 reduction targets, if given, must line up with the steps.
use crate::component::ComponentID;
use crate::model::{CampaignParameters, DomainID, EnergySystemModel};
use crate::units::{Dimensionless, Emissions};
use anyhow::{Context, Result, ensure};
use log::info;

/// Indicates that the campaign has been configured inconsistently.
///
/// Raised before any optimisation is attempted.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
#[display("{_0}")]
pub struct ConfigurationError(String);

impl ConfigurationError {
    /// Create a new [`ConfigurationError`] with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::error::Error for ConfigurationError {}

/// The resolved time horizon of a campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeHorizon {
    /// Year of the first optimisation
    pub start_year: u32,
    /// Number of optimisation runs after the start year
    pub nb_of_steps: u32,
    /// Number of years represented by one optimisation run
    pub nb_of_represented_years: u32,
}

impl TimeHorizon {
    /// Total number of optimisation runs, including the start year
    pub fn nb_of_runs(&self) -> u32 {
        self.nb_of_steps + 1
    }

    /// The year of the final optimisation
    pub fn end_year(&self) -> u32 {
        self.milestone_year(self.nb_of_steps)
    }

    /// The milestone year of the given step (the start year is step 0)
    pub fn milestone_year(&self, step: u32) -> u32 {
        self.start_year + step * self.nb_of_represented_years
    }

    /// Iterate over `(step, milestone_year)` for every optimisation run
    pub fn iter_milestone_years(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..=self.nb_of_steps).map(move |step| (step, self.milestone_year(step)))
    }
}

/// The number of years between `start_year` and `end_year`, which must be positive
fn year_span(start_year: u32, end_year: u32) -> Result<u32> {
    ensure!(
        end_year > start_year,
        ConfigurationError::new(format!(
            "end_year ({end_year}) must be later than start_year ({start_year}): at least two \
            optimisation runs are required"
        ))
    );

    Ok(end_year - start_year)
}

/// Resolve the number of optimisation steps and the number of years each step represents.
///
/// # Arguments
///
/// * `start_year` - Year of the first optimisation
/// * `end_year` - Year of the last optimisation, if known
/// * `nb_of_steps` - Number of optimisation runs after the start year, if known
/// * `nb_of_represented_years` - Number of years represented by each run, if known
///
/// # Returns
///
/// The resolved [`TimeHorizon`], or a [`ConfigurationError`] if the values are inconsistent,
/// under-specified, or would result in fewer than two optimisation runs.
pub fn check_and_set_time_horizon(
    start_year: u32,
    end_year: Option<u32>,
    nb_of_steps: Option<u32>,
    nb_of_represented_years: Option<u32>,
) -> Result<TimeHorizon> {
    let (nb_of_steps, nb_of_represented_years) =
        match (end_year, nb_of_steps, nb_of_represented_years) {
            // Only the end year is given: a single step spanning the whole horizon
            (Some(end_year), None, None) => (1, year_span(start_year, end_year)?),
            (Some(end_year), Some(steps), None) => {
                let span = year_span(start_year, end_year)?;
                ensure!(
                    steps > 0 && span % steps == 0,
                    ConfigurationError::new(format!(
                        "nb_of_steps ({steps}) does not fit the {span} years between start_year \
                        and end_year"
                    ))
                );
                (steps, span / steps)
            }
            (Some(end_year), None, Some(years)) => {
                let span = year_span(start_year, end_year)?;
                ensure!(
                    years > 0 && span % years == 0,
                    ConfigurationError::new(format!(
                        "nb_of_represented_years ({years}) does not fit the {span} years between \
                        start_year and end_year"
                    ))
                );
                (span / years, years)
            }
            (None, Some(steps), Some(years)) => (steps, years),
            (Some(end_year), Some(steps), Some(years)) => {
                ensure!(
                    u64::from(start_year) + u64::from(steps) * u64::from(years)
                        == u64::from(end_year),
                    ConfigurationError::new(format!(
                        "start_year ({start_year}) + nb_of_steps ({steps}) * \
                        nb_of_represented_years ({years}) does not equal end_year ({end_year})"
                    ))
                );
                (steps, years)
            }
            _ => Err(ConfigurationError::new(
                "Please specify end_year, or both nb_of_steps and nb_of_represented_years",
            ))?,
        };

    ensure!(
        nb_of_steps >= 1,
        ConfigurationError::new(
            "nb_of_steps must be at least 1: at least two optimisation runs are required"
        )
    );
    ensure!(
        nb_of_represented_years >= 1,
        ConfigurationError::new("nb_of_represented_years must be at least 1")
    );
    ensure!(
        u32::try_from(
            u64::from(start_year) + u64::from(nb_of_steps) * u64::from(nb_of_represented_years)
        )
        .is_ok(),
        ConfigurationError::new("The time horizon extends beyond the range of valid years")
    );

    Ok(TimeHorizon {
        start_year,
        nb_of_steps,
        nb_of_represented_years,
    })
}

/// Check that the CO2-accounting sink is present if reduction targets are given
pub fn check_co2_sink(
    model: &EnergySystemModel,
    targets: Option<&[Dimensionless]>,
    domain_id: &DomainID,
    component_id: &ComponentID,
) -> Result<()> {
    if targets.is_none() {
        return Ok(());
    }

    ensure!(
        model.get_component(&domain_id.0, &component_id.0).is_some(),
        ConfigurationError::new(format!(
            "CO2 reduction targets require a sink component \"{component_id}\" in domain \
            \"{domain_id}\" which counts CO2 emissions"
        ))
    );

    Ok(())
}

/// Check that there is one CO2 reduction target per step and that each is a valid percentage
pub fn check_co2_reduction_targets(
    targets: Option<&[Dimensionless]>,
    nb_of_steps: u32,
) -> Result<()> {
    let Some(targets) = targets else {
        return Ok(());
    };

    ensure!(
        targets.len() == nb_of_steps as usize,
        ConfigurationError::new(format!(
            "The number of CO2 reduction targets ({}) must equal the number of steps \
            ({nb_of_steps})",
            targets.len()
        ))
    );

    for target in targets {
        ensure!(
            (Dimensionless(0.0)..=Dimensionless(100.0)).contains(target),
            ConfigurationError::new(format!(
                "CO2 reduction targets must be between 0 and 100 percent, got {}",
                target.0
            ))
        );
    }

    Ok(())
}

/// The CO2 limit for a given step, if there is one.
///
/// The start year (step 0) is the unconstrained reference run. Step `k` uses the `k - 1`th target.
pub fn co2_limit_for_step(
    reference: Emissions,
    targets: Option<&[Dimensionless]>,
    step: u32,
) -> Option<Emissions> {
    let index = usize::try_from(step.checked_sub(1)?).ok()?;
    let target = *targets?.get(index)?;

    Some(reference * (Dimensionless(1.0) - target * Dimensionless(0.01)))
}

/// Apply the CO2 reduction target for the given step to the CO2-accounting sink
pub fn set_co2_reduction_target(
    model: &mut EnergySystemModel,
    params: &CampaignParameters,
    step: u32,
) -> Result<()> {
    let Some(limit) = co2_limit_for_step(
        params.co2_reference,
        params.co2_reduction_targets.as_deref(),
        step,
    ) else {
        return Ok(());
    };

    let sink = model
        .get_component_mut(&params.co2_sink_domain.0, &params.co2_sink_component.0)
        .with_context(|| {
            format!(
                "CO2 sink component {} not found",
                params.co2_sink_component
            )
        })?;
    sink.yearly_limit = Some(limit);
    info!("CO2 limit for {}: {limit}", sink.id);

    Ok(())
}
