//! Defines the `CampaignParameters` struct, which represents the contents of `model.toml`.
use crate::component::ComponentID;
use crate::horizon::{TimeHorizon, check_and_set_time_horizon, check_co2_reduction_targets};
use crate::input::{input_err_msg, read_toml};
use crate::model::DomainID;
use crate::units::{Dimensionless, Emissions};
use anyhow::{Context, Result, ensure};
use log::warn;
use serde::Deserialize;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_time_series_aggregation, bool, true);
define_param_default!(default_number_of_typical_periods, u32, 7);
define_param_default!(default_number_of_time_steps_per_period, u32, 24);
define_param_default!(default_threads, u32, 3);
define_param_default!(default_solver, String, "gurobi".into());
define_param_default!(default_co2_reference, Emissions, Emissions(366.0));
define_param_default!(default_co2_sink_domain, DomainID, "SourceSinkModel".into());
define_param_default!(default_co2_sink_component, ComponentID, "CO2 to environment".into());

/// Parameters for a myopic optimisation campaign
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CampaignParameters {
    /// Year of the first optimisation
    pub start_year: u32,
    /// Year of the last optimisation
    #[serde(default)]
    pub end_year: Option<u32>,
    /// Number of optimisation runs, excluding the start year
    #[serde(default)]
    pub nb_of_steps: Option<u32>,
    /// Number of years represented by one optimisation run
    #[serde(default)]
    pub nb_of_represented_years: Option<u32>,
    /// Whether to optimise on clustered time series data rather than the full time series
    #[serde(default = "default_time_series_aggregation")]
    pub time_series_aggregation: bool,
    /// The number of typical periods the time series are clustered into
    #[serde(default = "default_number_of_typical_periods")]
    pub number_of_typical_periods: u32,
    /// The number of time steps per typical period
    #[serde(default = "default_number_of_time_steps_per_period")]
    pub number_of_time_steps_per_period: u32,
    /// Prefix for the solver log file of each milestone year
    #[serde(default)]
    pub log_file_name: String,
    /// Number of threads the solver may use
    #[serde(default = "default_threads")]
    pub threads: u32,
    /// Identifier of the solver to use
    #[serde(default = "default_solver")]
    pub solver: String,
    /// Time limit for each solve, in seconds
    #[serde(default)]
    pub time_limit: Option<f64>,
    /// Solver-specific options, passed through unchanged
    #[serde(default)]
    pub optimization_specs: String,
    /// Whether to warm-start the solver. Always disabled between milestone years.
    #[serde(default)]
    pub warmstart: bool,
    /// CO2 reduction targets (in percent of `co2_reference`) for each step after the start year
    #[serde(default)]
    pub co2_reduction_targets: Option<Vec<Dimensionless>>,
    /// Annual CO2 emissions which reduction targets are relative to
    #[serde(default = "default_co2_reference")]
    pub co2_reference: Emissions,
    /// The domain containing the CO2-accounting sink
    #[serde(default = "default_co2_sink_domain")]
    pub co2_sink_domain: DomainID,
    /// The component which accounts for CO2 released to the environment
    #[serde(default = "default_co2_sink_component")]
    pub co2_sink_component: ComponentID,
}

/// Check that the clustering parameters are valid
fn check_clustering(
    number_of_typical_periods: u32,
    number_of_time_steps_per_period: u32,
) -> Result<()> {
    ensure!(
        number_of_typical_periods > 0,
        "number_of_typical_periods must be greater than zero"
    );
    ensure!(
        number_of_time_steps_per_period > 0,
        "number_of_time_steps_per_period must be greater than zero"
    );

    Ok(())
}

/// Check that the `time_limit` parameter is valid
fn check_time_limit(value: Option<f64>) -> Result<()> {
    if let Some(value) = value {
        ensure!(
            value.is_finite() && value > 0.0,
            "time_limit must be a finite number greater than zero"
        );
    }

    Ok(())
}

/// Check that the `co2_reference` parameter is valid
fn check_co2_reference(value: Emissions) -> Result<()> {
    ensure!(
        value.is_finite() && value >= Emissions(0.0),
        "co2_reference must be a finite, non-negative number"
    );

    Ok(())
}

impl CampaignParameters {
    /// Parameters for a campaign starting in `start_year`, with all other options at their
    /// defaults
    pub fn new(start_year: u32) -> Self {
        Self {
            start_year,
            end_year: None,
            nb_of_steps: None,
            nb_of_represented_years: None,
            time_series_aggregation: default_time_series_aggregation(),
            number_of_typical_periods: default_number_of_typical_periods(),
            number_of_time_steps_per_period: default_number_of_time_steps_per_period(),
            log_file_name: String::new(),
            threads: default_threads(),
            solver: default_solver(),
            time_limit: None,
            optimization_specs: String::new(),
            warmstart: false,
            co2_reduction_targets: None,
            co2_reference: default_co2_reference(),
            co2_sink_domain: default_co2_sink_domain(),
            co2_sink_component: default_co2_sink_component(),
        }
    }

    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`CampaignParameters`] struct or an error if the file is
    /// invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<CampaignParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let params: CampaignParameters = read_toml(&file_path)?;

        params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(params)
    }

    /// Resolve the number of steps and years represented by each step
    pub fn time_horizon(&self) -> Result<TimeHorizon> {
        check_and_set_time_horizon(
            self.start_year,
            self.end_year,
            self.nb_of_steps,
            self.nb_of_represented_years,
        )
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        let horizon = self.time_horizon()?;
        check_co2_reduction_targets(self.co2_reduction_targets.as_deref(), horizon.nb_of_steps)?;

        if self.time_series_aggregation {
            check_clustering(
                self.number_of_typical_periods,
                self.number_of_time_steps_per_period,
            )?;
        }

        ensure!(self.threads > 0, "threads cannot be zero");
        check_time_limit(self.time_limit)?;
        check_co2_reference(self.co2_reference)?;

        if self.warmstart {
            warn!("warmstart is ignored: each milestone year is solved from scratch");
        }

        Ok(())
    }
}
