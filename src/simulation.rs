//! Functionality for running a myopic optimisation campaign.
use crate::engine::{Engine, OptimizationOptions};
use crate::horizon::{check_co2_reduction_targets, check_co2_sink, set_co2_reduction_target};
use crate::model::{CampaignParameters, EnergySystemModel};
use crate::output::ResultsWriter;
use crate::stock::roll_stock;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::info;

/// Solved models for each milestone year, keyed `ESM_<milestone_year>`
pub type MyopicResults = IndexMap<String, EnergySystemModel>;

/// The key under which results for a milestone year are stored
pub fn results_key(milestone_year: u32) -> String {
    format!("ESM_{milestone_year}")
}

/// The name of the solver log file for a milestone year
fn log_file_name(prefix: &str, milestone_year: u32) -> String {
    if prefix.is_empty() {
        format!("log_{milestone_year}")
    } else {
        format!("{prefix}_log_{milestone_year}")
    }
}

/// Run a myopic campaign, returning the solved model for each milestone year.
///
/// See [`run_campaign`].
pub fn optimize_myopic<E, W>(
    model: EnergySystemModel,
    engine: &mut E,
    writer: &mut W,
    params: &CampaignParameters,
) -> Result<MyopicResults>
where
    E: Engine,
    W: ResultsWriter,
{
    let mut results = MyopicResults::new();
    run_campaign(model, engine, writer, params, &mut results)?;

    Ok(results)
}

/// Run a myopic campaign.
///
/// Each milestone year is optimised in turn. The capacity installed in one milestone year is
/// given to the next as fixed stock.
///
/// # Arguments
///
/// * `model` - The model to optimise for the start year
/// * `engine` - The engine which clusters and optimises the model
/// * `writer` - Writes the results of each milestone year
/// * `params` - Parameters for the campaign
/// * `results` - Receives an independent copy of the solved model for each milestone year. If
///   the campaign fails, results for milestone years solved before the failure are kept.
pub fn run_campaign<E, W>(
    mut model: EnergySystemModel,
    engine: &mut E,
    writer: &mut W,
    params: &CampaignParameters,
    results: &mut MyopicResults,
) -> Result<()>
where
    E: Engine,
    W: ResultsWriter,
{
    let horizon = params.time_horizon()?;
    let targets = params.co2_reduction_targets.as_deref();
    check_co2_sink(
        &model,
        targets,
        &params.co2_sink_domain,
        &params.co2_sink_component,
    )?;
    check_co2_reduction_targets(targets, horizon.nb_of_steps)?;

    info!("Number of optimisation runs: {}", horizon.nb_of_runs());
    info!(
        "Number of years represented by one optimisation: {}",
        horizon.nb_of_represented_years
    );

    for (step, milestone_year) in horizon.iter_milestone_years() {
        info!("Milestone year: {milestone_year}");
        set_co2_reduction_target(&mut model, params, step)?;

        if params.time_series_aggregation {
            engine
                .cluster(
                    &mut model,
                    params.number_of_typical_periods,
                    params.number_of_time_steps_per_period,
                )
                .with_context(|| format!("Clustering failed for milestone year {milestone_year}"))?;
        }

        let options = OptimizationOptions {
            milestone_year,
            declares_optimization_problem: true,
            time_series_aggregation: params.time_series_aggregation,
            log_file_name: log_file_name(&params.log_file_name, milestone_year),
            threads: params.threads,
            solver: params.solver.clone(),
            time_limit: params.time_limit,
            optimization_specs: params.optimization_specs.clone(),
            warmstart: false,
        };
        engine
            .optimize(&mut model, &options)
            .with_context(|| format!("Optimisation failed for milestone year {milestone_year}"))?;

        writer.write_step(&model, milestone_year)?;
        results.insert(results_key(milestone_year), model.clone());

        // Nothing to carry over after the final milestone year
        if step < horizon.nb_of_steps {
            model = roll_stock(model, milestone_year, horizon.nb_of_represented_years)?;
        }
    }

    Ok(())
}
