//! The command line interface for running myopic campaigns.
use crate::horizon::{check_co2_sink, co2_limit_for_step};
use crate::input::load_model;
use crate::log;
use crate::model::CampaignParameters;
use crate::output::metadata::write_metadata;
use crate::output::{CsvResultsWriter, create_output_directory, get_output_dir};
use crate::settings::Settings;
use crate::simulation::{MyopicResults, run_campaign};
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for running myopic campaigns.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run a myopic campaign on a model.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Show the milestone years and CO2 limits of a model's campaign.
    Plan {
        /// Path to the model directory.
        model_dir: PathBuf,
    },
    /// Validate a model.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
    },
    /// Manage program settings.
    Settings {
        /// The subcommands for managing the settings file
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_dir, opts } => handle_run_command(&model_dir, &opts, None),
            Self::Plan { model_dir } => handle_plan_command(&model_dir, None),
            Self::Validate { model_dir } => handle_validate_command(&model_dir, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start transpath
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ transpath --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Initialise the program logger, unless it has already been initialised
fn init_logger(settings: &Settings, log_file_path: Option<&Path>) -> Result<()> {
    if log::is_logger_initialised() {
        return Ok(());
    }

    log::init(&settings.log_level, log_file_path).context("Failed to initialise logging.")
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(model_path)?;
        &pathbuf
    };

    // This setting can be overridden by command-line argument
    let allow_overwrite = opts.overwrite || settings.overwrite;
    let overwrite = create_output_directory(output_path, allow_overwrite).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_path.display()
        )
    })?;

    init_logger(&settings, Some(output_path))?;

    // Load the model to run
    let (model, params, mut engine) = load_model(model_path).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    write_metadata(output_path, model_path, &params.time_horizon()?)
        .context("Failed to save metadata.")?;

    // Run the campaign
    let mut writer = CsvResultsWriter::new(output_path);
    let mut results = MyopicResults::new();
    let outcome = run_campaign(model, &mut engine, &mut writer, &params, &mut results);
    if outcome.is_err() && !results.is_empty() {
        warn!(
            "Results were written for {} milestone year(s) before the campaign failed",
            results.len()
        );
    }
    outcome?;
    info!("Campaign complete!");

    Ok(())
}

/// Handle the `plan` command.
pub fn handle_plan_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;
    init_logger(&settings, None)?;

    let params = CampaignParameters::from_path(model_path).context("Failed to load model.")?;
    for line in describe_plan(&params)? {
        println!("{line}");
    }

    Ok(())
}

/// Describe each optimisation run of a campaign
fn describe_plan(params: &CampaignParameters) -> Result<Vec<String>> {
    let horizon = params.time_horizon()?;
    let targets = params.co2_reduction_targets.as_deref();
    let mut lines = vec![format!(
        "{} optimisation runs, each representing {} years",
        horizon.nb_of_runs(),
        horizon.nb_of_represented_years
    )];
    for (step, milestone_year) in horizon.iter_milestone_years() {
        let line = match co2_limit_for_step(params.co2_reference, targets, step) {
            Some(limit) => format!("{milestone_year}: CO2 limit {limit}"),
            None => format!("{milestone_year}: no CO2 limit"),
        };
        lines.push(line);
    }

    Ok(lines)
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;

    // Initialise program logger (we won't save log files when running the validate command)
    init_logger(&settings, None)?;

    // Load/validate the model
    let (model, params, _) = load_model(model_path).context("Failed to validate model.")?;
    check_co2_sink(
        &model,
        params.co2_reduction_targets.as_deref(),
        &params.co2_sink_domain,
        &params.co2_sink_component,
    )
    .context("Failed to validate model.")?;
    info!("Model validation successful!");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Dimensionless;

    #[test]
    fn test_describe_plan() {
        let mut params = CampaignParameters::new(2020);
        params.end_year = Some(2040);
        params.nb_of_steps = Some(2);
        params.co2_reduction_targets = Some(vec![Dimensionless(50.0), Dimensionless(100.0)]);

        assert_eq!(
            describe_plan(&params).unwrap(),
            [
                "3 optimisation runs, each representing 10 years",
                "2020: no CO2 limit",
                "2030: CO2 limit 183",
                "2040: CO2 limit 0",
            ]
        );
    }

    #[test]
    fn test_describe_plan_invalid_horizon() {
        let mut params = CampaignParameters::new(2020);
        params.end_year = Some(2010);
        assert!(describe_plan(&params).is_err());
    }
}
