//! Common routines for handling input data.
use crate::engine::ReplayEngine;
use crate::model::{CampaignParameters, EnergySystemModel};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

mod capacity;
use capacity::read_capacity_schedule;
mod component;
use component::read_components;
mod location;
use location::read_locations;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    ensure!(
        !vec.is_empty(),
        "CSV file {} cannot be empty",
        file_path.display()
    );

    Ok(vec.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;

    Ok(toml_data)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The energy system model, the parameters of the campaign to run on it and an engine which
/// replays the model's capacity schedule, or an error.
pub fn load_model<P: AsRef<Path>>(
    model_dir: P,
) -> Result<(EnergySystemModel, CampaignParameters, ReplayEngine)> {
    let model_dir = model_dir.as_ref();
    let params = CampaignParameters::from_path(model_dir)?;
    let horizon = params.time_horizon()?;

    let locations = read_locations(model_dir)?;
    let mut model = EnergySystemModel::new(locations);
    for (domain_id, component) in read_components(model_dir, model.locations())? {
        model.add(domain_id, component)?;
    }

    let milestone_years = horizon.iter_milestone_years().map(|(_, year)| year).collect_vec();
    let schedule = read_capacity_schedule(model_dir, &model, &milestone_years)?;

    Ok((model, params, ReplayEngine::new(schedule)))
}
