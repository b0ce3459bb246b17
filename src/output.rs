//! The module responsible for writing output data to disk.
use crate::component::{
    CapacityValues, Component, ComponentID, ComponentRole, LocationKey, SharedPotentialID,
};
use crate::model::{DomainID, EnergySystemModel, OptimalValues};
use crate::units::{Capacity, Year};
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "transpath_results";

/// Get the output folder for the model in the specified directory
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model, optionally overwriting existing data
///
/// # Arguments
///
/// * `output_dir` - The output directory to create/overwrite
/// * `allow_overwrite` - Whether to delete and recreate the folder if it is non-empty
///
/// # Returns
///
/// True if the output dir contained existing data that was deleted, false if not, or an error.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    // If the folder already exists, then delete it
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. \
            Please delete the folder or pass the --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir).context("Could not delete folder")?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// The name of the results file for a milestone year
pub fn results_file_name(milestone_year: u32) -> String {
    format!("ESM{milestone_year}.csv")
}

/// Writes the results of each step of a campaign
pub trait ResultsWriter {
    /// Write the solved model for a milestone year
    fn write_step(&mut self, model: &EnergySystemModel, milestone_year: u32) -> Result<()>;
}

/// Represents a row in a results CSV file: a component in one location (or pair of locations)
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ComponentRow {
    domain_id: DomainID,
    component_id: ComponentID,
    kind: ComponentRole,
    origin_id: Option<ComponentID>,
    location_id: String,
    lifetime: Option<Year>,
    capacity_fix: Option<Capacity>,
    capacity_max: Option<Capacity>,
    capacity_min: Option<Capacity>,
    optimal_capacity: Option<Capacity>,
    shared_potential_id: Option<SharedPotentialID>,
}

/// The label for a location (or pair of locations) in output files
fn location_label(key: &LocationKey) -> String {
    match key {
        LocationKey::Single(location) => location.to_string(),
        LocationKey::Pair(from, to) => format!("{from}_{to}"),
    }
}

/// The optimal capacity for one location (or pair of locations), if any
fn optimal_capacity(values: Option<&OptimalValues>, key: &LocationKey) -> Option<Capacity> {
    match (values?, key) {
        (OptimalValues::Locational(map), LocationKey::Single(location)) => {
            map.get(*location).copied()
        }
        (OptimalValues::Linked(table), LocationKey::Pair(from, to)) => {
            table.get(*from)?.get(*to).copied().flatten()
        }
        _ => None,
    }
}

fn capacity_at(values: Option<&CapacityValues>, key: &LocationKey) -> Option<Capacity> {
    values?.get(key)
}

/// Every location (or pair of locations) for which the component has a value
fn location_keys<'a>(
    component: &'a Component,
    optimal_values: Option<&'a OptimalValues>,
) -> IndexSet<LocationKey<'a>> {
    let mut keys: IndexSet<_> = component.lifetime.keys().map(LocationKey::Single).collect();
    let values = [
        &component.capacity_fix,
        &component.capacity_max,
        &component.capacity_min,
    ];
    for values in values.into_iter().flatten() {
        keys.extend(values.iter().map(|(key, _)| key));
    }
    if let Some(OptimalValues::Linked(table)) = optimal_values {
        for (from, row) in table {
            for (to, capacity) in row {
                if capacity.is_some() {
                    keys.insert(LocationKey::Pair(from, to));
                }
            }
        }
    }

    keys
}

/// Rows describing a component in each of its locations
fn component_rows(
    domain_id: &DomainID,
    component: &Component,
    optimal_values: Option<&OptimalValues>,
) -> Vec<ComponentRow> {
    location_keys(component, optimal_values)
        .into_iter()
        .map(|key| ComponentRow {
            domain_id: domain_id.clone(),
            component_id: component.id.clone(),
            kind: component.role(),
            origin_id: component.origin().cloned(),
            location_id: location_label(&key),
            lifetime: component.lifetime.get(key.location()).copied(),
            capacity_fix: capacity_at(component.capacity_fix.as_ref(), &key),
            capacity_max: capacity_at(component.capacity_max.as_ref(), &key),
            capacity_min: capacity_at(component.capacity_min.as_ref(), &key),
            optimal_capacity: optimal_capacity(optimal_values, &key),
            shared_potential_id: component.shared_potential_id.clone(),
        })
        .collect()
}

/// Writes the solved model for each milestone year to a CSV file named `ESM<year>.csv`
pub struct CsvResultsWriter {
    output_path: PathBuf,
}

impl CsvResultsWriter {
    /// Create a new [`CsvResultsWriter`].
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    pub fn new(output_path: &Path) -> Self {
        Self {
            output_path: output_path.to_path_buf(),
        }
    }
}

impl ResultsWriter for CsvResultsWriter {
    fn write_step(&mut self, model: &EnergySystemModel, milestone_year: u32) -> Result<()> {
        let file_path = self.output_path.join(results_file_name(milestone_year));
        let mut writer = csv::Writer::from_path(&file_path)
            .with_context(|| format!("Could not create {}", file_path.display()))?;

        for (domain_id, domain) in model.domains() {
            for component in domain.components.values() {
                let optimal_values = domain
                    .optimal_capacities()
                    .and_then(|capacities| capacities.get(&component.id));
                for row in component_rows(domain_id, component, optimal_values) {
                    writer.serialize(row)?;
                }
            }
        }
        writer.flush()?;

        Ok(())
    }
}
