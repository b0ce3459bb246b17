//! Code for reading the model's locations from a CSV file.
use super::{input_err_msg, read_csv};
use crate::component::LocationID;
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use serde::Deserialize;
use std::path::Path;

const LOCATIONS_FILE_NAME: &str = "locations.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct LocationRaw {
    id: LocationID,
    #[allow(dead_code)]
    description: String,
}

/// Reads locations from a CSV file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The IDs of the model's locations, in file order, or an error
pub fn read_locations(model_dir: &Path) -> Result<IndexSet<LocationID>> {
    let file_path = model_dir.join(LOCATIONS_FILE_NAME);
    let locations_csv = read_csv(&file_path)?;
    read_locations_from_iter(locations_csv).with_context(|| input_err_msg(&file_path))
}

fn read_locations_from_iter<I>(iter: I) -> Result<IndexSet<LocationID>>
where
    I: Iterator<Item = LocationRaw>,
{
    let mut locations = IndexSet::new();
    for location in iter {
        ensure!(!location.id.0.is_empty(), "Location IDs cannot be empty");
        ensure!(
            !locations.contains(&location.id),
            "Duplicate location ID found: {}",
            location.id
        );
        locations.insert(location.id);
    }

    Ok(locations)
}
