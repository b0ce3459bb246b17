//! Myopic foresight planning of energy system transformation pathways.
//!
//! A campaign optimises an energy system model for a series of milestone years. After each
//! optimisation, newly installed capacity is carried into the next milestone year as fixed stock,
//! which ages and is eventually retired.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod component;
pub mod engine;
pub mod horizon;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod output;
pub mod settings;
pub mod simulation;
pub mod stock;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the config dir for the program
pub fn get_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        panic!("Could not get config dir");
    };
    config_dir.push("transpath");

    config_dir
}
