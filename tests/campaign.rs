//! Integration tests for running a campaign on the example model through the library interface.
use anyhow::Result;
use std::path::PathBuf;
use transpath::input::load_model;
use transpath::model::EnergySystemModel;
use transpath::output::ResultsWriter;
use transpath::simulation::optimize_myopic;
use transpath::units::{Emissions, Year};

/// Get the path to the example model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

/// Discards results
struct NullWriter;

impl ResultsWriter for NullWriter {
    fn write_step(&mut self, _model: &EnergySystemModel, _milestone_year: u32) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_optimize_myopic_example_model() {
    let (model, params, mut engine) = load_model(get_model_dir()).unwrap();
    assert_eq!(engine.typical_periods(), None);

    let results = optimize_myopic(model, &mut engine, &mut NullWriter, &params).unwrap();
    assert_eq!(
        results.keys().collect::<Vec<_>>(),
        ["ESM_2020", "ESM_2030", "ESM_2040"]
    );

    // Time series were clustered with the default settings
    assert_eq!(engine.typical_periods(), Some((7, 24)));

    // The CO2 limit tightens over time
    let limit = |key: &str| {
        results[key]
            .get_component("SourceSinkModel", "CO2 to environment")
            .unwrap()
            .yearly_limit
    };
    assert_eq!(limit("ESM_2020"), None);
    assert_eq!(limit("ESM_2030"), Some(Emissions(183.0)));
    assert!(limit("ESM_2040").unwrap() < Emissions(100.0));

    // Stock is created once and then only ages
    let esm_2040 = &results["ESM_2040"];
    let nuclear = esm_2040
        .get_component("ConversionModel", "Nuclear plants_stock_2020")
        .unwrap();
    assert_eq!(nuclear.lifetime["FR"], Year(40.0));
    assert!(
        esm_2040
            .get_component("ConversionModel", "Nuclear plants_stock_2030")
            .is_some()
    );
    assert!(
        esm_2040
            .get_component("ConversionModel", "Nuclear plants_stock_2040")
            .is_none()
    );

    // Original components are untouched
    let original = esm_2040.get_component("SourceSinkModel", "PV").unwrap();
    assert_eq!(original.lifetime, original.technical_lifetime);
    assert!(original.capacity_fix.is_none());
}
