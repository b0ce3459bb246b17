//! Integration tests for the `validate` command.
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;
use transpath::cli::handle_validate_command;
use transpath::log::is_logger_initialised;
use transpath::settings::Settings;

/// Get the path to the example model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

/// An integration test for the `validate` command.
///
/// We also check that the logger is initialised after it is run.
#[test]
fn test_handle_validate_command() {
    unsafe { std::env::set_var("TRANSPATH_LOG_LEVEL", "off") };

    assert!(!is_logger_initialised());

    handle_validate_command(&get_model_dir(), Some(Settings::default())).unwrap();

    assert!(is_logger_initialised());

    // A model whose CO2 targets don't match its steps is rejected
    let dir = tempdir().unwrap();
    for entry in fs::read_dir(get_model_dir()).unwrap() {
        let path = entry.unwrap().path();
        fs::copy(&path, dir.path().join(path.file_name().unwrap())).unwrap();
    }
    fs::write(
        dir.path().join("model.toml"),
        "start_year = 2020\nend_year = 2040\nnb_of_steps = 2\nco2_reduction_targets = [50]\n",
    )
    .unwrap();
    assert!(handle_validate_command(dir.path(), Some(Settings::default())).is_err());
}
