//! Provides the main entry point to the program.
use human_panic::setup_panic;

fn main() {
    setup_panic!();

    if let Err(err) = transpath::cli::run_cli() {
        if transpath::log::is_logger_initialised() {
            ::log::error!("{err:?}");
        } else {
            eprintln!("Error: {err:?}");
        }

        // Terminate program, signalling an error
        std::process::exit(1);
    }
}
