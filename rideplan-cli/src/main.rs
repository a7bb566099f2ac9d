//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use rideplan_cli::CliError;
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    init_logging();
    match rideplan_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("rideplan: {err}");
            std::process::exit(1);
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // Also installs the bridge for `log` records.
    if let Err(err) = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        eprintln!("rideplan: logging disabled: {err}");
    }
}
