//! Command-line interface for the rideplan itinerary planner.
//!
//! Every invocation opens the snapshot store, applies one command to the
//! planner and exits. Mutating commands are saved by the planner itself.
#![forbid(unsafe_code)]

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use log::debug;
use rideplan_core::{Planner, SqliteSnapshotStore};

mod error;
mod refresh;
mod schedule;
mod site;
mod solve;

pub use error::CliError;

use refresh::{DefaultProviderBuilder, ProviderBuilder, RefreshArgs};
use schedule::ScheduleArgs;
use site::SiteCommand;
use solve::{DefaultSolverBuilder, SolveArgs, SolverBuilder};

const ARG_PROVIDER_URL: &str = "provider-url";
const ARG_SOLVER: &str = "solver";
const ENV_SOLVE_SOLVER: &str = "RIDEPLAN_CMDS_SOLVE_SOLVER";
const DEFAULT_STORE: &str = "rideplan.db";

/// Run the rideplan CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when arguments are invalid, the store cannot be
/// opened, or the command fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse()?;
    let mut planner = open_planner(&cli.store)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let mut stdout = std::io::stdout().lock();
    runtime.block_on(dispatch(
        cli.command,
        &mut planner,
        &DefaultProviderBuilder,
        &DefaultSolverBuilder,
        &mut stdout,
    ))
}

fn open_planner(path: &Utf8Path) -> Result<Planner, CliError> {
    debug!("opening store {path}");
    let store = SqliteSnapshotStore::open(path).map_err(|source| CliError::OpenStore {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Planner::open(store))
}

async fn dispatch(
    command: Command,
    planner: &mut Planner,
    providers: &dyn ProviderBuilder,
    solvers: &dyn SolverBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        Command::Site(command) => site::run_site(command, planner, writer),
        Command::Schedule(args) => schedule::run_schedule(args, planner, writer),
        Command::Refresh(args) => refresh::run_refresh_with(args, planner, providers, writer).await,
        Command::Solve(args) => solve::run_solve_with(args, planner, solvers, writer).await,
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "rideplan",
    about = "Plan a day of visits by bike between sites with opening hours",
    version
)]
struct Cli {
    /// SQLite file holding the plan.
    #[arg(long, global = true, value_name = "path", default_value = DEFAULT_STORE)]
    store: Utf8PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add, edit, remove or list sites.
    #[command(subcommand)]
    Site(SiteCommand),
    /// Set the departure and return bounds.
    Schedule(ScheduleArgs),
    /// Fetch the ride durations the plan is missing.
    Refresh(RefreshArgs),
    /// Ask the solver for itineraries.
    Solve(SolveArgs),
}

#[cfg(test)]
mod tests;
