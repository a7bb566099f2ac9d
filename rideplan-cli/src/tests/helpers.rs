//! Test helpers running CLI invocations against a temporary store.

use super::*;
use crate::refresh::ProviderBuilder;
use crate::solve::SolverBuilder;
use rideplan_core::test_support::{StubRideDurationProvider, StubSolver};
use rideplan_core::{Itinerary, RideDurationProvider, Solver};
use rideplan_data::routing::HttpRideDurationProviderConfig;
use std::time::Duration;
use tempfile::TempDir;

pub(super) const TEN_MINUTES: Duration = Duration::from_secs(600);

/// Two itineraries for "Site 1" -> "Site 2"; the second waits and is dominated.
pub(super) const SOLVER_OUTPUT: &str = r#"[
    {
        "startIn": "Site 1",
        "startAt": "09:00",
        "stops": [{
            "site": "Site 2", "duty": null,
            "rideStart": "09:00", "rideEnd": "09:10",
            "serviceStart": "09:10", "serviceEnd": "09:25"
        }],
        "cost": {"total_ride": "10m", "total_time": "25m", "stops_on_duty": 0, "stops": 1},
        "isDominated": false
    },
    {
        "startIn": "Site 1",
        "startAt": "09:00",
        "stops": [{
            "site": "Site 2", "duty": null,
            "rideStart": "09:00", "rideEnd": "09:10",
            "serviceStart": "09:25", "serviceEnd": "09:40"
        }],
        "cost": {"total_ride": "10m", "total_time": "40m", "stops_on_duty": 0, "stops": 1},
        "isDominated": true
    }
]"#;

pub(super) struct StubProviderBuilder;

impl ProviderBuilder for StubProviderBuilder {
    fn build(
        &self,
        _config: &HttpRideDurationProviderConfig,
    ) -> Result<Box<dyn RideDurationProvider>, CliError> {
        Ok(Box::new(StubRideDurationProvider::with_duration(TEN_MINUTES)))
    }
}

pub(super) struct StubSolverBuilder;

impl SolverBuilder for StubSolverBuilder {
    fn build(&self, _program: &Utf8Path) -> Result<Box<dyn Solver>, CliError> {
        let itineraries: Vec<Itinerary> =
            serde_json::from_str(SOLVER_OUTPUT).expect("solver output fixture");
        Ok(Box::new(StubSolver::with_itineraries(itineraries)))
    }
}

/// Store file inside a temporary directory, reopened for every command.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    store: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self {
            store: root.join("rideplan.db"),
            _dir: dir,
        }
    }

    /// Run `rideplan --store <store> <command>` with stub adapters.
    pub(super) fn run(&self, command: &str, writer: &mut Vec<u8>) -> Result<(), CliError> {
        let mut argv = vec![
            "rideplan".to_owned(),
            "--store".to_owned(),
            self.store.as_str().to_owned(),
        ];
        argv.extend(command.split_whitespace().map(str::to_owned));
        let cli = Cli::try_parse_from(argv)?;
        let mut planner = open_planner(&cli.store)?;
        block_on(dispatch(
            cli.command,
            &mut planner,
            &StubProviderBuilder,
            &StubSolverBuilder,
            writer,
        ))
    }
}

pub(super) fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime")
        .block_on(future)
}
