//! Error types emitted by the rideplan CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use rideplan_core::{PlanError, SiteError, StoreError};
use rideplan_data::ProviderBuildError;
use thiserror::Error;

/// Errors emitted by the rideplan CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// Site settings on the command line are invalid.
    #[error(transparent)]
    Site(#[from] SiteError),
    /// The snapshot store could not be opened.
    #[error("failed to open store at {path:?}: {source}")]
    OpenStore {
        path: Utf8PathBuf,
        #[source]
        source: StoreError,
    },
    /// The async runtime could not be started.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Constructing the ride duration provider failed.
    #[error("failed to build ride duration provider for {base_url:?}: {source}")]
    BuildProvider {
        base_url: String,
        #[source]
        source: ProviderBuildError,
    },
    /// A planner operation failed.
    #[error(transparent)]
    Plan(#[from] Box<PlanError>),
    /// Serializing the world failed.
    #[error("failed to serialize world: {0}")]
    SerializeWorld(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}

impl From<PlanError> for CliError {
    fn from(err: PlanError) -> Self {
        Self::Plan(Box::new(err))
    }
}
