//! The external solver seam.
//!
//! A [`Solver`] receives a [`World`] and answers with itineraries.

use async_trait::async_trait;
use thiserror::Error;

use crate::World;
use crate::itinerary::Itinerary;

/// Errors returned by [`Solver::solve`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    /// The solver could not be started.
    #[error("failed to start solver {program}: {message}")]
    Spawn {
        /// Program that was launched.
        program: String,
        /// Operating-system description.
        message: String,
    },
    /// Exchanging data with the solver failed.
    #[error("solver I/O failed: {message}")]
    Io {
        /// Description of the failure.
        message: String,
    },
    /// The solver reported failure.
    #[error("solver exited with {}: {stderr}", exit_label(.code))]
    Exited {
        /// Exit code, `None` when killed by a signal.
        code: Option<i32>,
        /// Whatever the solver wrote to stderr.
        stderr: String,
    },
    /// The world could not be encoded.
    #[error("failed to encode world: {message}")]
    Encode {
        /// Encoder description.
        message: String,
    },
    /// The solver's answer could not be decoded.
    #[error("failed to decode solver output: {message}")]
    Decode {
        /// Decoder description.
        message: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_owned(), |code| format!("status {code}"))
}

/// Compute ranked itineraries for a [`World`].
///
/// The optimization itself lives outside this crate; implementations forward
/// the world to an engine and decode its answer. A solve cannot be cancelled
/// once started.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use rideplan_core::{Itinerary, SolveError, Solver, World};
///
/// struct NoRoutes;
///
/// #[async_trait]
/// impl Solver for NoRoutes {
///     async fn solve(&self, _world: &World) -> Result<Vec<Itinerary>, SolveError> {
///         Ok(Vec::new())
///     }
/// }
/// ```
#[async_trait]
pub trait Solver: Send + Sync {
    /// Solve `world`, returning itineraries in solver rank order.
    async fn solve(&self, world: &World) -> Result<Vec<Itinerary>, SolveError>;
}
