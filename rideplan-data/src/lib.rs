//! I/O adapters for the rideplan planner.
//!
//! Responsibilities:
//! - Fetch ride durations from an HTTP service ([`routing`]).
//! - Hand worlds to an external solver program ([`solver`]).
//!
//! Boundaries:
//! - Do not encode domain rules (live in `rideplan-core`).
//! - Keep blocking I/O off async executors; use tokio's process and reqwest's
//!   async client.
//!
//! Invariants:
//! - Adapters hold no mutable state between calls.

pub mod routing;
pub mod solver;

pub use routing::{HttpRideDurationProvider, HttpRideDurationProviderConfig, ProviderBuildError};
pub use solver::CommandSolver;
