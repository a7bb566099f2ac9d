//! Facade crate for the rideplan itinerary planner.
//!
//! This crate re-exports the core domain types and exposes the SQLite store
//! and the HTTP and subprocess adapters behind feature flags.

#![forbid(unsafe_code)]

pub use rideplan_core::{
    Duty, Itinerary, ItineraryStep, MemoryStore, NeverSitePolicy, PathCost, PlanError, Planner,
    RankedItineraries, RefreshError, RefreshOutcome, RideDuration, RideDurationError,
    RideDurationMatrix, RideDurationProvider, Site, SiteError, SnapshotStore, SolveError,
    SolveOptions, Solver, SolverLimits, StoreError, TimeOfDay, VisitMode, World, WorldError,
    build_world, render,
};

#[cfg(feature = "store-sqlite")]
pub use rideplan_core::SqliteSnapshotStore;

#[cfg(feature = "http")]
pub use rideplan_data::{CommandSolver, HttpRideDurationProvider, HttpRideDurationProviderConfig};
