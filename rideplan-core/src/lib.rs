//! Core domain types for the rideplan itinerary planner.
//!
//! Sites carry visiting constraints; a directed ride cache tracks which
//! site-to-site durations are known and asks a [`RideDurationProvider`] for
//! exactly the missing ones. From both, [`build_world`] assembles the request
//! an external [`Solver`] answers with ranked [`Itinerary`] values.
//!
//! Constructors validate their input and return `Result`, so a model that
//! made it into memory is a valid one.

pub mod clock;
pub mod itinerary;
pub mod persistence;
pub mod planner;
pub mod ride_durations;
pub mod site;
pub mod solver;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod world;

pub use clock::{ClockParseError, TimeOfDay};
pub use itinerary::{Itinerary, ItineraryStep, PathCost, RankedItineraries, StepKind, Stop, render};
pub use persistence::{LoadError, PersistenceGateway, PlannerModel, SaveError};
pub use planner::{PlanError, Planner, SolveOptions};
pub use ride_durations::{
    MissingEndpoints, RefreshError, RefreshOutcome, RideDuration, RideDurationError,
    RideDurationMatrix, RideDurationProvider, RideDurations, RideDurationsSnapshot, RideKey,
    RideKeyParseError,
};
pub use site::{Duty, DutyError, Site, SiteError, VisitMode};
pub use solver::{SolveError, Solver};
#[cfg(feature = "store-sqlite")]
pub use store::SqliteSnapshotStore;
pub use store::{MemoryStore, SnapshotStore, StoreError};
pub use world::{
    NeverSitePolicy, SolverLimits, World, WorldError, WorldSettings, WorldSite, build_world,
};
