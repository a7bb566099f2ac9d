//! Test doubles for the provider and solver seams.
//!
//! Available in unit tests and, for other crates, behind the
//! `test-support` feature.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use geo::Coord;
use tokio::sync::Notify;

use crate::itinerary::Itinerary;
use crate::ride_durations::{RideDurationError, RideDurationMatrix, RideDurationProvider};
use crate::solver::{SolveError, Solver};
use crate::world::World;

type CellFn = dyn Fn(Coord<f64>, Coord<f64>) -> Option<Duration> + Send + Sync;

enum StubResponse {
    Cells(Box<CellFn>),
    Matrix(RideDurationMatrix),
    Error(RideDurationError),
}

/// One recorded provider request: `(origins, destinations)`.
pub type RecordedRequest = (Vec<Coord<f64>>, Vec<Coord<f64>>);

/// `RideDurationProvider` returning pre-configured answers and recording
/// every request it receives.
pub struct StubRideDurationProvider {
    response: StubResponse,
    calls: Mutex<Vec<RecordedRequest>>,
}

impl fmt::Debug for StubRideDurationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubRideDurationProvider")
            .field("calls", &self.calls().len())
            .finish_non_exhaustive()
    }
}

impl StubRideDurationProvider {
    fn new(response: StubResponse) -> Self {
        Self {
            response,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer every cell with `duration`.
    #[must_use]
    pub fn with_duration(duration: Duration) -> Self {
        Self::with_fn(move |_, _| Some(duration))
    }

    /// Answer each cell with `cell(origin, destination)`.
    #[must_use]
    pub fn with_fn<F>(cell: F) -> Self
    where
        F: Fn(Coord<f64>, Coord<f64>) -> Option<Duration> + Send + Sync + 'static,
    {
        Self::new(StubResponse::Cells(Box::new(cell)))
    }

    /// Return `matrix` verbatim, whatever the request shape.
    #[must_use]
    pub fn with_matrix(matrix: RideDurationMatrix) -> Self {
        Self::new(StubResponse::Matrix(matrix))
    }

    /// Fail every non-empty request with `error`.
    #[must_use]
    pub fn with_error(error: RideDurationError) -> Self {
        Self::new(StubResponse::Error(error))
    }

    /// Requests received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedRequest> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RideDurationProvider for StubRideDurationProvider {
    async fn ride_durations(
        &self,
        origins: &[Coord<f64>],
        destinations: &[Coord<f64>],
    ) -> Result<RideDurationMatrix, RideDurationError> {
        if origins.is_empty() || destinations.is_empty() {
            return Err(RideDurationError::EmptyInput);
        }
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((origins.to_vec(), destinations.to_vec()));

        match &self.response {
            StubResponse::Cells(cell) => Ok(origins
                .iter()
                .map(|origin| {
                    destinations
                        .iter()
                        .map(|destination| cell(*origin, *destination))
                        .collect()
                })
                .collect()),
            StubResponse::Matrix(matrix) => Ok(matrix.clone()),
            StubResponse::Error(error) => Err(error.clone()),
        }
    }
}

/// Provider that parks every request until [`open`](Self::open) is called,
/// then delegates to a [`StubRideDurationProvider`].
#[derive(Debug)]
pub struct GatedRideDurationProvider {
    inner: StubRideDurationProvider,
    gate: Notify,
}

impl GatedRideDurationProvider {
    /// Gate requests in front of `inner`.
    #[must_use]
    pub fn new(inner: StubRideDurationProvider) -> Self {
        Self {
            inner,
            gate: Notify::new(),
        }
    }

    /// Release one parked (or the next) request.
    pub fn open(&self) {
        self.gate.notify_one();
    }

    /// Wrapped provider.
    #[must_use]
    pub const fn inner(&self) -> &StubRideDurationProvider {
        &self.inner
    }
}

#[async_trait]
impl RideDurationProvider for GatedRideDurationProvider {
    async fn ride_durations(
        &self,
        origins: &[Coord<f64>],
        destinations: &[Coord<f64>],
    ) -> Result<RideDurationMatrix, RideDurationError> {
        self.gate.notified().await;
        self.inner.ride_durations(origins, destinations).await
    }
}

/// `Solver` returning a fixed answer and recording the worlds it was given.
#[derive(Debug)]
pub struct StubSolver {
    response: Result<Vec<Itinerary>, SolveError>,
    worlds: Mutex<Vec<World>>,
}

impl StubSolver {
    /// Answer every world with `itineraries`.
    #[must_use]
    pub fn with_itineraries(itineraries: Vec<Itinerary>) -> Self {
        Self {
            response: Ok(itineraries),
            worlds: Mutex::new(Vec::new()),
        }
    }

    /// Fail every solve with `error`.
    #[must_use]
    pub fn with_error(error: SolveError) -> Self {
        Self {
            response: Err(error),
            worlds: Mutex::new(Vec::new()),
        }
    }

    /// Worlds received so far.
    #[must_use]
    pub fn worlds(&self) -> Vec<World> {
        self.worlds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Solver for StubSolver {
    async fn solve(&self, world: &World) -> Result<Vec<Itinerary>, SolveError> {
        self.worlds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(world.clone());
        self.response.clone()
    }
}
