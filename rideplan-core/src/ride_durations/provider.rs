//! Ride-duration provider trait and the matrix it returns.

use std::time::Duration;

use async_trait::async_trait;
use geo::Coord;

use super::error::RideDurationError;

/// Ride durations aligned with the request: `matrix[i][j]` is the ride from
/// `origins[i]` to `destinations[j]`, or `None` when the provider could not
/// compute it.
pub type RideDurationMatrix = Vec<Vec<Option<Duration>>>;

/// Fetch directed ride durations for a cross product of coordinates.
///
/// Coordinates use `x = longitude`, `y = latitude`.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use async_trait::async_trait;
/// use geo::Coord;
/// use rideplan_core::{RideDurationError, RideDurationMatrix, RideDurationProvider};
///
/// struct TenMinutes;
///
/// #[async_trait]
/// impl RideDurationProvider for TenMinutes {
///     async fn ride_durations(
///         &self,
///         origins: &[Coord<f64>],
///         destinations: &[Coord<f64>],
///     ) -> Result<RideDurationMatrix, RideDurationError> {
///         if origins.is_empty() || destinations.is_empty() {
///             return Err(RideDurationError::EmptyInput);
///         }
///         Ok(vec![vec![Some(Duration::from_secs(600)); destinations.len()]; origins.len()])
///     }
/// }
/// ```
#[async_trait]
pub trait RideDurationProvider: Send + Sync {
    /// Return a dense `origins.len() x destinations.len()` matrix.
    ///
    /// Implementations must return `Err(RideDurationError::EmptyInput)` when
    /// either slice is empty.
    async fn ride_durations(
        &self,
        origins: &[Coord<f64>],
        destinations: &[Coord<f64>],
    ) -> Result<RideDurationMatrix, RideDurationError>;
}
