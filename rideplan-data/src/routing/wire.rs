//! JSON bodies exchanged with the ride duration service.
//!
//! Request: `{"origins": [{"latitude": 0, "longitude": 0}], "destinations": [...]}`.
//! Response: `{"rideDurations": [["10m", null]]}`, one row per origin and one
//! cell per destination. `null` marks a pair the service could not route.

use geo::Coord;
use rideplan_core::RideDurationMatrix;
use rideplan_core::clock::parse_duration;
use serde::{Deserialize, Serialize};

/// A coordinate on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WirePoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<Coord<f64>> for WirePoint {
    fn from(coord: Coord<f64>) -> Self {
        Self {
            latitude: coord.y,
            longitude: coord.x,
        }
    }
}

/// Body of a ride duration request.
#[derive(Debug, Serialize, Deserialize)]
pub struct RideDurationsRequest {
    pub origins: Vec<WirePoint>,
    pub destinations: Vec<WirePoint>,
}

impl RideDurationsRequest {
    pub fn new(origins: &[Coord<f64>], destinations: &[Coord<f64>]) -> Self {
        Self {
            origins: origins.iter().copied().map(WirePoint::from).collect(),
            destinations: destinations.iter().copied().map(WirePoint::from).collect(),
        }
    }
}

/// Body of a successful ride duration response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideDurationsResponse {
    pub ride_durations: Vec<Vec<Option<String>>>,
}

impl RideDurationsResponse {
    /// Decode every cell; the first malformed duration aborts the conversion.
    pub fn into_matrix(self) -> Result<RideDurationMatrix, String> {
        self.ride_durations
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| {
                        cell.map(|text| parse_duration(&text).map_err(|err| err.to_string()))
                            .transpose()
                    })
                    .collect()
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Human-readable message from an error response body.
///
/// Uses the JSON `error` field when there is one, the raw body otherwise.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body).map_or_else(|_| body.trim().to_owned(), |b| b.error)
}
