//! Solver output and its interpretation.
//!
//! The solver answers with ranked [`Itinerary`] values. They are decoded
//! verbatim; [`render`] turns one into a step-by-step account and
//! [`RankedItineraries`] groups them by dominance for display.

mod rank;
mod render;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Duty;
use crate::clock::{TimeOfDay, duration_text, format_duration};

pub use rank::RankedItineraries;
pub use render::{ItineraryStep, StepKind, render};

/// One itinerary proposed by the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    /// Name of the starting site.
    pub start_in: String,
    /// Departure time.
    pub start_at: TimeOfDay,
    /// Visits in order.
    pub stops: Vec<Stop>,
    /// Solver cost vector.
    pub cost: PathCost,
    /// Whether another itinerary beats this one on every criterion.
    pub is_dominated: bool,
}

/// A single visit within an [`Itinerary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    /// Name of the visited site.
    pub site: String,
    /// Duty window the visit falls in, if any.
    pub duty: Option<Duty>,
    /// Departure towards this site.
    pub ride_start: TimeOfDay,
    /// Arrival at this site.
    pub ride_end: TimeOfDay,
    /// Service begins.
    pub service_start: TimeOfDay,
    /// Service ends.
    pub service_end: TimeOfDay,
}

impl Stop {
    /// Time spent riding to this stop.
    #[must_use]
    pub fn ride_duration(&self) -> Duration {
        self.ride_end - self.ride_start
    }

    /// Time spent waiting between arrival and service.
    #[must_use]
    pub fn wait_duration(&self) -> Duration {
        self.service_start - self.ride_end
    }
}

/// Solver cost vector, with the solver's own field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCost {
    /// Sum of ride durations.
    #[serde(with = "duration_text")]
    pub total_ride: Duration,
    /// Departure to end of the last service.
    #[serde(with = "duration_text")]
    pub total_time: Duration,
    /// Stops served inside a duty window.
    pub stops_on_duty: u32,
    /// Stops served.
    pub stops: u32,
}

impl fmt::Display for PathCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stops ({} on duty), riding {}, total {}",
            self.stops,
            self.stops_on_duty,
            format_duration(self.total_ride),
            format_duration(self.total_time)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SOLVER_OUTPUT: &str = r#"[{
        "startIn": "A",
        "startAt": "09:00",
        "stops": [{
            "site": "B",
            "duty": {"start": "09:30", "end": "10:00"},
            "rideStart": "09:15",
            "rideEnd": "09:25",
            "serviceStart": "09:30",
            "serviceEnd": "09:45"
        }],
        "cost": {"total_ride": "10m", "total_time": "45m", "stops_on_duty": 1, "stops": 1},
        "isDominated": false
    }]"#;

    #[rstest]
    fn decodes_solver_output() {
        let paths: Vec<Itinerary> = serde_json::from_str(SOLVER_OUTPUT).expect("decode paths");
        let path = &paths[0];
        assert_eq!(path.start_in, "A");
        assert_eq!(path.cost.total_time, Duration::from_secs(45 * 60));
        let stop = &path.stops[0];
        assert_eq!(stop.ride_duration(), Duration::from_secs(600));
        assert_eq!(stop.wait_duration(), Duration::from_secs(300));
        assert_eq!(stop.duty.map(|duty| duty.to_string()), Some("09:30-10:00".to_owned()));
    }

    #[rstest]
    fn summarises_cost() {
        let cost = PathCost {
            total_ride: Duration::from_secs(600),
            total_time: Duration::from_secs(3900),
            stops_on_duty: 1,
            stops: 2,
        };
        assert_eq!(cost.to_string(), "2 stops (1 on duty), riding 10m, total 1h5m");
    }
}
