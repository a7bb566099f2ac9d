//! Step-by-step account of an itinerary.

use std::fmt;
use std::time::Duration;

use crate::Duty;
use crate::clock::{TimeOfDay, format_duration};

use super::Itinerary;

/// What happens at a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// The traveller sets off from a site.
    Start {
        /// Starting site.
        site: String,
    },
    /// The traveller leaves for the next site.
    Ride {
        /// Destination site.
        to: String,
    },
    /// The traveller reaches a site.
    Arrive {
        /// Reached site.
        site: String,
        /// Duty window the visit falls in.
        duty: Option<Duty>,
    },
    /// Service begins after waiting on site.
    Wait {
        /// Site being served.
        site: String,
        /// Time spent waiting.
        waited: Duration,
    },
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start { site } => write!(f, "Start at {site}"),
            Self::Ride { to } => write!(f, "Leave for {to}"),
            Self::Arrive {
                site,
                duty: Some(duty),
            } => write!(f, "Arrive at {site} (duty {duty})"),
            Self::Arrive { site, duty: None } => write!(f, "Arrive at {site}"),
            Self::Wait { site, waited } => write!(
                f,
                "Start service at {site} after waiting {}",
                format_duration(*waited)
            ),
        }
    }
}

/// A timestamped step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItineraryStep {
    /// When the step happens.
    pub at: TimeOfDay,
    /// What happens.
    pub kind: StepKind,
}

impl fmt::Display for ItineraryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.at, self.kind)
    }
}

/// Reconstruct the steps of `itinerary` in order.
///
/// Solver timestamps are trusted as given. A ride step appears only when the
/// ride does not start at the time of the previous step, and a wait step only
/// when service does not start on arrival.
///
/// # Examples
///
/// ```
/// use rideplan_core::itinerary::{Itinerary, render};
///
/// let path: Itinerary = serde_json::from_str(r#"{
///     "startIn": "A", "startAt": "09:00",
///     "stops": [{"site": "B", "duty": null, "rideStart": "09:00", "rideEnd": "09:10",
///                "serviceStart": "09:10", "serviceEnd": "09:25"}],
///     "cost": {"total_ride": "10m", "total_time": "25m", "stops_on_duty": 0, "stops": 1},
///     "isDominated": false
/// }"#).expect("valid path");
///
/// let lines: Vec<String> = render(&path).iter().map(ToString::to_string).collect();
/// assert_eq!(lines, ["09:00 Start at A", "09:10 Arrive at B"]);
/// ```
#[must_use]
pub fn render(itinerary: &Itinerary) -> Vec<ItineraryStep> {
    let mut steps = vec![ItineraryStep {
        at: itinerary.start_at,
        kind: StepKind::Start {
            site: itinerary.start_in.clone(),
        },
    }];
    for stop in &itinerary.stops {
        let previous = steps.last().map_or(itinerary.start_at, |step| step.at);
        if stop.ride_start != previous {
            steps.push(ItineraryStep {
                at: stop.ride_start,
                kind: StepKind::Ride {
                    to: stop.site.clone(),
                },
            });
        }
        steps.push(ItineraryStep {
            at: stop.ride_end,
            kind: StepKind::Arrive {
                site: stop.site.clone(),
                duty: stop.duty,
            },
        });
        if stop.service_start != stop.ride_end {
            steps.push(ItineraryStep {
                at: stop.service_start,
                kind: StepKind::Wait {
                    site: stop.site.clone(),
                    waited: stop.wait_duration(),
                },
            });
        }
    }
    steps
}
