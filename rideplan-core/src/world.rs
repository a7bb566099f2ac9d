//! Assemble the solver request from the site model and the ride cache.
//!
//! [`build_world`] is a pure function: it reads the sites and the cache,
//! never mutates them and never touches the network. Callers refresh the
//! cache first; an empty cache for a multi-site model is reported as
//! [`WorldError::ModelIncomplete`].

use std::collections::BTreeMap;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::{TimeOfDay, duration_map, minutes_text};
use crate::{Duty, RideDuration, RideDurations, Site, VisitMode};

/// Search bounds forwarded verbatim to the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverLimits {
    /// Extensions tried per partial path.
    pub max_tested_extensions: u32,
    /// Paths retained per bag.
    pub max_bag_items: u32,
    /// Itineraries returned.
    pub max_results: u32,
}

impl Default for SolverLimits {
    fn default() -> Self {
        Self {
            max_tested_extensions: 10,
            max_bag_items: 100,
            max_results: 10,
        }
    }
}

/// How sites marked [`VisitMode::Never`] reach the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NeverSitePolicy {
    /// Leave them out of the request entirely.
    #[default]
    Exclude,
    /// Send them with `visit: "NEVER"` and let the solver skip them.
    PassThrough,
}

impl NeverSitePolicy {
    /// Whether `site` takes part in solver requests under this policy.
    #[must_use]
    pub fn admits(self, site: &Site) -> bool {
        self == Self::PassThrough || site.visit() != VisitMode::Never
    }
}

/// Everything besides the sites and the cache that shapes a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldSettings {
    /// Earliest departure.
    pub min_start_at: TimeOfDay,
    /// Latest return, if bounded.
    pub max_end_at: Option<TimeOfDay>,
    /// Solver search bounds.
    pub limits: SolverLimits,
    /// Treatment of NEVER sites.
    pub never_sites: NeverSitePolicy,
}

impl WorldSettings {
    /// Settings starting at `min_start_at` with no end bound and default
    /// limits.
    #[must_use]
    pub fn new(min_start_at: TimeOfDay) -> Self {
        Self {
            min_start_at,
            max_end_at: None,
            limits: SolverLimits::default(),
            never_sites: NeverSitePolicy::default(),
        }
    }

    /// Bound the latest return.
    #[must_use]
    pub const fn with_max_end_at(mut self, max_end_at: Option<TimeOfDay>) -> Self {
        self.max_end_at = max_end_at;
        self
    }

    /// Replace the solver limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: SolverLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Choose how NEVER sites are handled.
    #[must_use]
    pub const fn with_never_sites(mut self, never_sites: NeverSitePolicy) -> Self {
        self.never_sites = never_sites;
        self
    }
}

/// One site as the solver sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSite {
    /// Site name, also used as destination key.
    pub name: String,
    /// Known outbound rides keyed by destination name.
    #[serde(with = "duration_map")]
    pub ride_durations: BTreeMap<String, Duration>,
    /// Duty windows.
    pub duties: Vec<Duty>,
    /// Service time, sent as `"<N>m"`.
    #[serde(with = "minutes_text")]
    pub service_time: Duration,
    /// Visit mode.
    pub visit: VisitMode,
    /// Whether an itinerary may start here.
    pub can_start_here: bool,
}

/// Request payload for the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct World {
    /// Eligible sites in model order.
    pub sites: Vec<WorldSite>,
    /// Earliest departure.
    pub min_start_at: TimeOfDay,
    /// Latest return, `null` when unbounded.
    pub max_end_at: Option<TimeOfDay>,
    /// See [`SolverLimits::max_tested_extensions`].
    pub max_tested_extensions: u32,
    /// See [`SolverLimits::max_bag_items`].
    pub max_bag_items: u32,
    /// See [`SolverLimits::max_results`].
    pub max_results: u32,
}

/// Errors from [`build_world`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    /// No ride between the eligible sites has been computed yet.
    #[error("ride durations for {sites} sites have not been computed; refresh first")]
    ModelIncomplete {
        /// Number of eligible sites.
        sites: usize,
    },
    /// The latest return precedes the earliest departure.
    #[error("schedule ends at {max_end_at} before it starts at {min_start_at}")]
    InvalidSchedule {
        /// Earliest departure.
        min_start_at: TimeOfDay,
        /// Latest return.
        max_end_at: TimeOfDay,
    },
}

/// Build the solver request for `sites`.
///
/// Sites sharing a coordinate ride to each other in zero time, whatever the
/// cache holds for that spot.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use rideplan_core::{RideDuration, RideDurations, Site, TimeOfDay, WorldSettings, build_world};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let sites = vec![Site::new("A", 0.0, 0.0)?, Site::new("B", 1.0, 1.0)?];
/// let cache = RideDurations::default();
/// cache.insert(sites[0].location(), sites[1].location(), RideDuration::Known(Duration::from_secs(600)));
///
/// let world = build_world(&sites, &cache, &WorldSettings::new(TimeOfDay::from_hms(9, 0, 0)))?;
/// assert_eq!(world.sites[0].ride_durations["B"], Duration::from_secs(600));
/// assert!(world.sites[1].ride_durations.is_empty());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// [`WorldError::InvalidSchedule`] when `max_end_at < min_start_at`;
/// [`WorldError::ModelIncomplete`] when two or more eligible sites at distinct
/// coordinates have no cached ride between them at all.
pub fn build_world(
    sites: &[Site],
    cache: &RideDurations,
    settings: &WorldSettings,
) -> Result<World, WorldError> {
    match settings.max_end_at {
        Some(max_end_at) if max_end_at < settings.min_start_at => {
            return Err(WorldError::InvalidSchedule {
                min_start_at: settings.min_start_at,
                max_end_at,
            });
        }
        _ => {}
    }

    let eligible: Vec<&Site> = sites
        .iter()
        .filter(|site| settings.never_sites.admits(site))
        .collect();
    ensure_complete(&eligible, cache)?;

    if !eligible.is_empty() && !eligible.iter().any(|site| site.can_start_here()) {
        warn!("no eligible site is marked as a possible start");
    }

    let world_sites: Vec<WorldSite> = eligible
        .iter()
        .enumerate()
        .map(|(i, origin)| world_site(i, origin, &eligible, cache))
        .collect();
    debug!(
        "built world with {} of {} sites",
        world_sites.len(),
        sites.len()
    );

    Ok(World {
        sites: world_sites,
        min_start_at: settings.min_start_at,
        max_end_at: settings.max_end_at,
        max_tested_extensions: settings.limits.max_tested_extensions,
        max_bag_items: settings.limits.max_bag_items,
        max_results: settings.limits.max_results,
    })
}

fn world_site(index: usize, origin: &Site, eligible: &[&Site], cache: &RideDurations) -> WorldSite {
    let ride_durations = eligible
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != index)
        .filter_map(|(_, destination)| {
            let duration = if origin.location() == destination.location() {
                Some(Duration::ZERO)
            } else {
                cache
                    .get_between(origin, destination)
                    .and_then(RideDuration::known)
            };
            duration.map(|duration| (destination.name().to_owned(), duration))
        })
        .collect();

    WorldSite {
        name: origin.name().to_owned(),
        ride_durations,
        duties: origin.duties().to_vec(),
        service_time: Duration::from_secs(u64::from(origin.service_time_minutes()) * 60),
        visit: origin.visit(),
        can_start_here: origin.can_start_here(),
    }
}

fn ensure_complete(eligible: &[&Site], cache: &RideDurations) -> Result<(), WorldError> {
    let mut has_pair = false;
    for (i, origin) in eligible.iter().enumerate() {
        for (j, destination) in eligible.iter().enumerate() {
            if i == j || origin.location() == destination.location() {
                continue;
            }
            if cache.get_between(origin, destination).is_some() {
                return Ok(());
            }
            has_pair = true;
        }
    }
    if has_pair {
        Err(WorldError::ModelIncomplete {
            sites: eligible.len(),
        })
    } else {
        Ok(())
    }
}
