//! Places to visit and their visiting constraints.
//!
//! A [`Site`] is identified by its name and located by its coordinates. The
//! constructors validate every invariant so the rest of the pipeline can
//! trust the model; deserialization goes through the same checks.

use std::fmt;
use std::str::FromStr;

use geo::Coord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::{ClockParseError, TimeOfDay};

/// Service time assigned to freshly placed sites.
pub const DEFAULT_SERVICE_TIME_MINUTES: u32 = 15;

/// Whether the solver must, may or must not route through a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitMode {
    /// Mandatory stop.
    #[default]
    Always,
    /// Optional stop.
    Maybe,
    /// Kept on the map but excluded from routing.
    Never,
}

impl VisitMode {
    /// Upper-case label used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Always => "ALWAYS",
            Self::Maybe => "MAYBE",
            Self::Never => "NEVER",
        }
    }
}

impl fmt::Display for VisitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitMode {
    type Err = SiteError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_uppercase().as_str() {
            "ALWAYS" => Ok(Self::Always),
            "MAYBE" => Ok(Self::Maybe),
            "NEVER" => Ok(Self::Never),
            _ => Err(SiteError::UnknownVisitMode {
                input: input.to_owned(),
            }),
        }
    }
}

/// Errors returned while building a [`Duty`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DutyError {
    /// The window closes before it opens.
    #[error("duty ends at {end} before it starts at {start}")]
    EndsBeforeStart { start: TimeOfDay, end: TimeOfDay },
    /// A bound carries seconds or falls on a later day.
    #[error("duty bound {at} is not a same-day HH:MM time")]
    NotSameDayMinute { at: TimeOfDay },
    /// The text form is not `HH:MM-HH:MM`.
    #[error("invalid duty {input:?}: expected HH:MM-HH:MM")]
    Malformed { input: String },
    /// One of the bounds failed to parse.
    #[error(transparent)]
    Clock(#[from] ClockParseError),
}

/// A window `[start, end)` during which a site is serviced if visited.
///
/// # Examples
///
/// ```
/// use rideplan_core::{Duty, TimeOfDay};
///
/// let duty: Duty = "09:00-10:30".parse().expect("valid duty");
/// assert_eq!(duty.start(), TimeOfDay::from_hms(9, 0, 0));
/// assert!(Duty::new(TimeOfDay::from_hms(10, 0, 0), TimeOfDay::from_hms(9, 0, 0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDuty")]
pub struct Duty {
    start: TimeOfDay,
    end: TimeOfDay,
}

#[derive(Deserialize)]
struct RawDuty {
    start: TimeOfDay,
    end: TimeOfDay,
}

impl TryFrom<RawDuty> for Duty {
    type Error = DutyError;

    fn try_from(raw: RawDuty) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl Duty {
    /// Validate and construct a duty window.
    ///
    /// # Errors
    ///
    /// Returns [`DutyError::NotSameDayMinute`] for a bound with seconds or a
    /// day offset, and [`DutyError::EndsBeforeStart`] when `end < start`.
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self, DutyError> {
        if let Some(at) = [start, end].into_iter().find(|at| !at.is_same_day_minute()) {
            return Err(DutyError::NotSameDayMinute { at });
        }
        if end < start {
            return Err(DutyError::EndsBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    /// Opening time, inclusive.
    #[must_use]
    pub const fn start(&self) -> TimeOfDay {
        self.start
    }

    /// Closing time, exclusive.
    #[must_use]
    pub const fn end(&self) -> TimeOfDay {
        self.end
    }
}

impl fmt::Display for Duty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for Duty {
    type Err = DutyError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (start, end) = input
            .trim()
            .split_once('-')
            .ok_or_else(|| DutyError::Malformed {
                input: input.to_owned(),
            })?;
        Self::new(start.trim().parse()?, end.trim().parse()?)
    }
}

/// Errors returned while building or editing a [`Site`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SiteError {
    /// The name is empty once trimmed.
    #[error("site name must not be empty")]
    EmptyName,
    /// A coordinate is NaN, infinite or out of range.
    #[error("invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
    /// Service time must be at least one minute.
    #[error("service time must be a positive number of minutes")]
    ZeroServiceTime,
    /// Visit mode text was not recognised.
    #[error("unknown visit mode {input:?}: expected ALWAYS, MAYBE or NEVER")]
    UnknownVisitMode { input: String },
}

/// A place with coordinates and visiting constraints.
///
/// # Examples
///
/// ```
/// use rideplan_core::{Site, VisitMode};
///
/// # fn main() -> Result<(), rideplan_core::SiteError> {
/// let site = Site::new("Bakery", 47.46, -0.55)?
///     .with_service_time_minutes(20)?
///     .with_visit(VisitMode::Maybe);
/// assert_eq!(site.service_time_minutes(), 20);
/// assert_eq!(site.location().y, 47.46);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawSite")]
pub struct Site {
    name: String,
    latitude: f64,
    longitude: f64,
    service_time_minutes: u32,
    visit: VisitMode,
    can_start_here: bool,
    duties: Vec<Duty>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSite {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default = "default_service_time")]
    service_time_minutes: u32,
    #[serde(default)]
    visit: VisitMode,
    #[serde(default)]
    can_start_here: bool,
    #[serde(default)]
    duties: Vec<Duty>,
}

const fn default_service_time() -> u32 {
    DEFAULT_SERVICE_TIME_MINUTES
}

impl TryFrom<RawSite> for Site {
    type Error = SiteError;

    fn try_from(raw: RawSite) -> Result<Self, Self::Error> {
        Ok(Self::new(raw.name, raw.latitude, raw.longitude)?
            .with_service_time_minutes(raw.service_time_minutes)?
            .with_visit(raw.visit)
            .with_can_start_here(raw.can_start_here)
            .with_duties(raw.duties))
    }
}

impl Site {
    /// Validate and construct a site with default constraints.
    ///
    /// Defaults: 15 minutes of service, [`VisitMode::Always`], not a start
    /// site, no duties.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::EmptyName`] or [`SiteError::InvalidCoordinates`].
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Result<Self, SiteError> {
        let name = validate_name(name.into())?;
        if !valid_coordinates(latitude, longitude) {
            return Err(SiteError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            name,
            latitude,
            longitude,
            service_time_minutes: DEFAULT_SERVICE_TIME_MINUTES,
            visit: VisitMode::default(),
            can_start_here: false,
            duties: Vec::new(),
        })
    }

    /// Replace the name.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::EmptyName`] for blank names.
    pub fn with_name(mut self, name: impl Into<String>) -> Result<Self, SiteError> {
        self.name = validate_name(name.into())?;
        Ok(self)
    }

    /// Set the service time in minutes.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::ZeroServiceTime`] for zero.
    pub fn with_service_time_minutes(mut self, minutes: u32) -> Result<Self, SiteError> {
        if minutes == 0 {
            return Err(SiteError::ZeroServiceTime);
        }
        self.service_time_minutes = minutes;
        Ok(self)
    }

    /// Set the visit mode.
    #[must_use]
    pub const fn with_visit(mut self, visit: VisitMode) -> Self {
        self.visit = visit;
        self
    }

    /// Mark whether an itinerary may start here.
    #[must_use]
    pub const fn with_can_start_here(mut self, can_start_here: bool) -> Self {
        self.can_start_here = can_start_here;
        self
    }

    /// Replace the duty list.
    #[must_use]
    pub fn with_duties(mut self, duties: Vec<Duty>) -> Self {
        self.duties = duties;
        self
    }

    /// Unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Position with `x = longitude` and `y = latitude`.
    #[must_use]
    pub const fn location(&self) -> Coord<f64> {
        Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }

    /// Service duration in minutes.
    #[must_use]
    pub const fn service_time_minutes(&self) -> u32 {
        self.service_time_minutes
    }

    /// Visit mode.
    #[must_use]
    pub const fn visit(&self) -> VisitMode {
        self.visit
    }

    /// Whether an itinerary may start here.
    #[must_use]
    pub const fn can_start_here(&self) -> bool {
        self.can_start_here
    }

    /// Duty windows in declaration order.
    #[must_use]
    pub fn duties(&self) -> &[Duty] {
        &self.duties
    }
}

fn validate_name(name: String) -> Result<String, SiteError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SiteError::EmptyName);
    }
    if trimmed.len() == name.len() {
        Ok(name)
    } else {
        Ok(trimmed.to_owned())
    }
}

fn valid_coordinates(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}
