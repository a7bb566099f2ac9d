//! Clock values shared by the site model, the world payload and solver output.
//!
//! Both kinds of value travel as short strings: a [`TimeOfDay`] reads
//! `"09:30"` (or `"09:30:15 +1"` when the solver spills into the next day) and
//! a [`Duration`] reads `"1h5m"`. The helpers here are the single place that
//! knows those formats.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const SECS_PER_MINUTE: u32 = 60;
const SECS_PER_HOUR: u32 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u32 = 24 * SECS_PER_HOUR;

/// Errors raised while parsing clock text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockParseError {
    /// The input is not `HH:MM`, `HH:MM:SS` or one of those with ` +D`.
    #[error("invalid time of day {input:?}: expected HH:MM or HH:MM:SS")]
    TimeOfDay { input: String },
    /// The input is not a sequence of `h`, `m` and `s` components.
    #[error("invalid duration {input:?}: expected components like 1h5m30s")]
    Duration { input: String },
}

/// Seconds elapsed since midnight of the planning day.
///
/// Values past the end of the day are legal; they render with a ` +D` day
/// suffix.
///
/// # Examples
///
/// ```
/// use rideplan_core::TimeOfDay;
///
/// let at: TimeOfDay = "09:05".parse().expect("valid time");
/// assert_eq!(at, TimeOfDay::from_hms(9, 5, 0));
/// assert_eq!(at.to_string(), "09:05");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    /// Start of the planning day.
    pub const MIDNIGHT: Self = Self(0);

    /// Build a time from hour, minute and second components.
    #[must_use]
    pub const fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self(
            hours
                .saturating_mul(SECS_PER_HOUR)
                .saturating_add(minutes.saturating_mul(SECS_PER_MINUTE))
                .saturating_add(seconds),
        )
    }

    /// Build a time from raw seconds since midnight.
    #[must_use]
    pub const fn from_seconds(seconds: u32) -> Self {
        Self(seconds)
    }

    /// Seconds since midnight.
    #[must_use]
    pub const fn as_seconds(self) -> u32 {
        self.0
    }

    /// Whether this is a whole minute before the next midnight.
    #[must_use]
    pub const fn is_same_day_minute(self) -> bool {
        self.0 < SECS_PER_DAY && self.0 % SECS_PER_MINUTE == 0
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = self.0 / SECS_PER_DAY;
        let hours = (self.0 / SECS_PER_HOUR) % 24;
        let minutes = (self.0 / SECS_PER_MINUTE) % 60;
        let seconds = self.0 % 60;
        write!(f, "{hours:02}:{minutes:02}")?;
        if seconds != 0 {
            write!(f, ":{seconds:02}")?;
        }
        if days != 0 {
            write!(f, " +{days}")?;
        }
        Ok(())
    }
}

impl FromStr for TimeOfDay {
    type Err = ClockParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let error = || ClockParseError::TimeOfDay {
            input: input.to_owned(),
        };
        let (clock, days) = match input.split_once(" +") {
            Some((clock, days)) => (clock, digits(days).ok_or_else(error)?),
            None => (input, 0),
        };

        let mut parts = clock.split(':');
        let hours = parts
            .next()
            .and_then(two_digits)
            .filter(|hours| *hours < 24)
            .ok_or_else(error)?;
        let minutes = parts
            .next()
            .and_then(two_digits)
            .filter(|minutes| *minutes < 60)
            .ok_or_else(error)?;
        let seconds = match parts.next() {
            Some(part) => two_digits(part)
                .filter(|seconds| *seconds < 60)
                .ok_or_else(error)?,
            None => 0,
        };
        if parts.next().is_some() {
            return Err(error());
        }

        days.checked_mul(SECS_PER_DAY)
            .and_then(|offset| offset.checked_add(Self::from_hms(hours, minutes, seconds).0))
            .map(Self)
            .ok_or_else(error)
    }
}

fn digits(part: &str) -> Option<u32> {
    if part.is_empty() || !part.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn two_digits(part: &str) -> Option<u32> {
    if part.len() == 2 { digits(part) } else { None }
}

impl Add<Duration> for TimeOfDay {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        let seconds = u32::try_from(rhs.as_secs()).unwrap_or(u32::MAX);
        Self(self.0.saturating_add(seconds))
    }
}

impl Sub for TimeOfDay {
    type Output = Duration;

    /// Elapsed time between two instants, saturating at zero.
    fn sub(self, rhs: Self) -> Self::Output {
        Duration::from_secs(u64::from(self.0.saturating_sub(rhs.0)))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Render a duration as `[<h>h][<m>m][<s>s]`, or `"0s"` when empty.
///
/// Sub-second precision is dropped.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use rideplan_core::clock::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(3900)), "1h5m");
/// assert_eq!(format_duration(Duration::ZERO), "0s");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    if total == 0 {
        return "0s".to_owned();
    }
    let hours = total / 3600;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;
    let mut text = String::new();
    if hours != 0 {
        text.push_str(&format!("{hours}h"));
    }
    if minutes != 0 {
        text.push_str(&format!("{minutes}m"));
    }
    if seconds != 0 {
        text.push_str(&format!("{seconds}s"));
    }
    text
}

/// Parse duration text produced by [`format_duration`] or by the provider.
///
/// Components must appear in `h`, `m`, `s` order; each is optional but at
/// least one must be present and the whole input must be consumed.
///
/// # Errors
///
/// Returns [`ClockParseError::Duration`] for anything else.
pub fn parse_duration(input: &str) -> Result<Duration, ClockParseError> {
    let error = || ClockParseError::Duration {
        input: input.to_owned(),
    };
    let mut rest = input;
    let mut total: u64 = 0;
    let mut matched = false;

    for (unit, scale) in [('h', 3600_u64), ('m', 60), ('s', 1)] {
        let width = rest.bytes().take_while(u8::is_ascii_digit).count();
        if width == 0 {
            continue;
        }
        let (number, tail) = rest.split_at(width);
        let Some(after_unit) = tail.strip_prefix(unit) else {
            continue;
        };
        let value: u64 = number.parse().map_err(|_| error())?;
        total = value
            .checked_mul(scale)
            .and_then(|scaled| total.checked_add(scaled))
            .ok_or_else(error)?;
        rest = after_unit;
        matched = true;
    }

    if !matched || !rest.is_empty() {
        return Err(error());
    }
    Ok(Duration::from_secs(total))
}

/// Serde adapter storing a [`Duration`] as duration text.
pub mod duration_text {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    use super::{format_duration, parse_duration};

    /// Serialize as `"1h5m"`.
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*duration))
    }

    /// Deserialize from duration text.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter storing a whole number of minutes as `"<N>m"`.
///
/// Reading accepts any duration text.
pub mod minutes_text {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    use super::parse_duration;

    /// Serialize as `"<N>m"`, truncating leftover seconds.
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("{}m", duration.as_secs() / 60))
    }

    /// Deserialize from duration text.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for maps whose values are durations.
pub mod duration_map {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{format_duration, parse_duration};

    /// Serialize each value as duration text.
    pub fn serialize<S: Serializer>(
        map: &BTreeMap<String, Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut entries = serializer.serialize_map(Some(map.len()))?;
        for (key, duration) in map {
            entries.serialize_entry(key, &format_duration(*duration))?;
        }
        entries.end()
    }

    /// Deserialize a map of duration text.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Duration>, D::Error> {
        let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, text)| {
                parse_duration(&text)
                    .map(|duration| (key, duration))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
