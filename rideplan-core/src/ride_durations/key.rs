//! Value-typed cache key for a directed ride between two coordinates.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use geo::Coord;
use thiserror::Error;

/// A snapshot key did not have the `lat,lng,lat,lng` shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid ride key {input:?}: expected four comma-separated numbers")]
pub struct RideKeyParseError {
    /// Offending key text.
    pub input: String,
}

/// Directed pair `(origin, destination)` of coordinates.
///
/// Coordinates compare bitwise after normalizing `-0.0` to `0.0`, so two keys
/// are equal exactly when they were built from the same coordinates. The
/// text form `"<originLat>,<originLng>,<destLat>,<destLng>"` is used in
/// snapshots only.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use rideplan_core::RideKey;
///
/// let key = RideKey::new(Coord { x: 2.5, y: 1.0 }, Coord { x: -0.0, y: 3.0 });
/// assert_eq!(key.to_string(), "1,2.5,3,0");
/// assert_eq!("1,2.5,3,0".parse::<RideKey>(), Ok(key));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RideKey {
    origin: Coord<f64>,
    destination: Coord<f64>,
}

impl RideKey {
    /// Build the key for a ride from `origin` to `destination`.
    #[must_use]
    pub fn new(origin: Coord<f64>, destination: Coord<f64>) -> Self {
        Self {
            origin: normalize(origin),
            destination: normalize(destination),
        }
    }

    /// Where the ride starts.
    #[must_use]
    pub const fn origin(&self) -> Coord<f64> {
        self.origin
    }

    /// Where the ride ends.
    #[must_use]
    pub const fn destination(&self) -> Coord<f64> {
        self.destination
    }

    fn bits(&self) -> [u64; 4] {
        [
            self.origin.y.to_bits(),
            self.origin.x.to_bits(),
            self.destination.y.to_bits(),
            self.destination.x.to_bits(),
        ]
    }

    fn components(&self) -> [f64; 4] {
        [
            self.origin.y,
            self.origin.x,
            self.destination.y,
            self.destination.x,
        ]
    }
}

fn normalize(coord: Coord<f64>) -> Coord<f64> {
    // `-0.0 + 0.0` is `+0.0`; every other value is unchanged.
    Coord {
        x: coord.x + 0.0,
        y: coord.y + 0.0,
    }
}

impl PartialEq for RideKey {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for RideKey {}

impl Hash for RideKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

impl Ord for RideKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components()
            .iter()
            .zip(other.components().iter())
            .map(|(left, right)| left.total_cmp(right))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for RideKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RideKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [origin_lat, origin_lng, dest_lat, dest_lng] = self.components();
        write!(f, "{origin_lat},{origin_lng},{dest_lat},{dest_lng}")
    }
}

impl FromStr for RideKey {
    type Err = RideKeyParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let error = || RideKeyParseError {
            input: input.to_owned(),
        };
        let mut values = [0.0_f64; 4];
        let mut parts = input.split(',');
        for slot in &mut values {
            let part = parts.next().ok_or_else(error)?;
            *slot = part
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(error)?;
        }
        if parts.next().is_some() {
            return Err(error());
        }
        let [origin_lat, origin_lng, dest_lat, dest_lng] = values;
        Ok(Self::new(
            Coord {
                x: origin_lng,
                y: origin_lat,
            },
            Coord {
                x: dest_lng,
                y: dest_lat,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;

    fn coord(lat: f64, lng: f64) -> Coord<f64> {
        Coord { x: lng, y: lat }
    }

    #[rstest]
    fn key_is_directional() {
        let there = RideKey::new(coord(0.0, 0.0), coord(1.0, 1.0));
        let back = RideKey::new(coord(1.0, 1.0), coord(0.0, 0.0));
        assert_ne!(there, back);
    }

    #[rstest]
    fn negative_zero_matches_zero() {
        let plain = RideKey::new(coord(0.0, 0.0), coord(1.0, 1.0));
        let signed = RideKey::new(coord(-0.0, -0.0), coord(1.0, 1.0));
        assert_eq!(plain, signed);

        let set: HashSet<_> = [plain, signed].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[rstest]
    #[case("0.1,0.2,0.30000000000000004,-179.99999")]
    #[case("47.4739884,-0.5515588,48.8566,2.3522")]
    fn text_form_round_trips(#[case] text: &str) {
        let key: RideKey = text.parse().expect("valid key");
        assert_eq!(key.to_string(), text);
    }

    #[rstest]
    #[case("")]
    #[case("1,2,3")]
    #[case("1,2,3,4,5")]
    #[case("1,2,x,4")]
    #[case("NaN,0,0,0")]
    fn rejects_malformed_text(#[case] text: &str) {
        assert!(text.parse::<RideKey>().is_err(), "{text:?} should not parse");
    }

    #[rstest]
    fn orders_by_origin_then_destination() {
        let mut keys = vec![
            RideKey::new(coord(1.0, 0.0), coord(0.0, 0.0)),
            RideKey::new(coord(0.0, 0.0), coord(2.0, 0.0)),
            RideKey::new(coord(0.0, 0.0), coord(1.0, 0.0)),
        ];
        keys.sort();
        let text: Vec<_> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(text, ["0,0,1,0", "0,0,2,0", "1,0,0,0"]);
    }
}
