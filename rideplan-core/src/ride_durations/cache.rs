//! Directed ride-duration cache with minimal-delta refresh.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use geo::Coord;
use log::{debug, info};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Site;
use crate::clock::{format_duration, parse_duration};

use super::error::{RefreshError, RideDurationError};
use super::key::{RideKey, RideKeyParseError};
use super::provider::{RideDurationMatrix, RideDurationProvider};

const UNKNOWN_TEXT: &str = "unknown";

/// Cached outcome of a provider round trip for one directed pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RideDuration {
    /// The provider computed this ride.
    Known(Duration),
    /// The provider answered but could not compute this ride.
    Unknown,
}

impl RideDuration {
    /// The duration when known.
    #[must_use]
    pub const fn known(self) -> Option<Duration> {
        match self {
            Self::Known(duration) => Some(duration),
            Self::Unknown => None,
        }
    }
}

impl From<Option<Duration>> for RideDuration {
    fn from(cell: Option<Duration>) -> Self {
        cell.map_or(Self::Unknown, Self::Known)
    }
}

impl Serialize for RideDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(duration) => serializer.serialize_str(&format_duration(*duration)),
            Self::Unknown => serializer.serialize_str(UNKNOWN_TEXT),
        }
    }
}

impl<'de> Deserialize<'de> for RideDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(Self::Unknown),
            Some(text) if text == UNKNOWN_TEXT => Ok(Self::Unknown),
            Some(text) => parse_duration(&text)
                .map(Self::Known)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Origins and destinations that take part in at least one uncached pair.
///
/// Both lists are deduplicated by coordinate and follow site order.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingEndpoints {
    /// Ride starting points to request.
    pub origins: Vec<Coord<f64>>,
    /// Ride end points to request.
    pub destinations: Vec<Coord<f64>>,
}

/// Result of a successful [`RideDurations::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Every pair was cached; the provider was not contacted.
    UpToDate,
    /// One provider round trip was merged.
    Fetched {
        /// Number of cells merged.
        pairs: usize,
        /// Cells the provider could not compute.
        unknown: usize,
    },
}

/// Persisted form of the cache: `{"rideDurations": [[key, value], ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideDurationsSnapshot {
    /// Entries sorted by key.
    pub ride_durations: Vec<(String, RideDuration)>,
}

/// Directed travel-time cache keyed by coordinate pairs.
///
/// Entries are only ever added or overwritten by a later provider round trip
/// for the same key. At most one [`refresh`](Self::refresh) runs at a time.
#[derive(Debug, Default)]
pub struct RideDurations {
    entries: RwLock<BTreeMap<RideKey, RideDuration>>,
    processing: AtomicBool,
}

impl Clone for RideDurations {
    fn clone(&self) -> Self {
        Self {
            entries: RwLock::new(self.read_entries().clone()),
            processing: AtomicBool::new(false),
        }
    }
}

impl RideDurations {
    /// Cached value for the ride from `origin` to `destination`.
    #[must_use]
    pub fn get(&self, origin: Coord<f64>, destination: Coord<f64>) -> Option<RideDuration> {
        self.read_entries()
            .get(&RideKey::new(origin, destination))
            .copied()
    }

    /// Cached value for the ride between two sites.
    #[must_use]
    pub fn get_between(&self, from: &Site, to: &Site) -> Option<RideDuration> {
        self.get(from.location(), to.location())
    }

    /// Store `value` for the ride from `origin` to `destination`.
    pub fn insert(&self, origin: Coord<f64>, destination: Coord<f64>, value: RideDuration) {
        self.write_entries()
            .insert(RideKey::new(origin, destination), value);
    }

    /// Number of cached pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    /// Endpoints of every uncached directed pair between distinct
    /// coordinates of `sites`, or `None` when nothing is missing.
    pub fn missing_endpoints<'a, I>(&self, sites: I) -> Option<MissingEndpoints>
    where
        I: IntoIterator<Item = &'a Site>,
    {
        let points = distinct_locations(sites);
        let entries = self.read_entries();
        let mut is_origin = vec![false; points.len()];
        let mut is_destination = vec![false; points.len()];

        for (i, origin) in points.iter().enumerate() {
            for (j, destination) in points.iter().enumerate() {
                if i != j && !entries.contains_key(&RideKey::new(*origin, *destination)) {
                    is_origin[i] = true;
                    is_destination[j] = true;
                }
            }
        }

        let pick = |flags: &[bool]| -> Vec<Coord<f64>> {
            points
                .iter()
                .zip(flags)
                .filter_map(|(point, wanted)| wanted.then_some(*point))
                .collect()
        };
        let origins = pick(&is_origin);
        if origins.is_empty() {
            return None;
        }
        Some(MissingEndpoints {
            origins,
            destinations: pick(&is_destination),
        })
    }

    /// Request every missing pair for `sites` in one provider round trip and
    /// merge the answer.
    ///
    /// The whole cross product of missing origins and destinations is
    /// requested, so some already-cached pairs may be overwritten with fresh
    /// values.
    ///
    /// # Errors
    ///
    /// [`RefreshError::Busy`] when another refresh is in flight;
    /// [`RefreshError::Provider`] when the provider fails or returns a matrix
    /// that does not match the request. Nothing is merged on error.
    pub async fn refresh<'a, I>(
        &self,
        sites: I,
        provider: &dyn RideDurationProvider,
    ) -> Result<RefreshOutcome, RefreshError>
    where
        I: IntoIterator<Item = &'a Site>,
    {
        let _guard = ProcessingGuard::acquire(&self.processing).ok_or(RefreshError::Busy)?;

        let Some(missing) = self.missing_endpoints(sites) else {
            debug!("ride durations up to date");
            return Ok(RefreshOutcome::UpToDate);
        };
        info!(
            "requesting ride durations for {} origins x {} destinations",
            missing.origins.len(),
            missing.destinations.len()
        );

        let matrix = provider
            .ride_durations(&missing.origins, &missing.destinations)
            .await?;
        check_shape(&matrix, &missing)?;

        let mut pairs = 0;
        let mut unknown = 0;
        let mut entries = self.write_entries();
        for (origin, row) in missing.origins.iter().zip(&matrix) {
            for (destination, cell) in missing.destinations.iter().zip(row) {
                let value = RideDuration::from(*cell);
                if value == RideDuration::Unknown {
                    unknown += 1;
                }
                entries.insert(RideKey::new(*origin, *destination), value);
                pairs += 1;
            }
        }
        debug!("merged {pairs} ride durations ({unknown} unknown)");
        Ok(RefreshOutcome::Fetched { pairs, unknown })
    }

    /// Capture every entry, sorted by key.
    #[must_use]
    pub fn to_snapshot(&self) -> RideDurationsSnapshot {
        RideDurationsSnapshot {
            ride_durations: self
                .read_entries()
                .iter()
                .map(|(key, value)| (key.to_string(), *value))
                .collect(),
        }
    }

    /// Rebuild a cache from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RideKeyParseError`] for the first malformed key.
    pub fn from_snapshot(snapshot: &RideDurationsSnapshot) -> Result<Self, RideKeyParseError> {
        let entries = snapshot
            .ride_durations
            .iter()
            .map(|(key, value)| key.parse::<RideKey>().map(|key| (key, *value)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(Self {
            entries: RwLock::new(entries),
            processing: AtomicBool::new(false),
        })
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, BTreeMap<RideKey, RideDuration>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, BTreeMap<RideKey, RideDuration>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Single-flight flag held for the lifetime of a refresh, including when the
/// refresh future is dropped mid-flight.
struct ProcessingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ProcessingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

fn distinct_locations<'a, I>(sites: I) -> Vec<Coord<f64>>
where
    I: IntoIterator<Item = &'a Site>,
{
    let mut seen = HashSet::new();
    sites
        .into_iter()
        .map(Site::location)
        .filter(|point| seen.insert(RideKey::new(*point, *point)))
        .collect()
}

fn check_shape(
    matrix: &RideDurationMatrix,
    missing: &MissingEndpoints,
) -> Result<(), RideDurationError> {
    let expected_rows = missing.origins.len();
    let expected_columns = missing.destinations.len();
    if matrix.len() != expected_rows || matrix.iter().any(|row| row.len() != expected_columns) {
        return Err(RideDurationError::ShapeMismatch {
            expected_rows,
            expected_columns,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{GatedRideDurationProvider, StubRideDurationProvider};
    use proptest::prelude::*;
    use rstest::{fixture, rstest};

    const TEN_MINUTES: Duration = Duration::from_secs(600);

    fn site(name: &str, lat: f64, lng: f64) -> Site {
        Site::new(name, lat, lng).expect("valid site")
    }

    fn point(lat: f64, lng: f64) -> Coord<f64> {
        Coord { x: lng, y: lat }
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("test runtime")
            .block_on(future)
    }

    #[fixture]
    fn pair() -> Vec<Site> {
        vec![site("A", 0.0, 0.0), site("B", 1.0, 1.0)]
    }

    #[rstest]
    fn empty_cache_misses_both_directions(pair: Vec<Site>) {
        let cache = RideDurations::default();
        let missing = cache.missing_endpoints(&pair).expect("pairs are missing");
        assert_eq!(missing.origins, [point(0.0, 0.0), point(1.0, 1.0)]);
        assert_eq!(missing.destinations, [point(0.0, 0.0), point(1.0, 1.0)]);
    }

    #[rstest]
    fn single_missing_direction_requests_one_cell(pair: Vec<Site>) {
        let cache = RideDurations::default();
        cache.insert(point(0.0, 0.0), point(1.0, 1.0), RideDuration::Known(TEN_MINUTES));

        let missing = cache.missing_endpoints(&pair).expect("B to A is missing");
        assert_eq!(missing.origins, [point(1.0, 1.0)]);
        assert_eq!(missing.destinations, [point(0.0, 0.0)]);
    }

    #[rstest]
    fn shared_coordinates_never_need_a_ride() {
        let sites = [site("A", 2.0, 2.0), site("A bis", 2.0, 2.0)];
        let cache = RideDurations::default();
        assert_eq!(cache.missing_endpoints(&sites), None);
    }

    #[rstest]
    fn lone_site_needs_nothing() {
        let cache = RideDurations::default();
        assert_eq!(cache.missing_endpoints(&[site("A", 0.0, 0.0)]), None);
    }

    #[rstest]
    fn refresh_merges_provider_answer(pair: Vec<Site>) {
        let cache = RideDurations::default();
        let provider = StubRideDurationProvider::with_duration(TEN_MINUTES);

        let outcome = block_on(cache.refresh(&pair, &provider)).expect("refresh succeeds");

        assert_eq!(outcome, RefreshOutcome::Fetched { pairs: 4, unknown: 0 });
        assert_eq!(
            cache.get_between(&pair[0], &pair[1]),
            Some(RideDuration::Known(TEN_MINUTES))
        );
        assert_eq!(provider.calls().len(), 1);
    }

    #[rstest]
    fn second_refresh_skips_provider(pair: Vec<Site>) {
        let cache = RideDurations::default();
        let provider = StubRideDurationProvider::with_duration(TEN_MINUTES);

        block_on(cache.refresh(&pair, &provider)).expect("first refresh");
        let outcome = block_on(cache.refresh(&pair, &provider)).expect("second refresh");

        assert_eq!(outcome, RefreshOutcome::UpToDate);
        assert_eq!(provider.calls().len(), 1);
    }

    #[rstest]
    fn null_cells_become_unknown(pair: Vec<Site>) {
        let cache = RideDurations::default();
        let provider = StubRideDurationProvider::with_fn(|origin, _| {
            (origin.x == 0.0).then_some(TEN_MINUTES)
        });

        let outcome = block_on(cache.refresh(&pair, &provider)).expect("refresh succeeds");

        assert_eq!(outcome, RefreshOutcome::Fetched { pairs: 4, unknown: 2 });
        assert_eq!(
            cache.get_between(&pair[1], &pair[0]),
            Some(RideDuration::Unknown)
        );
        // Unknown entries count as cached.
        assert_eq!(cache.missing_endpoints(&pair), None);
    }

    #[rstest]
    fn provider_error_merges_nothing_and_releases_guard(pair: Vec<Site>) {
        let cache = RideDurations::default();
        let failing = StubRideDurationProvider::with_error(RideDurationError::NetworkError {
            url: "http://localhost/api/ride-durations".to_owned(),
            message: "connection refused".to_owned(),
        });

        let err = block_on(cache.refresh(&pair, &failing)).expect_err("provider fails");
        assert!(matches!(
            err,
            RefreshError::Provider(RideDurationError::NetworkError { .. })
        ));
        assert!(cache.is_empty());

        let healthy = StubRideDurationProvider::with_duration(TEN_MINUTES);
        block_on(cache.refresh(&pair, &healthy)).expect("guard was released");
        assert_eq!(cache.len(), 4);
    }

    #[rstest]
    fn misshapen_matrix_is_rejected(pair: Vec<Site>) {
        let cache = RideDurations::default();
        let provider = StubRideDurationProvider::with_matrix(vec![vec![Some(TEN_MINUTES)]]);

        let err = block_on(cache.refresh(&pair, &provider)).expect_err("shape mismatch");

        assert_eq!(
            err,
            RefreshError::Provider(RideDurationError::ShapeMismatch {
                expected_rows: 2,
                expected_columns: 2,
            })
        );
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn concurrent_refresh_is_busy() {
        let sites = pair();
        let cache = RideDurations::default();
        let provider =
            GatedRideDurationProvider::new(StubRideDurationProvider::with_duration(TEN_MINUTES));

        let mut first = Box::pin(cache.refresh(&sites, &provider));
        assert!(futures_util::poll!(&mut first).is_pending());

        let second = cache.refresh(&sites, &provider).await;
        assert_eq!(second, Err(RefreshError::Busy));

        provider.open();
        let outcome = first.await.expect("first refresh completes");
        assert!(matches!(outcome, RefreshOutcome::Fetched { .. }));
        assert_eq!(
            cache.refresh(&sites, &provider).await,
            Ok(RefreshOutcome::UpToDate)
        );
    }

    #[tokio::test]
    async fn dropping_a_refresh_releases_guard() {
        let sites = pair();
        let cache = RideDurations::default();
        let gated =
            GatedRideDurationProvider::new(StubRideDurationProvider::with_duration(TEN_MINUTES));

        let mut pending = Box::pin(cache.refresh(&sites, &gated));
        assert!(futures_util::poll!(&mut pending).is_pending());
        drop(pending);

        let healthy = StubRideDurationProvider::with_duration(TEN_MINUTES);
        let outcome = cache.refresh(&sites, &healthy).await;
        assert!(matches!(outcome, Ok(RefreshOutcome::Fetched { .. })));
        assert!(gated.inner().calls().is_empty());
    }

    #[rstest]
    fn snapshot_round_trips_through_json(pair: Vec<Site>) {
        let cache = RideDurations::default();
        cache.insert(pair[0].location(), pair[1].location(), RideDuration::Known(TEN_MINUTES));
        cache.insert(pair[1].location(), pair[0].location(), RideDuration::Unknown);

        let json = serde_json::to_string(&cache.to_snapshot()).expect("serialise snapshot");
        assert_eq!(
            json,
            r#"{"rideDurations":[["0,0,1,1","10m"],["1,1,0,0","unknown"]]}"#
        );

        let snapshot: RideDurationsSnapshot = serde_json::from_str(&json).expect("parse snapshot");
        let restored = RideDurations::from_snapshot(&snapshot).expect("valid keys");
        assert_eq!(restored.to_snapshot(), cache.to_snapshot());
    }

    #[rstest]
    fn snapshot_reads_null_as_unknown() {
        let snapshot: RideDurationsSnapshot =
            serde_json::from_str(r#"{"rideDurations":[["0,0,1,1",null]]}"#)
                .expect("parse snapshot");
        let cache = RideDurations::from_snapshot(&snapshot).expect("valid keys");
        assert_eq!(
            cache.get(point(0.0, 0.0), point(1.0, 1.0)),
            Some(RideDuration::Unknown)
        );
    }

    #[rstest]
    fn snapshot_rejects_malformed_keys() {
        let snapshot = RideDurationsSnapshot {
            ride_durations: vec![("0,0,1".to_owned(), RideDuration::Unknown)],
        };
        assert!(RideDurations::from_snapshot(&snapshot).is_err());
    }

    fn arb_sites() -> impl Strategy<Value = Vec<Site>> {
        // A small grid makes shared coordinates likely.
        prop::collection::vec((0_i32..4, 0_i32..4), 0..6).prop_map(|cells| {
            cells
                .into_iter()
                .enumerate()
                .map(|(n, (lat, lng))| site(&format!("S{n}"), f64::from(lat), f64::from(lng)))
                .collect()
        })
    }

    fn arb_cell() -> impl Strategy<Value = Option<u64>> {
        prop::option::of(0_u64..7200)
    }

    proptest! {
        #[test]
        fn refresh_is_idempotent(sites in arb_sites()) {
            let cache = RideDurations::default();
            let provider = StubRideDurationProvider::with_duration(TEN_MINUTES);

            block_on(cache.refresh(&sites, &provider)).expect("first refresh");
            let calls = provider.calls().len();
            let outcome = block_on(cache.refresh(&sites, &provider)).expect("second refresh");

            prop_assert_eq!(outcome, RefreshOutcome::UpToDate);
            prop_assert_eq!(provider.calls().len(), calls);
            prop_assert!(calls <= 1);
        }

        #[test]
        fn refreshed_pairs_hold_provider_values(sites in arb_sites(), seed in arb_cell()) {
            let cache = RideDurations::default();
            let answer = move |origin: Coord<f64>, destination: Coord<f64>| {
                let offset = (origin.x + 2.0 * origin.y + 3.0 * destination.x) as u64;
                seed.map(|secs| Duration::from_secs(secs + offset))
            };
            let provider = StubRideDurationProvider::with_fn(answer);

            block_on(cache.refresh(&sites, &provider)).expect("refresh");

            for from in &sites {
                for to in &sites {
                    if from.location() == to.location() {
                        continue;
                    }
                    let expected = RideDuration::from(answer(from.location(), to.location()));
                    prop_assert_eq!(cache.get_between(from, to), Some(expected));
                }
            }
        }

        #[test]
        fn snapshot_preserves_every_lookup(
            cells in prop::collection::vec(((-90_i32..90, -180_i32..180), (-90_i32..90, -180_i32..180), arb_cell()), 0..12)
        ) {
            let cache = RideDurations::default();
            for ((a_lat, a_lng), (b_lat, b_lng), value) in &cells {
                let origin = point(f64::from(*a_lat) / 7.0, f64::from(*a_lng) / 3.0);
                let destination = point(f64::from(*b_lat) / 7.0, f64::from(*b_lng) / 3.0);
                cache.insert(origin, destination, value.map(Duration::from_secs).into());
            }

            let json = serde_json::to_string(&cache.to_snapshot()).expect("serialise");
            let snapshot: RideDurationsSnapshot = serde_json::from_str(&json).expect("parse");
            let restored = RideDurations::from_snapshot(&snapshot).expect("valid keys");

            prop_assert_eq!(restored.len(), cache.len());
            for ((a_lat, a_lng), (b_lat, b_lng), _) in &cells {
                let origin = point(f64::from(*a_lat) / 7.0, f64::from(*a_lng) / 3.0);
                let destination = point(f64::from(*b_lat) / 7.0, f64::from(*b_lng) / 3.0);
                prop_assert_eq!(restored.get(origin, destination), cache.get(origin, destination));
            }
        }
    }
}
