//! Versioned save and load of the planner model.
//!
//! The model is stored as one JSON document under [`MODEL_KEY`]:
//!
//! ```json
//! {"version": 1, "sites": [...], "rideDurations": {"rideDurations": [[key, value], ...]},
//!  "minStartAt": "09:00", "maxEndAt": null}
//! ```
//!
//! The version tag is checked before anything else is decoded. There is no
//! migration: any other version is reported and the caller starts afresh.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Site;
use crate::clock::TimeOfDay;
use crate::ride_durations::{RideDurations, RideDurationsSnapshot};
use crate::store::{SnapshotStore, StoreError};

/// Store key holding the model.
pub const MODEL_KEY: &str = "rideplan.model";

/// Version tag written by this release.
pub const MODEL_VERSION: u32 = 1;

/// Earliest departure of a fresh model.
pub const DEFAULT_MIN_START_AT: TimeOfDay = TimeOfDay::from_hms(9, 0, 0);

/// Everything a planning session owns.
#[derive(Debug, Clone)]
pub struct PlannerModel {
    /// Sites in placement order.
    pub sites: Vec<Site>,
    /// Directed ride cache.
    pub ride_durations: RideDurations,
    /// Earliest departure.
    pub min_start_at: TimeOfDay,
    /// Latest return, if bounded.
    pub max_end_at: Option<TimeOfDay>,
}

impl Default for PlannerModel {
    fn default() -> Self {
        Self {
            sites: Vec::new(),
            ride_durations: RideDurations::default(),
            min_start_at: DEFAULT_MIN_START_AT,
            max_end_at: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredModelRef<'a> {
    version: u32,
    sites: &'a [Site],
    ride_durations: RideDurationsSnapshot,
    min_start_at: TimeOfDay,
    max_end_at: Option<TimeOfDay>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredModel {
    sites: Vec<Site>,
    ride_durations: RideDurationsSnapshot,
    min_start_at: TimeOfDay,
    #[serde(default)]
    max_end_at: Option<TimeOfDay>,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

/// Errors from [`PersistenceGateway::load`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// The stored document was written by an incompatible release.
    #[error("stored model has version {found}, expected {expected}")]
    VersionMismatch {
        /// Version found in the store.
        found: u32,
        /// Version this release understands.
        expected: u32,
    },
    /// The stored document is not a valid model.
    #[error("stored model is malformed: {message}")]
    ParseFailure {
        /// Decoder description.
        message: String,
    },
    /// The backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from [`PersistenceGateway::save`].
#[derive(Debug, Error)]
pub enum SaveError {
    /// The model could not be encoded.
    #[error("failed to encode model: {message}")]
    Encode {
        /// Encoder description.
        message: String,
    },
    /// The backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Reads and writes [`PlannerModel`] snapshots through a [`SnapshotStore`].
pub struct PersistenceGateway {
    store: Box<dyn SnapshotStore>,
}

impl std::fmt::Debug for PersistenceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceGateway").finish_non_exhaustive()
    }
}

impl PersistenceGateway {
    /// Persist through `store`.
    pub fn new(store: impl SnapshotStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Write `model` under [`MODEL_KEY`].
    ///
    /// # Errors
    ///
    /// [`SaveError::Encode`] if serialization fails, [`SaveError::Store`] if
    /// the backend does.
    pub fn save(&self, model: &PlannerModel) -> Result<(), SaveError> {
        let stored = StoredModelRef {
            version: MODEL_VERSION,
            sites: &model.sites,
            ride_durations: model.ride_durations.to_snapshot(),
            min_start_at: model.min_start_at,
            max_end_at: model.max_end_at,
        };
        let json = serde_json::to_string(&stored).map_err(|err| SaveError::Encode {
            message: err.to_string(),
        })?;
        self.store.write(MODEL_KEY, &json)?;
        debug!("saved model with {} sites", model.sites.len());
        Ok(())
    }

    /// Read the stored model.
    ///
    /// Returns `Ok(None)` when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// [`LoadError::VersionMismatch`] for any version other than
    /// [`MODEL_VERSION`], [`LoadError::ParseFailure`] for malformed documents
    /// or cache keys, [`LoadError::Store`] for backend failures.
    pub fn load(&self) -> Result<Option<PlannerModel>, LoadError> {
        let Some(json) = self.store.read(MODEL_KEY)? else {
            return Ok(None);
        };

        let probe: VersionProbe = serde_json::from_str(&json).map_err(parse_failure)?;
        if probe.version != MODEL_VERSION {
            return Err(LoadError::VersionMismatch {
                found: probe.version,
                expected: MODEL_VERSION,
            });
        }

        let stored: StoredModel = serde_json::from_str(&json).map_err(parse_failure)?;
        let ride_durations =
            RideDurations::from_snapshot(&stored.ride_durations).map_err(parse_failure)?;
        Ok(Some(PlannerModel {
            sites: stored.sites,
            ride_durations,
            min_start_at: stored.min_start_at,
            max_end_at: stored.max_end_at,
        }))
    }

    /// Read the stored model, or start from an empty one.
    ///
    /// Load failures are logged and otherwise swallowed.
    #[must_use]
    pub fn load_or_empty(&self) -> PlannerModel {
        match self.load() {
            Ok(Some(model)) => model,
            Ok(None) => {
                debug!("no stored model; starting empty");
                PlannerModel::default()
            }
            Err(err) => {
                warn!("discarding stored model: {err}");
                PlannerModel::default()
            }
        }
    }
}

fn parse_failure(err: impl std::fmt::Display) -> LoadError {
    LoadError::ParseFailure {
        message: err.to_string(),
    }
}
