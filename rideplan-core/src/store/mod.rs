//! Key-value storage for persisted snapshots.
//!
//! The [`SnapshotStore`] trait is the only thing the persistence gateway
//! needs from a backend: read a string by key and write one back. Values are
//! opaque to the store.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use sqlite::SqliteSnapshotStore;

/// Errors raised by a [`SnapshotStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A SQLite operation failed.
    #[cfg(feature = "store-sqlite")]
    #[error("SQLite {operation} failed: {source}")]
    Sqlite {
        /// What the store was doing.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// The backend is unavailable for another reason.
    #[error("snapshot store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

/// Durable string storage keyed by name.
///
/// # Examples
///
/// ```rust
/// use rideplan_core::{MemoryStore, SnapshotStore};
///
/// # fn main() -> Result<(), rideplan_core::StoreError> {
/// let store = MemoryStore::default();
/// store.write("greeting", "hello")?;
/// assert_eq!(store.read("greeting")?.as_deref(), Some("hello"));
/// assert_eq!(store.read("missing")?, None);
/// # Ok(())
/// # }
/// ```
pub trait SnapshotStore: Send + Sync {
    /// Value stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Volatile [`SnapshotStore`] backed by a map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl SnapshotStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for std::sync::Arc<S> {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).write(key, value)
    }
}
