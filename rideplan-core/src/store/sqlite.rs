//! SQLite-backed snapshot store.

use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, OptionalExtension, params};

use super::{SnapshotStore, StoreError};

const CREATE_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS snapshots (key TEXT PRIMARY KEY, value TEXT NOT NULL)";
const SELECT_VALUE: &str = "SELECT value FROM snapshots WHERE key = ?1";
const UPSERT_VALUE: &str = "INSERT INTO snapshots (key, value) VALUES (?1, ?2)
     ON CONFLICT(key) DO UPDATE SET value = excluded.value";

/// [`SnapshotStore`] keeping one row per key in a `snapshots` table.
pub struct SqliteSnapshotStore {
    connection: Mutex<Connection>,
}

impl fmt::Debug for SqliteSnapshotStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteSnapshotStore").finish_non_exhaustive()
    }
}

impl SqliteSnapshotStore {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] when the file cannot be opened or the
    /// table cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let connection = Connection::open(path).map_err(sqlite("open"))?;
        Self::with_connection(connection)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] when SQLite cannot allocate it.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory().map_err(sqlite("open"))?;
        Self::with_connection(connection)
    }

    fn with_connection(connection: Connection) -> Result<Self, StoreError> {
        connection
            .execute_batch(CREATE_TABLE)
            .map_err(sqlite("create table"))?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.connection()
            .query_row(SELECT_VALUE, params![key], |row| row.get(0))
            .optional()
            .map_err(sqlite("read"))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.connection()
            .execute(UPSERT_VALUE, params![key, value])
            .map(|_| ())
            .map_err(sqlite("write"))
    }
}

fn sqlite(operation: &'static str) -> impl Fn(rusqlite::Error) -> StoreError {
    move |source| StoreError::Sqlite { operation, source }
}
