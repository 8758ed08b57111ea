//! SQLite-backed durable storage for the session record.
//!
//! The credential and the serialized profile are two rows of a small
//! key-value table, always written and cleared in one transaction so a
//! partial record can never be observed.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::error::{ClientError, Result};
use crate::domain::models::{Session, UserProfile};
use crate::domain::ports::SessionStore;

const KEY_CREDENTIAL: &str = "credential";
const KEY_PROFILE: &str = "profile";

/// [`SessionStore`] adapter over a local SQLite database.
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    /// Open or create the session database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ClientError::Storage {
                message: format!("failed to create storage directory: {e}"),
                source: None,
            })?;
        }

        let conn = Connection::open(path).map_err(ClientError::storage)?;
        Self::init(conn)
    }

    /// Open an in-memory store, for tests and throwaway embedders.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(ClientError::storage)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;

             CREATE TABLE IF NOT EXISTS session (
                 key TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );",
        )
        .map_err(ClientError::storage)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for SqliteSessionStore {
    fn save(&self, credential: &str, profile: &UserProfile) -> Result<()> {
        let profile_json = serde_json::to_string(profile).map_err(|e| ClientError::Storage {
            message: format!("failed to serialize profile: {e}"),
            source: None,
        })?;

        let mut conn = self.lock();
        let tx = conn.transaction().map_err(ClientError::storage)?;
        tx.execute(
            "INSERT INTO session (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![KEY_CREDENTIAL, credential],
        )
        .map_err(ClientError::storage)?;
        tx.execute(
            "INSERT INTO session (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![KEY_PROFILE, profile_json],
        )
        .map_err(ClientError::storage)?;
        tx.commit().map_err(ClientError::storage)
    }

    fn load(&self) -> Result<Option<Session>> {
        let conn = self.lock();
        let fetch = |key: &str| -> Result<Option<String>> {
            conn.query_row(
                "SELECT value FROM session WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(ClientError::storage)
        };

        let (Some(credential), Some(profile_json)) =
            (fetch(KEY_CREDENTIAL)?, fetch(KEY_PROFILE)?)
        else {
            return Ok(None);
        };

        let profile: UserProfile =
            serde_json::from_str(&profile_json).map_err(|e| ClientError::Storage {
                message: format!("corrupt profile record: {e}"),
                source: None,
            })?;

        Ok(Some(Session {
            credential,
            profile,
        }))
    }

    fn clear(&self) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction().map_err(ClientError::storage)?;
        tx.execute(
            "DELETE FROM session WHERE key IN (?1, ?2)",
            params![KEY_CREDENTIAL, KEY_PROFILE],
        )
        .map_err(ClientError::storage)?;
        tx.commit().map_err(ClientError::storage)
    }
}
