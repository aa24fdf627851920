//! SQLite-backed local store.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{QueueError, QueueResult};
use crate::schema::run_migrations;

/// Shared handle on the local SQLite store.
///
/// Producers (business writes) and the sync engine share one connection
/// behind a mutex; every operation holds the lock only for its own
/// statements.
pub struct LocalStore {
    conn: Mutex<Connection>,
}

impl LocalStore {
    /// Open the store at the given path, creating and migrating if needed.
    pub fn open(path: &Path) -> QueueResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        run_migrations(&conn)?;

        tracing::debug!("Local store opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> QueueResult<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` inside one local transaction, committing when it returns `Ok`.
    ///
    /// Business writes use this to mutate a row and capture it with
    /// [`crate::enqueue_in`] in the same unit of work.
    pub fn with_transaction<T, E>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<QueueError>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(QueueError::from)?;
        let out = f(&tx)?;
        tx.commit().map_err(QueueError::from)?;
        Ok(out)
    }

    pub(crate) fn lock(&self) -> QueueResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| QueueError::Poisoned)
    }
}

/// Parse a stored timestamp.
///
/// Rows are written as RFC 3339; plain `YYYY-MM-DD HH:MM:SS` text (SQLite's
/// `datetime()` format) is accepted as UTC.
pub(crate) fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(QueueError::Corrupted(format!(
                    "invalid timestamp '{value}' in column '{column}'"
                ))),
            )
        })
}

/// Parse an optional stored timestamp; empty text counts as absent.
pub(crate) fn parse_timestamp_opt(
    value: Option<String>,
    column: &str,
) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_timestamp(s, column).map(Some),
    }
}

/// Parse a string value from the database, returning a rusqlite error on failure.
pub(crate) fn parse_db<T: std::str::FromStr>(
    value: &str,
    column: &str,
) -> Result<T, rusqlite::Error> {
    value.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(QueueError::Corrupted(format!(
                "invalid value '{value}' in column '{column}'"
            ))),
        )
    })
}
