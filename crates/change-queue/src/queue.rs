//! Change queue operations.

use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use sync_core::{ColumnValue, QueueEntry, RowSnapshot, SyncOperation};
use tracing::{debug, warn};

use crate::error::QueueResult;
use crate::store::{parse_db, parse_timestamp, parse_timestamp_opt, LocalStore};

/// Upper bound on entries fetched per pass.
pub const DEFAULT_BATCH_LIMIT: usize = 500;

const ENTRY_COLUMNS: &str = "id, table_name, operation, record_id, data, synced, retry_count, \
                             last_error, created_at, synced_at";

/// Capture a committed mutation on a borrowed connection.
///
/// Pass the business transaction (a [`rusqlite::Transaction`] derefs to a
/// connection) so capture commits or rolls back with the write it records.
/// Errors are logged and swallowed: capture never fails the caller.
pub fn enqueue_in(
    conn: &Connection,
    table: &str,
    operation: SyncOperation,
    record_id: i64,
    snapshot: &RowSnapshot,
) {
    if let Err(e) = try_enqueue_in(conn, table, operation, record_id, snapshot) {
        warn!("Failed to capture {operation} on {table}#{record_id}: {e}");
    }
}

/// Capture a committed mutation, returning the new entry id.
pub fn try_enqueue_in(
    conn: &Connection,
    table: &str,
    operation: SyncOperation,
    record_id: i64,
    snapshot: &RowSnapshot,
) -> QueueResult<i64> {
    let payload = ColumnValue::encode_snapshot(snapshot)?;
    conn.execute(
        "INSERT INTO sync_queue (table_name, operation, record_id, data, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            table,
            operation.as_str(),
            record_id,
            payload,
            Utc::now().to_rfc3339()
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!("Captured {operation} on {table}#{record_id} as queue entry {id}");
    Ok(id)
}

fn entry_from_row(row: &Row<'_>) -> Result<QueueEntry, rusqlite::Error> {
    let operation: String = row.get(2)?;
    let synced: i64 = row.get(5)?;
    let created_at: String = row.get(8)?;
    let synced_at: Option<String> = row.get(9)?;

    Ok(QueueEntry {
        id: row.get(0)?,
        table: row.get(1)?,
        operation: parse_db(&operation, "operation")?,
        record_id: row.get(3)?,
        payload: row.get(4)?,
        synced: synced != 0,
        retry_count: row.get(6)?,
        last_error: row.get(7)?,
        created_at: parse_timestamp(&created_at, "created_at")?,
        synced_at: parse_timestamp_opt(synced_at, "synced_at")?,
    })
}

impl LocalStore {
    /// Capture a committed mutation; errors are swallowed.
    pub fn enqueue(
        &self,
        table: &str,
        operation: SyncOperation,
        record_id: i64,
        snapshot: &RowSnapshot,
    ) {
        if let Err(e) = self.try_enqueue(table, operation, record_id, snapshot) {
            warn!("Failed to capture {operation} on {table}#{record_id}: {e}");
        }
    }

    /// Capture a committed mutation, returning the new entry id.
    pub fn try_enqueue(
        &self,
        table: &str,
        operation: SyncOperation,
        record_id: i64,
        snapshot: &RowSnapshot,
    ) -> QueueResult<i64> {
        let conn = self.lock()?;
        try_enqueue_in(&conn, table, operation, record_id, snapshot)
    }

    /// Up to `limit` unsynced entries in ascending id order.
    ///
    /// Repeatable: without an intervening `mark_synced` the same entries
    /// come back.
    pub fn pending_batch(&self, limit: usize) -> QueueResult<Vec<QueueEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM sync_queue WHERE synced = 0 ORDER BY id ASC LIMIT ?1"
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let entries = stmt
            .query_map(params![limit], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Flag entries as applied remotely.
    ///
    /// Idempotent: already-synced ids keep their original `synced_at`, and
    /// unknown ids or an empty slice are ignored.
    pub fn mark_synced(&self, ids: &[i64]) -> QueueResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "UPDATE sync_queue SET synced = 1, synced_at = ?
             WHERE synced = 0 AND id IN ({placeholders})"
        );

        let now = Utc::now().to_rfc3339();
        let mut values: Vec<rusqlite::types::Value> = Vec::with_capacity(ids.len() + 1);
        values.push(now.into());
        values.extend(ids.iter().map(|id| rusqlite::types::Value::Integer(*id)));

        let conn = self.lock()?;
        let updated = conn.execute(&sql, params_from_iter(values))?;
        Ok(updated)
    }

    /// Record a failed apply attempt; the entry stays pending.
    pub fn mark_failed(&self, id: i64, error: &str) -> QueueResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE sync_queue SET retry_count = retry_count + 1, last_error = ?1 WHERE id = ?2",
            params![error, id],
        )?;
        Ok(())
    }

    /// Number of entries not yet applied remotely.
    pub fn pending_count(&self) -> QueueResult<u64> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM sync_queue WHERE synced = 0", [], |row| {
                row.get(0)
            })?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Look up one entry by id.
    pub fn entry(&self, id: i64) -> QueueResult<Option<QueueEntry>> {
        let conn = self.lock()?;
        let entry = conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM sync_queue WHERE id = ?1"),
                params![id],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Maintenance: delete every synced entry, returning how many were removed.
    pub fn purge_synced(&self) -> QueueResult<usize> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM sync_queue WHERE synced = 1", [])?;
        debug!("Purged {removed} synced queue entries");
        Ok(removed)
    }
}
