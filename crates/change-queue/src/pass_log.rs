//! Sync pass history.

use chrono::Utc;
use rusqlite::params;
use sync_core::{PassStatus, SyncPassRecord};

use crate::error::QueueResult;
use crate::store::{parse_db, parse_timestamp, LocalStore};

impl LocalStore {
    /// Append one pass record, returning its id.
    pub fn record_pass(
        &self,
        status: PassStatus,
        items_synced: u64,
        items_failed: u64,
        message: &str,
    ) -> QueueResult<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sync_log (status, items_synced, items_failed, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                status.as_str(),
                i64::try_from(items_synced).unwrap_or(i64::MAX),
                i64::try_from(items_failed).unwrap_or(i64::MAX),
                message,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// The `limit` most recent pass records, newest first.
    pub fn recent_passes(&self, limit: usize) -> QueueResult<Vec<SyncPassRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, status, items_synced, items_failed, COALESCE(message, ''), created_at
             FROM sync_log ORDER BY id DESC LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![limit], |row| {
                let status: String = row.get(1)?;
                let synced: i64 = row.get(2)?;
                let failed: i64 = row.get(3)?;
                let created_at: String = row.get(5)?;
                Ok(SyncPassRecord {
                    id: row.get(0)?,
                    status: parse_db(&status, "status")?,
                    items_synced: u64::try_from(synced).unwrap_or(0),
                    items_failed: u64::try_from(failed).unwrap_or(0),
                    message: row.get(4)?,
                    created_at: parse_timestamp(&created_at, "created_at")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
