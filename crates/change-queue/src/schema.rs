//! Local schema and migrations.

use rusqlite::{params, Connection};
use sync_core::config::keys;
use sync_core::DEFAULT_INTERVAL_MINUTES;

use crate::error::QueueResult;

/// SQL schema for the replication tables of the local store.
pub const SCHEMA: &str = r#"
-- Key/value settings (replication config lives under sync_*)
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT
);

-- Captured mutations, replayed in id order
CREATE TABLE IF NOT EXISTS sync_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    table_name TEXT NOT NULL,
    operation TEXT NOT NULL CHECK(operation IN ('INSERT','UPDATE','DELETE')),
    record_id INTEGER NOT NULL,
    data TEXT NOT NULL,
    synced INTEGER NOT NULL DEFAULT 0,
    retry_count INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    created_at TEXT NOT NULL,
    synced_at TEXT
);

-- One row per executed sync pass
CREATE TABLE IF NOT EXISTS sync_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    status TEXT NOT NULL CHECK(status IN ('success','error','partial')),
    items_synced INTEGER NOT NULL DEFAULT 0,
    items_failed INTEGER NOT NULL DEFAULT 0,
    message TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sync_queue_pending ON sync_queue(synced, id);
"#;

/// Run schema creation and seed default replication settings.
///
/// Idempotent: existing settings are never overwritten.
pub fn run_migrations(conn: &Connection) -> QueueResult<()> {
    conn.execute_batch(SCHEMA)?;
    seed_default_settings(conn)?;
    Ok(())
}

fn seed_default_settings(conn: &Connection) -> QueueResult<()> {
    let interval = DEFAULT_INTERVAL_MINUTES.to_string();
    let defaults: [(&str, &str); 10] = [
        (keys::ENABLED, "false"),
        (keys::DRIVER, "mysql"),
        (keys::HOST, ""),
        (keys::PORT, ""),
        (keys::DATABASE, ""),
        (keys::USER, ""),
        (keys::PASSWORD, ""),
        (keys::SSL, "false"),
        (keys::INTERVAL_MINUTES, &interval),
        (keys::LAST_SYNC_AT, ""),
    ];

    let mut stmt = conn.prepare("INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)")?;
    for (key, value) in defaults {
        stmt.execute(params![key, value])?;
    }
    Ok(())
}
