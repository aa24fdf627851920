//! Sync engine: drains the local change queue into the remote database.
//!
//! A pass reads the replication settings, connects, replays a bounded batch
//! of pending entries in ascending id order and records the outcome in the
//! pass log. Per-item failures are recorded on the entry and never abort the
//! batch; entries stay pending until they apply, so retry is unbounded.

use anyhow::Context;
use change_queue::{LocalStore, QueueError, DEFAULT_BATCH_LIMIT};
use chrono::{DateTime, Utc};
use remote_connector::{Connector, DriverConnector, RemoteConnection};
use statement_builder::{build_statement, create_statements, RowChange};
use std::sync::Arc;
use sync_core::config::keys;
use sync_core::{PassStatus, QueueEntry, RemoteSyncConfig};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::report::{OperationResult, SyncResult, SyncStatus};

/// Applied entries between progress log lines.
const PROGRESS_EVERY: u64 = 100;

/// Replays captured local mutations against the configured remote server.
pub struct SyncEngine<C: Connector = DriverConnector> {
    store: Arc<LocalStore>,
    connector: C,
    batch_limit: usize,
    pass_lock: Mutex<()>,
}

impl SyncEngine<DriverConnector> {
    /// Engine using the real MySQL / PostgreSQL drivers.
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self::with_connector(store, DriverConnector)
    }
}

impl<C: Connector> SyncEngine<C> {
    pub fn with_connector(store: Arc<LocalStore>, connector: C) -> Self {
        Self {
            store,
            connector,
            batch_limit: DEFAULT_BATCH_LIMIT,
            pass_lock: Mutex::new(()),
        }
    }

    /// Maximum number of entries replayed per pass.
    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit.max(1);
        self
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run one sync pass.
    ///
    /// Passes are serialized: a manual call made while the timer's pass is
    /// running waits for it to finish.
    pub async fn run_sync(&self) -> SyncResult {
        let _pass = self.pass_lock.lock().await;

        let settings = match self.store.sync_settings() {
            Ok(settings) => settings,
            Err(e) => {
                error!("Failed to read sync settings: {e}");
                return SyncResult::not_attempted(format!("failed to read settings: {e}"));
            }
        };
        if !settings.is_enabled() {
            debug!("Sync is disabled, skipping pass");
            return SyncResult::disabled();
        }

        let params = match RemoteSyncConfig::from_settings(&settings)
            .and_then(|config| config.connection_params())
        {
            Ok(params) => params,
            Err(e) => {
                warn!("Sync pass skipped: {e}");
                return SyncResult::not_attempted(e.to_string());
            }
        };

        info!(
            "Starting sync pass against {} at {}:{}/{}",
            params.dialect, params.host, params.port, params.database
        );

        let mut conn = match self.connector.connect(&params).await {
            Ok(conn) => conn,
            Err(e) => {
                let message = format!("connection failed: {e}");
                warn!("Sync pass aborted: {message}");
                return self.finish(PassStatus::Error, 0, 0, message, false);
            }
        };

        let result = self.drain(conn.as_mut()).await;
        conn.close().await;
        result
    }

    async fn drain(&self, conn: &mut dyn RemoteConnection) -> SyncResult {
        let batch = match self.store.pending_batch(self.batch_limit) {
            Ok(batch) => batch,
            Err(e) => {
                let message = format!("failed to read change queue: {e}");
                error!("{message}");
                return self.finish(PassStatus::Error, 0, 0, message, false);
            }
        };
        info!("Fetched {} pending entries", batch.len());

        let mut synced = 0u64;
        let mut failed = 0u64;
        for entry in &batch {
            match apply(conn, entry).await {
                Ok(()) => match self.store.mark_synced(&[entry.id]) {
                    Ok(_) => {
                        synced += 1;
                        if synced % PROGRESS_EVERY == 0 {
                            info!("Applied {synced} of {} entries", batch.len());
                        }
                    }
                    Err(e) => {
                        error!("Entry {} applied but could not be marked synced: {e}", entry.id);
                        failed += 1;
                    }
                },
                Err(e) => {
                    let message = format!("{e:#}");
                    warn!(
                        "Failed to apply entry {} ({} {} #{}): {message}",
                        entry.id, entry.operation, entry.table, entry.record_id
                    );
                    if let Err(mark_err) = self.store.mark_failed(entry.id, &message) {
                        error!("Failed to record failure of entry {}: {mark_err}", entry.id);
                    }
                    failed += 1;
                }
            }
        }

        let status = PassStatus::from_counts(synced, failed);
        let message = format!("{synced} synced, {failed} failed");
        info!("Sync pass finished ({status}): {message}");
        self.finish(status, synced, failed, message, true)
    }

    /// Write the pass record and, once connected, advance the watermark.
    fn finish(
        &self,
        status: PassStatus,
        synced: u64,
        failed: u64,
        message: String,
        connected: bool,
    ) -> SyncResult {
        if let Err(e) = self.store.record_pass(status, synced, failed, &message) {
            error!("Failed to record sync pass: {e}");
        }
        if connected {
            if let Err(e) = self.store.set_last_sync_at(Utc::now()) {
                error!("Failed to update last sync time: {e}");
            }
        }
        SyncResult::recorded(status, synced, failed, message)
    }

    /// Check that the remote server is reachable with `config`.
    pub async fn test_connection(&self, config: &RemoteSyncConfig) -> OperationResult {
        let params = match config.connection_params() {
            Ok(params) => params,
            Err(e) => return OperationResult::failed(e.to_string()),
        };
        let mut conn = match self.connector.connect(&params).await {
            Ok(conn) => conn,
            Err(e) => return OperationResult::failed(format!("connection failed: {e}")),
        };
        let result = match conn.execute("SELECT 1", &[]).await {
            Ok(_) => OperationResult::ok(format!(
                "connected to {} at {}:{}",
                params.dialect, params.host, params.port
            )),
            Err(e) => OperationResult::failed(format!("query failed: {e}")),
        };
        conn.close().await;
        result
    }

    /// Create every mirrored table on the remote server if missing.
    pub async fn init_remote_schema(&self, config: &RemoteSyncConfig) -> OperationResult {
        let params = match config.connection_params() {
            Ok(params) => params,
            Err(e) => return OperationResult::failed(e.to_string()),
        };
        let mut conn = match self.connector.connect(&params).await {
            Ok(conn) => conn,
            Err(e) => return OperationResult::failed(format!("connection failed: {e}")),
        };

        let statements = create_statements(conn.dialect());
        let mut result = OperationResult::ok(format!(
            "remote schema ready ({} tables)",
            statements.len()
        ));
        for sql in &statements {
            debug!("Executing DDL: {sql}");
            if let Err(e) = conn.execute(sql, &[]).await {
                result = OperationResult::failed(format!("schema creation failed: {e}"));
                break;
            }
        }
        conn.close().await;
        result
    }

    /// Pending count, watermark, enabled flag and the `recent` latest passes.
    pub fn status(&self, recent: usize) -> Result<SyncStatus, QueueError> {
        let settings = self.store.sync_settings()?;
        let last_sync_at = settings
            .get(keys::LAST_SYNC_AT)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
            .map(|dt| dt.with_timezone(&Utc));
        Ok(SyncStatus {
            pending: self.store.pending_count()?,
            last_sync_at,
            enabled: settings.is_enabled(),
            recent_passes: self.store.recent_passes(recent)?,
        })
    }

    /// Delete entries that have already been replicated.
    pub fn clear_synced(&self) -> Result<usize, QueueError> {
        let removed = self.store.purge_synced()?;
        info!("Purged {removed} synced queue entries");
        Ok(removed)
    }
}

async fn apply(conn: &mut dyn RemoteConnection, entry: &QueueEntry) -> anyhow::Result<()> {
    let change = RowChange::from_entry(entry).context("invalid payload")?;
    let statement = build_statement(conn.dialect(), &change)?;
    conn.execute(&statement.sql, &statement.params)
        .await
        .context("remote execution failed")?;
    Ok(())
}
