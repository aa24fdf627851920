//! Structured outcomes returned by engine operations.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sync_core::{PassStatus, SyncPassRecord};

/// Outcome of one [`crate::SyncEngine::run_sync`] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncResult {
    /// True iff a pass record with status success or partial was written
    pub success: bool,
    pub synced: u64,
    pub failed: u64,
    pub message: String,
    /// `None` when no pass was attempted (disabled or incomplete configuration)
    pub status: Option<PassStatus>,
}

impl SyncResult {
    pub fn disabled() -> Self {
        Self::not_attempted("sync is disabled")
    }

    pub fn not_attempted(message: impl Into<String>) -> Self {
        Self {
            success: false,
            synced: 0,
            failed: 0,
            message: message.into(),
            status: None,
        }
    }

    /// Result of a pass that wrote a record with `status`.
    pub fn recorded(status: PassStatus, synced: u64, failed: u64, message: String) -> Self {
        Self {
            success: matches!(status, PassStatus::Success | PassStatus::Partial),
            synced,
            failed,
            message,
            status: Some(status),
        }
    }
}

/// Outcome of a connectivity check or schema bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
}

impl OperationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Replication status snapshot for operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub pending: u64,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub enabled: bool,
    pub recent_passes: Vec<SyncPassRecord>,
}
