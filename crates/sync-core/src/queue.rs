//! Queue entries and pass records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;
use crate::values::{ColumnValue, RowSnapshot};

/// Kind of captured mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncOperation {
    Insert,
    Update,
    Delete,
}

impl SyncOperation {
    /// Storage representation (`INSERT`, `UPDATE`, `DELETE`).
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperation::Insert => "INSERT",
            SyncOperation::Update => "UPDATE",
            SyncOperation::Delete => "DELETE",
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncOperation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INSERT" => Ok(SyncOperation::Insert),
            "UPDATE" => Ok(SyncOperation::Update),
            "DELETE" => Ok(SyncOperation::Delete),
            _ => Err(ConfigError::InvalidValue {
                key: "operation".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// One captured local mutation awaiting (or done with) remote replication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Sequence number; replay order is ascending id
    pub id: i64,
    /// Local table the mutation touched
    pub table: String,
    pub operation: SyncOperation,
    /// Primary key of the affected row in the local store
    pub record_id: i64,
    /// Serialized [`RowSnapshot`] of the row after the mutation
    pub payload: String,
    pub synced: bool,
    /// Failed apply attempts so far; never capped
    pub retry_count: i64,
    /// Most recent apply failure, overwritten on each failure
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl QueueEntry {
    /// Decode the payload into a row snapshot.
    pub fn snapshot(&self) -> serde_json::Result<RowSnapshot> {
        ColumnValue::decode_snapshot(&self.payload)
    }
}

/// Terminal state of a sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassStatus {
    /// No item failed
    Success,
    /// At least one item applied and at least one failed
    Partial,
    /// The pass could not connect, or nothing it attempted applied
    Error,
}

impl PassStatus {
    /// Status of a pass that connected and attempted `synced + failed` items.
    pub fn from_counts(synced: u64, failed: u64) -> Self {
        if failed == 0 {
            PassStatus::Success
        } else if synced > 0 {
            PassStatus::Partial
        } else {
            PassStatus::Error
        }
    }

    /// Storage representation (`success`, `partial`, `error`).
    pub fn as_str(&self) -> &'static str {
        match self {
            PassStatus::Success => "success",
            PassStatus::Partial => "partial",
            PassStatus::Error => "error",
        }
    }
}

impl fmt::Display for PassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PassStatus {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(PassStatus::Success),
            "partial" => Ok(PassStatus::Partial),
            "error" => Ok(PassStatus::Error),
            _ => Err(ConfigError::InvalidValue {
                key: "status".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Persisted outcome of one executed sync pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPassRecord {
    pub id: i64,
    pub status: PassStatus,
    pub items_synced: u64,
    pub items_failed: u64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
