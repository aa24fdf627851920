//! Core types for the pdv-sync replication subsystem.
//!
//! This crate provides the foundational types shared by the queue, the
//! statement builder, the remote connector and the sync engine:
//!
//! - [`ColumnValue`] / [`RowSnapshot`] - Scalar column values and row snapshots
//! - [`SyncOperation`] / [`QueueEntry`] - Captured local mutations
//! - [`PassStatus`] / [`SyncPassRecord`] - Outcome of one sync pass
//! - [`Dialect`] / [`RemoteSyncConfig`] / [`ConnectionParams`] - Remote target configuration
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── change-queue       (persists QueueEntry / SyncPassRecord / settings)
//!    ├─── statement-builder  (RowChange + Dialect -> SQL)
//!    ├─── remote-connector   (ConnectionParams -> live connection)
//!    └─── pdv-sync           (engine + scheduler)
//! ```

pub mod config;
pub mod queue;
pub mod values;

pub use config::{
    ConfigError, ConnectionParams, Dialect, RemoteSyncConfig, SyncSettings,
    DEFAULT_INTERVAL_MINUTES,
};
pub use queue::{PassStatus, QueueEntry, SyncOperation, SyncPassRecord};
pub use values::{ColumnValue, RowSnapshot};
