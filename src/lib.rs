//! pdv-sync
//!
//! Offline-first replication of a local point-of-sale store to a remote
//! MySQL or PostgreSQL database.
//!
//! Business writes commit locally and capture each mutation into a durable
//! queue (see the `change-queue` crate). The [`SyncEngine`] drains that queue
//! in ascending order, turning each entry into an idempotent remote
//! statement, and the [`AutoSyncScheduler`] runs passes on a timer. The
//! remote side is a one-way mirror: inserts overwrite every column on
//! conflict and deletes become `active = 0`.
//!
//! # CLI Usage
//!
//! ```bash
//! # Point the local store at a remote PostgreSQL server and turn sync on
//! pdv-sync configure --enabled true --driver postgresql \
//!   --host db.example.com --database pdv --user sync --password secret
//!
//! # Create the mirrored tables once
//! pdv-sync init-schema
//!
//! # One manual pass, then the queue status
//! pdv-sync run
//! pdv-sync status --recent 5
//!
//! # Keep syncing every 5 minutes until Ctrl-C
//! pdv-sync daemon --interval 5m
//! ```

pub mod config;
pub mod engine;
pub mod report;
pub mod scheduler;
pub mod testing;

pub use config::ConnectionOverrides;
pub use engine::SyncEngine;
pub use report::{OperationResult, SyncResult, SyncStatus};
pub use scheduler::AutoSyncScheduler;
