//! Durable local change queue for pdv-sync
//!
//! Business writes capture every committed mutation into the `sync_queue`
//! table; the sync engine drains it in ascending id order. The same SQLite
//! store also holds the `settings` key/value table (replication config and
//! watermark) and the `sync_log` pass history.
//!
//! Capture is best-effort: [`LocalStore::enqueue`] and [`enqueue_in`] never
//! fail the caller. Consumers only ever flip `synced`, bump `retry_count`
//! and overwrite `last_error`; they never rewrite payloads or delete rows.

mod error;
mod pass_log;
mod queue;
mod schema;
mod settings;
mod store;

pub use error::{QueueError, QueueResult};
pub use queue::{enqueue_in, try_enqueue_in, DEFAULT_BATCH_LIMIT};
pub use schema::{run_migrations, SCHEMA};
pub use store::LocalStore;
