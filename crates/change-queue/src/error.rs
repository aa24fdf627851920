//! Error types for local store operations.

use thiserror::Error;

/// Errors raised by the local store.
#[derive(Debug, Error)]
pub enum QueueError {
    /// SQLite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Payload serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A thread panicked while holding the store connection.
    #[error("local store lock poisoned")]
    Poisoned,

    /// Stored data could not be interpreted.
    #[error("corrupted data: {0}")]
    Corrupted(String),
}

/// Result type for local store operations.
pub type QueueResult<T> = Result<T, QueueError>;
