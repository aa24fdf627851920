use thiserror::Error;

/// Reasons a captured change cannot be turned into a statement.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("payload id {payload_id} does not match record id {record_id}")]
    IdMismatch { record_id: i64, payload_id: String },

    #[error("update of {table}#{record_id} has no columns to set")]
    EmptyUpdate { table: String, record_id: i64 },

    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
}
