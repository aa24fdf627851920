use std::time::Duration;
use sync_core::ConfigError;
use thiserror::Error;

/// Errors raised while talking to a remote server.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    #[error("PostgreSQL error: {0}")]
    PostgreSql(#[from] tokio_postgres::Error),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("connection is closed")]
    Closed,

    #[error(transparent)]
    Config(#[from] ConfigError),
}
