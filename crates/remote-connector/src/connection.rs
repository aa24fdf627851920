use async_trait::async_trait;
use std::time::Duration;
use sync_core::{ColumnValue, ConnectionParams, Dialect};

use crate::error::ConnectorError;
use crate::mysql::MySqlConnection;
use crate::placeholder::PlaceholderStyle;
use crate::postgresql::PostgreSqlConnection;

/// Upper bound on connection establishment.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One result row: column names and their decoded values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteRow {
    pub columns: Vec<String>,
    pub values: Vec<ColumnValue>,
}

impl RemoteRow {
    /// Value of the named column.
    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }
}

/// An open handle on a remote server.
#[async_trait]
pub trait RemoteConnection: Send {
    fn dialect(&self) -> Dialect;

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::for_dialect(self.dialect())
    }

    /// Execute one statement written with `?` placeholders.
    async fn execute(
        &mut self,
        sql: &str,
        params: &[ColumnValue],
    ) -> Result<Vec<RemoteRow>, ConnectorError>;

    /// Release the connection.
    ///
    /// Never fails; safe to call more than once or on a handle whose
    /// connection was never fully established.
    async fn close(&mut self);
}

/// Opens remote connections.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> Result<Box<dyn RemoteConnection>, ConnectorError>;
}

/// Connector backed by the real MySQL and PostgreSQL drivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverConnector;

#[async_trait]
impl Connector for DriverConnector {
    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> Result<Box<dyn RemoteConnection>, ConnectorError> {
        params.validate()?;
        match params.dialect {
            Dialect::MySql => Ok(Box::new(MySqlConnection::connect(params).await?)),
            Dialect::PostgreSql => Ok(Box::new(PostgreSqlConnection::connect(params).await?)),
        }
    }
}
