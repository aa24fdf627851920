//! Test support: an in-process [`Connector`] that records what it executes.
//!
//! The stub can be scripted to refuse connections, fail every statement, or
//! fail only statements binding a given text value, which lets tests drive
//! the engine through success, partial and error passes without a server.

use async_trait::async_trait;
use remote_connector::{ColumnValue, ConnectionParams, Connector, ConnectorError, Dialect};
use remote_connector::{RemoteConnection, RemoteRow};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

/// One statement received by a stub connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub dialect: Dialect,
    pub sql: String,
    pub params: Vec<ColumnValue>,
}

#[derive(Debug, Default)]
struct StubState {
    refuse_connect: bool,
    fail_all: bool,
    poison: Vec<String>,
    connects: usize,
    closes: usize,
    executed: Vec<ExecutedStatement>,
}

/// Scriptable connector; clones share the same script and log.
#[derive(Debug, Clone, Default)]
pub struct StubConnector {
    state: Arc<Mutex<StubState>>,
}

impl StubConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StubState> {
        lock(&self.state)
    }

    /// Make every connection attempt fail.
    pub fn refuse_connections(&self, refuse: bool) {
        self.state().refuse_connect = refuse;
    }

    /// Make every statement fail.
    pub fn fail_all(&self, fail: bool) {
        self.state().fail_all = fail;
    }

    /// Fail any statement that binds this exact text value.
    pub fn poison(&self, text: impl Into<String>) {
        self.state().poison.push(text.into());
    }

    pub fn connects(&self) -> usize {
        self.state().connects
    }

    pub fn closes(&self) -> usize {
        self.state().closes
    }

    /// Statements that executed successfully, in order.
    pub fn executed(&self) -> Vec<ExecutedStatement> {
        self.state().executed.clone()
    }
}

fn lock(state: &Mutex<StubState>) -> MutexGuard<'_, StubState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Connector for StubConnector {
    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> Result<Box<dyn RemoteConnection>, ConnectorError> {
        params.validate()?;
        let mut state = self.state();
        state.connects += 1;
        if state.refuse_connect {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("{}:{} refused the connection", params.host, params.port),
            )
            .into());
        }
        Ok(Box::new(StubConnection {
            dialect: params.dialect,
            state: Arc::clone(&self.state),
            open: true,
        }))
    }
}

struct StubConnection {
    dialect: Dialect,
    state: Arc<Mutex<StubState>>,
    open: bool,
}

#[async_trait]
impl RemoteConnection for StubConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn execute(
        &mut self,
        sql: &str,
        params: &[ColumnValue],
    ) -> Result<Vec<RemoteRow>, ConnectorError> {
        if !self.open {
            return Err(ConnectorError::Closed);
        }
        let mut state = lock(&self.state);
        let poisoned = params.iter().any(|p| match p {
            ColumnValue::Text(text) => state.poison.iter().any(|bad| bad == text),
            _ => false,
        });
        if state.fail_all || poisoned {
            return Err(io::Error::other(format!("remote rejected statement: {sql}")).into());
        }
        state.executed.push(ExecutedStatement {
            dialect: self.dialect,
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        Ok(Vec::new())
    }

    async fn close(&mut self) {
        if self.open {
            self.open = false;
            lock(&self.state).closes += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ConnectionParams {
        ConnectionParams {
            dialect: Dialect::PostgreSql,
            host: "stub".to_string(),
            port: 5432,
            database: "pdv".to_string(),
            user: "sync".to_string(),
            password: String::new(),
            ssl: false,
        }
    }

    #[tokio::test]
    async fn test_stub_records_and_fails_on_script() {
        let stub = StubConnector::new();
        stub.poison("bad");
        let mut conn = stub.connect(&params()).await.unwrap();
        assert_eq!(conn.dialect(), Dialect::PostgreSql);

        conn.execute("SELECT 1", &[]).await.unwrap();
        assert!(conn
            .execute("UPDATE t SET name = ? WHERE id = ?", &["bad".into(), 1i64.into()])
            .await
            .is_err());

        conn.close().await;
        conn.close().await;
        assert_eq!(stub.executed().len(), 1);
        assert_eq!(stub.connects(), 1);
        assert_eq!(stub.closes(), 1);
    }

    #[tokio::test]
    async fn test_stub_refuses_connections() {
        let stub = StubConnector::new();
        stub.refuse_connections(true);
        let err = stub.connect(&params()).await.err().unwrap();
        assert!(matches!(err, ConnectorError::Io(_)));
    }
}
