//! MySQL remote connection.

use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, OptsBuilder, Params, Row, SslOpts, Value};
use sync_core::{ColumnValue, ConnectionParams, Dialect};
use tracing::debug;

use crate::connection::{RemoteConnection, RemoteRow, CONNECT_TIMEOUT};
use crate::error::ConnectorError;

/// MySQL value wrapper for conversions to and from [`ColumnValue`].
#[derive(Debug, Clone, PartialEq)]
pub struct MySqlValue(pub Value);

impl MySqlValue {
    pub fn into_inner(self) -> Value {
        self.0
    }

    /// Decode into a column value; dates and times become text.
    pub fn to_column_value(&self) -> ColumnValue {
        match &self.0 {
            Value::NULL => ColumnValue::Null,
            Value::Bytes(bytes) => ColumnValue::Text(String::from_utf8_lossy(bytes).into_owned()),
            Value::Int(i) => ColumnValue::Integer(*i),
            Value::UInt(u) => match i64::try_from(*u) {
                Ok(i) => ColumnValue::Integer(i),
                Err(_) => ColumnValue::Real(*u as f64),
            },
            Value::Float(f) => ColumnValue::Real(f64::from(*f)),
            Value::Double(f) => ColumnValue::Real(*f),
            Value::Date(year, month, day, hour, minute, second, _micros) => ColumnValue::Text(
                format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"),
            ),
            Value::Time(negative, days, hours, minutes, seconds, _micros) => {
                let sign = if *negative { "-" } else { "" };
                let hours = u32::from(*hours) + days * 24;
                ColumnValue::Text(format!("{sign}{hours:02}:{minutes:02}:{seconds:02}"))
            }
        }
    }
}

impl From<&ColumnValue> for MySqlValue {
    fn from(value: &ColumnValue) -> Self {
        match value {
            ColumnValue::Null => MySqlValue(Value::NULL),
            ColumnValue::Bool(b) => MySqlValue(Value::Int(i64::from(*b))),
            ColumnValue::Integer(i) => MySqlValue(Value::Int(*i)),
            ColumnValue::Real(f) => MySqlValue(Value::Double(*f)),
            ColumnValue::Text(s) => MySqlValue(Value::Bytes(s.clone().into_bytes())),
        }
    }
}

/// Handle on one MySQL server session.
pub struct MySqlConnection {
    conn: Option<Conn>,
}

impl MySqlConnection {
    /// Connect within [`CONNECT_TIMEOUT`].
    pub async fn connect(params: &ConnectionParams) -> Result<Self, ConnectorError> {
        let mut opts = OptsBuilder::default()
            .ip_or_hostname(params.host.clone())
            .tcp_port(params.port)
            .db_name(Some(params.database.clone()))
            .user(Some(params.user.clone()))
            .pass(Some(params.password.clone()).filter(|p| !p.is_empty()));

        if params.ssl {
            opts = opts.ssl_opts(
                SslOpts::default()
                    .with_danger_accept_invalid_certs(true)
                    .with_danger_skip_domain_validation(true),
            );
        }

        let conn = tokio::time::timeout(CONNECT_TIMEOUT, Conn::new(opts))
            .await
            .map_err(|_| ConnectorError::Timeout(CONNECT_TIMEOUT))??;

        debug!(
            "Connected to MySQL at {}:{}/{}",
            params.host, params.port, params.database
        );
        Ok(Self { conn: Some(conn) })
    }
}

fn row_from_mysql(row: &Row) -> RemoteRow {
    let columns = row
        .columns_ref()
        .iter()
        .map(|c| c.name_str().into_owned())
        .collect();
    let values = (0..row.len())
        .map(|i| {
            row.as_ref(i)
                .map(|v| MySqlValue(v.clone()).to_column_value())
                .unwrap_or(ColumnValue::Null)
        })
        .collect();
    RemoteRow { columns, values }
}

#[async_trait]
impl RemoteConnection for MySqlConnection {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn execute(
        &mut self,
        sql: &str,
        params: &[ColumnValue],
    ) -> Result<Vec<RemoteRow>, ConnectorError> {
        let conn = self.conn.as_mut().ok_or(ConnectorError::Closed)?;

        let rows: Vec<Row> = if params.is_empty() {
            conn.query(sql).await?
        } else {
            let values = params
                .iter()
                .map(|v| MySqlValue::from(v).into_inner())
                .collect();
            conn.exec(sql, Params::Positional(values)).await?
        };

        Ok(rows.iter().map(row_from_mysql).collect())
    }

    async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.disconnect().await {
                debug!("Ignoring MySQL disconnect error: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_to_mysql() {
        assert_eq!(MySqlValue::from(&ColumnValue::Null).0, Value::NULL);
        assert_eq!(MySqlValue::from(&ColumnValue::Bool(true)).0, Value::Int(1));
        assert_eq!(MySqlValue::from(&ColumnValue::Integer(-4)).0, Value::Int(-4));
        assert_eq!(MySqlValue::from(&ColumnValue::Real(9.99)).0, Value::Double(9.99));
        assert_eq!(
            MySqlValue::from(&ColumnValue::Text("Pão".to_string())).0,
            Value::Bytes("Pão".as_bytes().to_vec())
        );
    }

    #[test]
    fn test_values_from_mysql() {
        assert_eq!(
            MySqlValue(Value::Bytes(b"1".to_vec())).to_column_value(),
            ColumnValue::Text("1".to_string())
        );
        assert_eq!(MySqlValue(Value::UInt(7)).to_column_value(), ColumnValue::Integer(7));
        assert_eq!(
            MySqlValue(Value::UInt(u64::MAX)).to_column_value(),
            ColumnValue::Real(u64::MAX as f64)
        );
        assert_eq!(
            MySqlValue(Value::Date(2024, 3, 1, 9, 5, 0, 0)).to_column_value(),
            ColumnValue::Text("2024-03-01 09:05:00".to_string())
        );
        assert_eq!(
            MySqlValue(Value::Time(true, 1, 2, 3, 4, 0)).to_column_value(),
            ColumnValue::Text("-26:03:04".to_string())
        );
    }

    #[tokio::test]
    async fn test_closed_handle() {
        let mut conn = MySqlConnection { conn: None };
        conn.close().await;
        conn.close().await;
        assert!(matches!(
            conn.execute("SELECT 1", &[]).await,
            Err(ConnectorError::Closed)
        ));
    }
}
