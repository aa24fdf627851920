//! PostgreSQL remote connection.
//!
//! PostgreSQL infers a type for every `$n` parameter and rejects values
//! whose Rust type does not match it, so parameters are bound through
//! [`PgParam`], which encodes a [`ColumnValue`] according to the inferred
//! type rather than its own.

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use postgres_native_tls::MakeTlsConnector;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::error::Error;
use std::future::Future;
use sync_core::{ColumnValue, ConnectionParams, Dialect};
use tokio_postgres::config::SslMode;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type, WrongType};
use tokio_postgres::{Client, Config, NoTls, Row};
use tracing::debug;

use crate::connection::{RemoteConnection, RemoteRow, CONNECT_TIMEOUT};
use crate::error::ConnectorError;
use crate::placeholder::{rewrite_placeholders, PlaceholderStyle};

type BoxError = Box<dyn Error + Sync + Send>;

fn is_text(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

fn encode_int(value: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(value)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql(ty, out),
        Type::INT8 => value.to_sql(ty, out),
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::FLOAT8 => (value as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(value).to_sql(ty, out),
        Type::BOOL => (value != 0).to_sql(ty, out),
        _ => value.to_string().as_str().to_sql(ty, out),
    }
}

fn encode_real(value: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::FLOAT8 => value.to_sql(ty, out),
        Type::NUMERIC => Decimal::try_from(value)?.to_sql(ty, out),
        Type::INT2 | Type::INT4 | Type::INT8 if value.is_finite() && value.fract() == 0.0 => {
            encode_int(value as i64, ty, out)
        }
        _ if is_text(ty) => value.to_string().as_str().to_sql(ty, out),
        _ => Err(format!("cannot bind {value} as {ty}").into()),
    }
}

fn encode_text(value: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 | Type::INT4 | Type::INT8 => encode_int(value.trim().parse()?, ty, out),
        Type::FLOAT4 | Type::FLOAT8 | Type::NUMERIC => encode_real(value.trim().parse()?, ty, out),
        Type::BOOL => value.trim().parse::<bool>()?.to_sql(ty, out),
        _ => value.to_sql(ty, out),
    }
}

/// A [`ColumnValue`] bound as a PostgreSQL parameter.
#[derive(Debug)]
pub struct PgParam<'a>(pub &'a ColumnValue);

impl ToSql for PgParam<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self.0 {
            ColumnValue::Null => Ok(IsNull::Yes),
            ColumnValue::Bool(b) if *ty == Type::BOOL => b.to_sql(ty, out),
            ColumnValue::Bool(b) if is_text(ty) => b.to_string().as_str().to_sql(ty, out),
            ColumnValue::Bool(b) => encode_int(i64::from(*b), ty, out),
            ColumnValue::Integer(i) => encode_int(*i, ty, out),
            ColumnValue::Real(f) => encode_real(*f, ty, out),
            ColumnValue::Text(s) => encode_text(s, ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::BOOL
                | Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::NUMERIC
        ) || is_text(ty)
    }

    /// NULL binds into a column of any type.
    fn to_sql_checked(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        if self.0.is_null() {
            return Ok(IsNull::Yes);
        }
        if !<Self as ToSql>::accepts(ty) {
            return Err(Box::new(WrongType::new::<Self>(ty.clone())));
        }
        self.to_sql(ty, out)
    }
}

/// A result column decoded into a [`ColumnValue`].
///
/// Temporal values become text; types with no scalar mapping decode as NULL.
#[derive(Debug, Clone, PartialEq)]
pub struct PgValue(pub ColumnValue);

impl<'a> FromSql<'a> for PgValue {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let value = match *ty {
            Type::BOOL => ColumnValue::Bool(bool::from_sql(ty, raw)?),
            Type::INT2 => ColumnValue::Integer(i16::from_sql(ty, raw)?.into()),
            Type::INT4 => ColumnValue::Integer(i32::from_sql(ty, raw)?.into()),
            Type::INT8 => ColumnValue::Integer(i64::from_sql(ty, raw)?),
            Type::FLOAT4 => ColumnValue::Real(f32::from_sql(ty, raw)?.into()),
            Type::FLOAT8 => ColumnValue::Real(f64::from_sql(ty, raw)?),
            Type::NUMERIC => {
                let decimal = Decimal::from_sql(ty, raw)?;
                decimal
                    .to_f64()
                    .map(ColumnValue::Real)
                    .unwrap_or_else(|| ColumnValue::Text(decimal.to_string()))
            }
            Type::DATE => ColumnValue::Text(NaiveDate::from_sql(ty, raw)?.to_string()),
            Type::TIMESTAMP => ColumnValue::Text(
                NaiveDateTime::from_sql(ty, raw)?
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
            ),
            Type::TIMESTAMPTZ => {
                ColumnValue::Text(DateTime::<Utc>::from_sql(ty, raw)?.to_rfc3339())
            }
            _ if is_text(ty) => ColumnValue::Text(String::from_sql(ty, raw)?),
            _ => {
                debug!("Decoding PostgreSQL column of type {ty} as NULL");
                ColumnValue::Null
            }
        };
        Ok(PgValue(value))
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(PgValue(ColumnValue::Null))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Handle on one PostgreSQL server session.
pub struct PostgreSqlConnection {
    client: Option<Client>,
}

async fn with_connect_timeout<T>(
    connect: impl Future<Output = Result<T, tokio_postgres::Error>>,
) -> Result<T, ConnectorError> {
    tokio::time::timeout(CONNECT_TIMEOUT, connect)
        .await
        .map_err(|_| ConnectorError::Timeout(CONNECT_TIMEOUT))?
        .map_err(ConnectorError::from)
}

async fn drive_connection(connection: impl Future<Output = Result<(), tokio_postgres::Error>>) {
    if let Err(e) = connection.await {
        log::error!("PostgreSQL connection error: {e}");
    }
}

impl PostgreSqlConnection {
    /// Connect within [`CONNECT_TIMEOUT`].
    pub async fn connect(params: &ConnectionParams) -> Result<Self, ConnectorError> {
        let mut config = Config::new();
        config
            .host(&params.host)
            .port(params.port)
            .dbname(&params.database)
            .user(&params.user)
            .connect_timeout(CONNECT_TIMEOUT);
        if !params.password.is_empty() {
            config.password(&params.password);
        }

        // Spawn connection handler
        let client = if params.ssl {
            config.ssl_mode(SslMode::Require);
            let tls = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()?;
            let (client, connection) =
                with_connect_timeout(config.connect(MakeTlsConnector::new(tls))).await?;
            tokio::spawn(drive_connection(connection));
            client
        } else {
            let (client, connection) = with_connect_timeout(config.connect(NoTls)).await?;
            tokio::spawn(drive_connection(connection));
            client
        };

        debug!(
            "Connected to PostgreSQL at {}:{}/{}",
            params.host, params.port, params.database
        );
        Ok(Self {
            client: Some(client),
        })
    }
}

fn row_from_pg(row: &Row) -> Result<RemoteRow, ConnectorError> {
    let columns = row.columns().iter().map(|c| c.name().to_string()).collect();
    let values = (0..row.len())
        .map(|i| row.try_get::<_, PgValue>(i).map(|v| v.0))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RemoteRow { columns, values })
}

#[async_trait]
impl RemoteConnection for PostgreSqlConnection {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSql
    }

    async fn execute(
        &mut self,
        sql: &str,
        params: &[ColumnValue],
    ) -> Result<Vec<RemoteRow>, ConnectorError> {
        let client = self.client.as_ref().ok_or(ConnectorError::Closed)?;
        let sql = rewrite_placeholders(sql, PlaceholderStyle::Numbered);

        let bound: Vec<PgParam<'_>> = params.iter().map(PgParam).collect();
        let param_refs: Vec<&(dyn ToSql + Sync)> = bound
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect();

        let rows = client.query(&*sql, &param_refs).await?;
        rows.iter().map(row_from_pg).collect()
    }

    async fn close(&mut self) {
        if self.client.take().is_some() {
            debug!("Closed PostgreSQL connection");
        }
    }
}
