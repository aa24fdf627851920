//! Remote connections for pdv-sync.
//!
//! [`Connector`] opens a [`RemoteConnection`] for a [`ConnectionParams`];
//! [`DriverConnector`] is the production implementation, dispatching on the
//! configured [`Dialect`] to a MySQL or PostgreSQL handle. Callers always
//! write positional `?` placeholders and bind [`ColumnValue`] parameters.
//!
//! Connection establishment is bounded by [`CONNECT_TIMEOUT`]. When SSL is
//! requested the channel is encrypted but the server certificate and host
//! name are not verified.

mod connection;
mod error;
mod mysql;
mod placeholder;
mod postgresql;

pub use connection::{Connector, DriverConnector, RemoteConnection, RemoteRow, CONNECT_TIMEOUT};
pub use error::ConnectorError;
pub use mysql::MySqlConnection;
pub use placeholder::{rewrite_placeholders, PlaceholderStyle};
pub use postgresql::PostgreSqlConnection;

#[doc(no_inline)]
pub use sync_core::{ColumnValue, ConnectionParams, Dialect};
