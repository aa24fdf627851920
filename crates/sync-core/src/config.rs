//! Remote replication configuration.
//!
//! The configuration is persisted as `sync_*` rows in the local settings
//! key/value table and re-read at the start of every pass, so edits take
//! effect on the next tick without a restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Settings keys owned by the replication subsystem.
pub mod keys {
    pub const PREFIX: &str = "sync_";
    pub const ENABLED: &str = "sync_enabled";
    pub const DRIVER: &str = "sync_driver";
    pub const HOST: &str = "sync_host";
    pub const PORT: &str = "sync_port";
    pub const DATABASE: &str = "sync_database";
    pub const USER: &str = "sync_user";
    pub const PASSWORD: &str = "sync_password";
    pub const SSL: &str = "sync_ssl";
    pub const INTERVAL_MINUTES: &str = "sync_interval_minutes";
    pub const LAST_SYNC_AT: &str = "sync_last_at";
}

/// Scheduler period used when the stored interval is missing or invalid.
pub const DEFAULT_INTERVAL_MINUTES: u64 = 5;

/// Errors raised while interpreting replication settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown remote driver '{0}' (expected mysql or postgresql)")]
    UnknownDriver(String),

    #[error("incomplete remote configuration: missing {}", .missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },

    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// Remote SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dialect {
    #[default]
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "postgresql")]
    PostgreSql,
}

impl Dialect {
    /// Settings representation (`mysql`, `postgresql`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::PostgreSql => "postgresql",
        }
    }

    /// Server port used when none is configured.
    pub fn default_port(&self) -> u16 {
        match self {
            Dialect::MySql => 3306,
            Dialect::PostgreSql => 5432,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "mysql" | "mariadb" => Ok(Dialect::MySql),
            "postgresql" | "postgres" | "pg" => Ok(Dialect::PostgreSql),
            other => Err(ConfigError::UnknownDriver(other.to_string())),
        }
    }
}

/// Raw `sync_*` settings as read from the key/value store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSettings(HashMap<String, String>);

impl SyncSettings {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self(values)
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Boolean settings are true only for the literal `true`.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).map(|v| v.trim() == "true").unwrap_or(false)
    }

    /// Whether replication is switched on.
    pub fn is_enabled(&self) -> bool {
        self.flag(keys::ENABLED)
    }

    fn text(&self, key: &str) -> String {
        self.get(key).map(|v| v.trim().to_string()).unwrap_or_default()
    }
}

impl FromIterator<(String, String)> for SyncSettings {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Process-wide replication configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSyncConfig {
    pub enabled: bool,
    pub driver: Dialect,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub ssl: bool,
    pub interval_minutes: u64,
    /// Watermark of the last pass that reached the remote server
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl Default for RemoteSyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            driver: Dialect::MySql,
            host: String::new(),
            port: Dialect::MySql.default_port(),
            database: String::new(),
            user: String::new(),
            password: String::new(),
            ssl: false,
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            last_sync_at: None,
        }
    }
}

impl RemoteSyncConfig {
    /// Interpret stored settings.
    ///
    /// Only an unknown driver is an error; every other malformed value falls
    /// back to its default.
    pub fn from_settings(settings: &SyncSettings) -> Result<Self, ConfigError> {
        let driver: Dialect = settings.text(keys::DRIVER).parse()?;

        let port = settings
            .text(keys::PORT)
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .unwrap_or_else(|| driver.default_port());

        let interval_minutes = settings
            .text(keys::INTERVAL_MINUTES)
            .parse::<u64>()
            .ok()
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_INTERVAL_MINUTES);

        let last_sync_at = DateTime::parse_from_rfc3339(&settings.text(keys::LAST_SYNC_AT))
            .ok()
            .map(|dt| dt.with_timezone(&Utc));

        Ok(Self {
            enabled: settings.is_enabled(),
            driver,
            host: settings.text(keys::HOST),
            port,
            database: settings.text(keys::DATABASE),
            user: settings.text(keys::USER),
            password: settings.get(keys::PASSWORD).unwrap_or_default().to_string(),
            ssl: settings.flag(keys::SSL),
            interval_minutes,
            last_sync_at,
        })
    }

    /// Settings rows describing this configuration, watermark excluded.
    pub fn to_settings(&self) -> Vec<(&'static str, String)> {
        vec![
            (keys::ENABLED, self.enabled.to_string()),
            (keys::DRIVER, self.driver.as_str().to_string()),
            (keys::HOST, self.host.clone()),
            (keys::PORT, self.port.to_string()),
            (keys::DATABASE, self.database.clone()),
            (keys::USER, self.user.clone()),
            (keys::PASSWORD, self.password.clone()),
            (keys::SSL, self.ssl.to_string()),
            (keys::INTERVAL_MINUTES, self.interval_minutes.to_string()),
        ]
    }

    /// Connection parameters, or which required fields are missing.
    pub fn connection_params(&self) -> Result<ConnectionParams, ConfigError> {
        let params = ConnectionParams {
            dialect: self.driver,
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            ssl: self.ssl,
        };
        params.validate()?;
        Ok(params)
    }
}

/// Everything needed to open a remote connection.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub dialect: Dialect,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub ssl: bool,
}

impl ConnectionParams {
    /// Host, database and user are required.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.host.trim().is_empty() {
            missing.push("host");
        }
        if self.database.trim().is_empty() {
            missing.push("database");
        }
        if self.user.trim().is_empty() {
            missing.push("user");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Incomplete { missing })
        }
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("dialect", &self.dialect)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("ssl", &self.ssl)
            .finish()
    }
}
