//! Command-line configuration helpers.

mod duration;

pub use duration::{parse_duration_to_secs, parse_interval, MIN_INTERVAL};

use clap::Args;
use sync_core::config::keys;
use sync_core::{ConfigError, Dialect, RemoteSyncConfig, SyncSettings};
use tracing::warn;

/// Remote connection flags.
///
/// Every flag is optional; a given flag replaces the matching stored
/// setting and the rest are kept.
#[derive(Args, Clone, Debug, Default)]
pub struct ConnectionOverrides {
    /// Remote driver (mysql or postgresql)
    #[arg(long, env = "PDV_SYNC_DRIVER")]
    pub driver: Option<String>,

    /// Remote server host
    #[arg(long, env = "PDV_SYNC_HOST")]
    pub host: Option<String>,

    /// Remote server port (defaults to the driver's standard port)
    #[arg(long, env = "PDV_SYNC_PORT")]
    pub port: Option<u16>,

    /// Remote database name
    #[arg(long, env = "PDV_SYNC_DATABASE")]
    pub database: Option<String>,

    /// Remote user
    #[arg(long, env = "PDV_SYNC_USER")]
    pub user: Option<String>,

    /// Remote password
    #[arg(long, env = "PDV_SYNC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Encrypt the connection (the server certificate is not verified)
    #[arg(long, env = "PDV_SYNC_SSL")]
    pub ssl: Option<bool>,
}

impl ConnectionOverrides {
    /// Stored settings with these flags applied.
    ///
    /// An explicit `--driver` replaces an unreadable stored driver, so a bad
    /// `sync_driver` value can be repaired from the command line.
    pub fn resolve(&self, settings: &SyncSettings) -> anyhow::Result<RemoteSyncConfig> {
        let mut config = match (RemoteSyncConfig::from_settings(settings), &self.driver) {
            (Ok(config), _) => config,
            (Err(ConfigError::UnknownDriver(stored)), Some(driver)) => {
                warn!("Replacing unknown stored driver '{stored}' with '{driver}'");
                let mut repaired = settings.clone();
                repaired.insert(keys::DRIVER, driver.as_str());
                RemoteSyncConfig::from_settings(&repaired)?
            }
            (Err(e), _) => return Err(e.into()),
        };
        self.apply(&mut config)?;
        Ok(config)
    }

    /// Apply the given flags on top of `config`.
    ///
    /// Switching driver without an explicit port moves a port that was at
    /// the old driver's default to the new driver's default.
    pub fn apply(&self, config: &mut RemoteSyncConfig) -> anyhow::Result<()> {
        if let Some(driver) = &self.driver {
            let dialect: Dialect = driver.parse()?;
            if self.port.is_none() && config.port == config.driver.default_port() {
                config.port = dialect.default_port();
            }
            config.driver = dialect;
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(password) = &self.password {
            config.password = password.clone();
        }
        if let Some(ssl) = self.ssl {
            config.ssl = ssl;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_keep_unset_fields() {
        let mut config = RemoteSyncConfig {
            host: "stored.local".to_string(),
            database: "pdv".to_string(),
            user: "sync".to_string(),
            ..Default::default()
        };
        let overrides = ConnectionOverrides {
            host: Some("db.local".to_string()),
            ssl: Some(true),
            ..Default::default()
        };
        overrides.apply(&mut config).unwrap();
        assert_eq!(config.host, "db.local");
        assert_eq!(config.database, "pdv");
        assert_eq!(config.user, "sync");
        assert!(config.ssl);
    }

    #[test]
    fn test_driver_switch_moves_default_port() {
        let mut config = RemoteSyncConfig::default();
        let overrides = ConnectionOverrides {
            driver: Some("postgres".to_string()),
            ..Default::default()
        };
        overrides.apply(&mut config).unwrap();
        assert_eq!(config.driver, Dialect::PostgreSql);
        assert_eq!(config.port, 5432);

        let mut custom = RemoteSyncConfig {
            port: 3307,
            ..Default::default()
        };
        overrides.apply(&mut custom).unwrap();
        assert_eq!(custom.port, 3307);
    }

    #[test]
    fn test_driver_flag_repairs_unknown_stored_driver() {
        let settings: SyncSettings = [
            (keys::DRIVER.to_string(), "oracle".to_string()),
            (keys::HOST.to_string(), "db.local".to_string()),
        ]
        .into_iter()
        .collect();

        assert!(ConnectionOverrides::default().resolve(&settings).is_err());

        let overrides = ConnectionOverrides {
            driver: Some("mysql".to_string()),
            ..Default::default()
        };
        let config = overrides.resolve(&settings).unwrap();
        assert_eq!(config.driver, Dialect::MySql);
        assert_eq!(config.port, 3306);
        assert_eq!(config.host, "db.local");
    }

    #[test]
    fn test_unknown_driver_is_rejected() {
        let overrides = ConnectionOverrides {
            driver: Some("oracle".to_string()),
            ..Default::default()
        };
        assert!(overrides.apply(&mut RemoteSyncConfig::default()).is_err());
    }
}
