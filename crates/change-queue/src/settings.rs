//! Settings key/value access.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use sync_core::config::keys;
use sync_core::{RemoteSyncConfig, SyncSettings};

use crate::error::QueueResult;
use crate::store::LocalStore;

impl LocalStore {
    /// Read one setting; `None` when the key is absent or its value is NULL.
    pub fn get_setting(&self, key: &str) -> QueueResult<Option<String>> {
        let conn = self.lock()?;
        let value: Option<Option<String>> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.flatten())
    }

    /// Insert or overwrite one setting.
    pub fn set_setting(&self, key: &str, value: &str) -> QueueResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Every `sync_*` setting.
    pub fn sync_settings(&self) -> QueueResult<SyncSettings> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT key, COALESCE(value, '') FROM settings WHERE substr(key, 1, length(?1)) = ?1",
        )?;
        let settings = stmt
            .query_map(params![keys::PREFIX], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<SyncSettings, _>>()?;
        Ok(settings)
    }

    /// Persist a whole replication configuration in one transaction.
    ///
    /// The watermark is left alone.
    pub fn save_sync_config(&self, config: &RemoteSyncConfig) -> QueueResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            )?;
            for (key, value) in config.to_settings() {
                stmt.execute(params![key, value])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Move the watermark to `at`.
    pub fn set_last_sync_at(&self, at: DateTime<Utc>) -> QueueResult<()> {
        self.set_setting(keys::LAST_SYNC_AT, &at.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::Dialect;

    #[test]
    fn test_defaults_are_seeded() {
        let store = LocalStore::open_in_memory().unwrap();
        let settings = store.sync_settings().unwrap();
        assert_eq!(settings.get(keys::ENABLED), Some("false"));
        assert_eq!(settings.get(keys::DRIVER), Some("mysql"));
        assert_eq!(settings.get(keys::INTERVAL_MINUTES), Some("5"));
        assert_eq!(settings.get(keys::LAST_SYNC_AT), Some(""));
    }

    #[test]
    fn test_sync_settings_skip_other_keys() {
        let store = LocalStore::open_in_memory().unwrap();
        store.set_setting("store_name", "Minha Loja").unwrap();
        store.set_setting("syncing", "nope").unwrap();
        let settings = store.sync_settings().unwrap();
        assert_eq!(settings.get("store_name"), None);
        assert_eq!(settings.get("syncing"), None);
    }

    #[test]
    fn test_set_setting_overwrites() {
        let store = LocalStore::open_in_memory().unwrap();
        store.set_setting(keys::HOST, "a.local").unwrap();
        store.set_setting(keys::HOST, "b.local").unwrap();
        assert_eq!(
            store.get_setting(keys::HOST).unwrap().as_deref(),
            Some("b.local")
        );
        assert_eq!(store.get_setting("missing").unwrap(), None);
    }

    #[test]
    fn test_save_config_keeps_watermark() {
        let store = LocalStore::open_in_memory().unwrap();
        let at = DateTime::parse_from_rfc3339("2024-06-01T08:00:00+00:00")
            .unwrap()
            .with_timezone(&Utc);
        store.set_last_sync_at(at).unwrap();

        let config = RemoteSyncConfig {
            enabled: true,
            driver: Dialect::PostgreSql,
            host: "db.local".into(),
            port: 5432,
            database: "pdv".into(),
            user: "sync".into(),
            password: "pw".into(),
            ssl: false,
            interval_minutes: 10,
            last_sync_at: None,
        };
        store.save_sync_config(&config).unwrap();

        let loaded = RemoteSyncConfig::from_settings(&store.sync_settings().unwrap()).unwrap();
        assert_eq!(loaded.last_sync_at, Some(at));
        assert_eq!(
            RemoteSyncConfig {
                last_sync_at: None,
                ..loaded
            },
            config
        );
    }
}
