//! Settings Manager
//!
//! Small persisted flags the store itself depends on (first-start seeding,
//! block-list population). Values are stored as JSON keyed by setting name.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{CodecError, Result};

/// Settings keys used in the database.
pub mod keys {
    pub const IS_FIRST_START: &str = "is_first_start";
    pub const AD_HOSTS_POPULATED: &str = "ad_hosts_populated";
}

/// Settings manager for reading and writing settings to the database.
pub struct SettingsManager<'a> {
    conn: &'a Connection,
}

impl<'a> SettingsManager<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Get a setting value by key.
    ///
    /// A stored value that no longer deserializes is reported as unset.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let result: Option<String> = self
            .conn
            .query_row(
                "SELECT value_json FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match result {
            Some(json) => match serde_json::from_str(&json) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    log::warn!("setting {} is unreadable, using default: {}", key, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Set a setting value by key.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).map_err(|source| CodecError::Json {
            column: "value_json",
            source,
        })?;

        self.conn.execute(
            "INSERT INTO settings (key, value_json) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
            params![key, json],
        )?;

        Ok(())
    }

    /// Delete a setting by key.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// True until default bookmarks have been seeded once.
    pub fn is_first_start(&self) -> Result<bool> {
        self.get::<bool>(keys::IS_FIRST_START)
            .map(|opt| opt.unwrap_or(true))
    }

    pub fn set_first_start(&self, first_start: bool) -> Result<()> {
        self.set(keys::IS_FIRST_START, &first_start)
    }

    /// Whether a full block list has been loaded into the `AdHost` table.
    pub fn ad_hosts_populated(&self) -> Result<bool> {
        self.get::<bool>(keys::AD_HOSTS_POPULATED)
            .map(|opt| opt.unwrap_or(false))
    }

    pub fn set_ad_hosts_populated(&self, populated: bool) -> Result<()> {
        self.set(keys::AD_HOSTS_POPULATED, &populated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value_json TEXT NOT NULL
            )",
            [],
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_defaults() {
        let conn = setup_test_db();
        let manager = SettingsManager::new(&conn);
        assert!(manager.is_first_start().unwrap());
        assert!(!manager.ad_hosts_populated().unwrap());
    }

    #[test]
    fn test_flags_roundtrip() {
        let conn = setup_test_db();
        let manager = SettingsManager::new(&conn);

        manager.set_first_start(false).unwrap();
        manager.set_ad_hosts_populated(true).unwrap();

        assert!(!manager.is_first_start().unwrap());
        assert!(manager.ad_hosts_populated().unwrap());
    }

    #[test]
    fn test_unreadable_value_falls_back() {
        let conn = setup_test_db();
        conn.execute(
            "INSERT INTO settings (key, value_json) VALUES (?1, 'not json')",
            params![keys::AD_HOSTS_POPULATED],
        )
        .unwrap();

        let manager = SettingsManager::new(&conn);
        assert!(!manager.ad_hosts_populated().unwrap());
    }

    #[test]
    fn test_delete_setting() {
        let conn = setup_test_db();
        let manager = SettingsManager::new(&conn);

        manager.set_first_start(false).unwrap();
        manager.delete(keys::IS_FIRST_START).unwrap();
        assert!(manager.is_first_start().unwrap());
    }
}
