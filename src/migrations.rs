//! Versioned schema.
//!
//! Steps are applied in ascending order on open, each in its own transaction
//! together with the version bump. A step is never skipped.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};

/// Database schema version.
///
/// Bump this only together with a new entry in [`MIGRATIONS`].
pub const SCHEMA_VERSION: i64 = 4;

pub(crate) struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

pub(crate) static MIGRATIONS: [Migration; 4] = [
    Migration {
        version: 1,
        description: "pages, supported pages, videos, progress, history",
        sql: r#"
        CREATE TABLE IF NOT EXISTS PageInfo (
          id TEXT NOT NULL,
          isSystem INTEGER NOT NULL,
          name TEXT NOT NULL,
          link TEXT NOT NULL,
          icon TEXT NOT NULL,
          favicon BLOB,
          PRIMARY KEY(link)
        );

        CREATE TABLE IF NOT EXISTS SupportedPage (
          id TEXT NOT NULL,
          name TEXT NOT NULL,
          pattern TEXT NOT NULL,
          PRIMARY KEY(id)
        );

        CREATE TABLE IF NOT EXISTS VideoInfo (
          id TEXT NOT NULL,
          downloadUrls TEXT NOT NULL,
          title TEXT NOT NULL,
          ext TEXT NOT NULL,
          thumbnail TEXT NOT NULL,
          duration INTEGER NOT NULL,
          originalUrl TEXT NOT NULL,
          formats TEXT NOT NULL,
          isRegular INTEGER NOT NULL,
          PRIMARY KEY(id)
        );
        CREATE INDEX IF NOT EXISTS idx_videoinfo_original_url ON VideoInfo(originalUrl);

        CREATE TABLE IF NOT EXISTS ProgressInfo (
          id TEXT NOT NULL,
          downloadId INTEGER NOT NULL,
          videoInfo TEXT NOT NULL,
          bytesDownloaded INTEGER NOT NULL,
          bytesTotal INTEGER NOT NULL,
          downloadStatus INTEGER NOT NULL,
          isLive INTEGER NOT NULL,
          isM3u8 INTEGER NOT NULL,
          fragmentsDownloaded INTEGER NOT NULL,
          fragmentsTotal INTEGER NOT NULL,
          infoLine TEXT NOT NULL,
          PRIMARY KEY(id)
        );

        CREATE TABLE IF NOT EXISTS HistoryItem (
          id TEXT NOT NULL,
          title TEXT,
          url TEXT NOT NULL,
          datetime INTEGER NOT NULL,
          favicon BLOB,
          PRIMARY KEY(id)
        );
        CREATE INDEX IF NOT EXISTS idx_history_datetime ON HistoryItem(datetime);
        "#,
    },
    Migration {
        version: 2,
        description: "ad host block list",
        sql: "CREATE TABLE IF NOT EXISTS AdHost (host TEXT NOT NULL, PRIMARY KEY(host));",
    },
    Migration {
        version: 3,
        description: "64-bit downloaded counter",
        sql: "ALTER TABLE ProgressInfo ADD COLUMN progressDownloaded INTEGER NOT NULL DEFAULT 0;",
    },
    Migration {
        version: 4,
        description: "64-bit total counter",
        sql: "ALTER TABLE ProgressInfo ADD COLUMN progressTotal INTEGER NOT NULL DEFAULT 0;",
    },
];

/// Apply migrations to bring database to current schema.
pub(crate) fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS settings (
          key TEXT PRIMARY KEY,
          value_json TEXT NOT NULL
        );
        "#,
    )?;

    let current_version = current_version(conn)?;

    if current_version > SCHEMA_VERSION {
        log::error!(
            "db schema version {} is newer than supported {}",
            current_version,
            SCHEMA_VERSION
        );
        return Err(StoreError::SchemaTooNew {
            found: current_version,
            supported: SCHEMA_VERSION,
        });
    }

    for step in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        apply(conn, step).map_err(|e| {
            log::error!("migration to v{} failed: {}", step.version, e);
            StoreError::Migration {
                version: step.version,
                source: Box::new(e),
            }
        })?;
        log::info!("migrated db to v{}: {}", step.version, step.description);
    }

    Ok(())
}

fn apply(conn: &mut Connection, step: &Migration) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(step.sql)?;
    set_schema_version(&tx, step.version)?;
    tx.commit()?;
    Ok(())
}

/// Version recorded in `meta`, falling back to `PRAGMA user_version` for files
/// created before the meta table existed.
pub(crate) fn current_version(conn: &Connection) -> Result<i64> {
    let existing: Option<String> = conn
        .query_row(
            r#"SELECT value FROM meta WHERE key = 'schema_version'"#,
            [],
            |r| r.get(0),
        )
        .optional()?;

    if let Some(v) = existing.as_deref().and_then(|s| s.parse::<i64>().ok()) {
        return Ok(v);
    }

    let user_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(user_version)
}

fn set_schema_version(conn: &Connection, v: i64) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO meta(key, value) VALUES('schema_version', ?1)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
        params![v.to_string()],
    )?;
    conn.pragma_update(None, "user_version", v)?;
    Ok(())
}
