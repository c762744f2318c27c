use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::config::StoreConfig;
use crate::dao::{AdHostDao, HistoryDao, PageDao, ProgressDao, SupportedPageDao, VideoDao};
use crate::error::Result;
use crate::events::{ChangeNotifier, Subscription, Table};
use crate::migrations;
use crate::settings::SettingsManager;

/// Database handle wrapper.
///
/// Notes:
/// - `rusqlite::Connection` is `Send` but not `Sync`. Share the handle across
///   tasks as a [`SharedDb`] and keep each lock short.
/// - Access objects borrow the connection; obtain them per call
///   (`db.history().clear()`).
pub struct Db {
    conn: Connection,
    path: Option<PathBuf>,
    notifier: ChangeNotifier,
}

/// Handle shared by background pipelines (downloads, detection, UI streams).
pub type SharedDb = Arc<Mutex<Db>>;

impl Db {
    /// Open (or create) the database at `path` and apply migrations.
    pub fn open(path: &Path, config: &StoreConfig) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self::init(conn, Some(path.to_path_buf()), config, true)?;
        log::info!("opened store at {}", path.display());
        Ok(db)
    }

    /// Open the database at the configured per-user location.
    pub fn open_default(config: &StoreConfig) -> anyhow::Result<Self> {
        let path = config.resolve_db_path()?;
        Self::open(&path, config).with_context(|| format!("open sqlite db: {}", path.display()))
    }

    /// Private in-memory database with default settings.
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with(&StoreConfig::default())
    }

    pub fn open_in_memory_with(config: &StoreConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, None, config, false)
    }

    fn init(
        mut conn: Connection,
        path: Option<PathBuf>,
        config: &StoreConfig,
        on_disk: bool,
    ) -> Result<Self> {
        if on_disk {
            conn.pragma_update(None, "journal_mode", &config.journal_mode)?;
            conn.pragma_update(None, "synchronous", &config.synchronous)?;
        }
        let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
        conn.pragma_update(None, "foreign_keys", foreign_keys)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;

        migrations::migrate(&mut conn)?;

        Ok(Self {
            conn,
            path,
            notifier: ChangeNotifier::new(config.event_capacity),
        })
    }

    /// File backing this database; `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn schema_version(&self) -> Result<i64> {
        migrations::current_version(&self.conn)
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Subscribe to committed changes; an empty slice means every table.
    pub fn subscribe(&self, tables: &[Table]) -> Subscription {
        self.notifier.subscribe(tables)
    }

    pub fn pages(&self) -> PageDao<'_> {
        PageDao::new(&self.conn, &self.notifier)
    }

    pub fn supported_pages(&self) -> SupportedPageDao<'_> {
        SupportedPageDao::new(&self.conn, &self.notifier)
    }

    pub fn videos(&self) -> VideoDao<'_> {
        VideoDao::new(&self.conn, &self.notifier)
    }

    pub fn progress(&self) -> ProgressDao<'_> {
        ProgressDao::new(&self.conn, &self.notifier)
    }

    pub fn history(&self) -> HistoryDao<'_> {
        HistoryDao::new(&self.conn, &self.notifier)
    }

    pub fn ad_hosts(&self) -> AdHostDao<'_> {
        AdHostDao::new(&self.conn, &self.notifier)
    }

    pub fn settings(&self) -> SettingsManager<'_> {
        SettingsManager::new(&self.conn)
    }

    pub fn into_shared(self) -> SharedDb {
        Arc::new(Mutex::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::migrations::SCHEMA_VERSION;
    use crate::models::{HistoryItem, VideoInfo};

    fn file_config(dir: &Path) -> StoreConfig {
        StoreConfig {
            data_dir: Some(dir.to_path_buf()),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn in_memory_db_is_current() {
        let db = Db::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
        assert!(db.path().is_none());
    }

    #[test]
    fn rows_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(dir.path());
        let video = VideoInfo::new("title", "originalUrl");

        {
            let db = Db::open_default(&config).unwrap();
            assert_eq!(db.path(), Some(dir.path().join("dl.db").as_path()));
            db.videos().insert(&video).unwrap();
        }

        let db = Db::open_default(&config).unwrap();
        assert_eq!(db.videos().get_by_url("originalUrl").unwrap(), Some(video));
    }

    #[test]
    fn v1_file_is_upgraded_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(migrations::MIGRATIONS[0].sql).unwrap();
            conn.pragma_update(None, "user_version", 1).unwrap();
            conn.execute(
                "INSERT INTO HistoryItem (id, title, url, datetime) VALUES ('h1', 'Old', 'https://old.example.com', 1000)",
                [],
            )
            .unwrap();
        }

        let db = Db::open(&path, &StoreConfig::default()).unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);

        let history = db.history().all().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, "h1");
        assert_eq!(history[0].title.as_deref(), Some("Old"));
        assert_eq!(db.ad_hosts().count().unwrap(), 0);
    }

    #[test]
    fn newer_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", SCHEMA_VERSION + 3)
                .unwrap();
        }

        let err = Db::open(&path, &StoreConfig::default()).err().unwrap();
        assert!(matches!(err, StoreError::SchemaTooNew { .. }));
    }

    #[test]
    fn garbage_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.db");
        std::fs::write(&path, vec![0x42u8; 4096]).unwrap();

        let err = Db::open(&path, &StoreConfig::default()).err().unwrap();
        assert!(err.is_unavailable(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn shared_handle_from_background_task() {
        let db = Db::open_in_memory().unwrap().into_shared();

        let writer = {
            let db = db.clone();
            tokio::spawn(async move {
                let guard = db.lock().await;
                guard
                    .history()
                    .insert(&HistoryItem::new("https://example.com", None))
                    .unwrap();
            })
        };
        writer.await.unwrap();

        let guard = db.lock().await;
        assert_eq!(guard.history().all().unwrap().len(), 1);
    }
}
