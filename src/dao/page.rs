use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::events::{ChangeKind, ChangeNotifier, Table};
use crate::models::PageInfo;
use crate::settings::SettingsManager;
use crate::url_utils::host_of;

const COLUMNS: &str = "id, isSystem, name, link, icon, favicon";

/// Sites offered as bookmarks on a first start.
const DEFAULT_BOOKMARKS: [&str; 8] = [
    "https://www.imdb.com",
    "https://www.tiktok.com",
    "https://www.dailymotion.com",
    "https://www.facebook.com/watch",
    "https://www.instagram.com",
    "https://www.twitter.com",
    "https://www.pinterest.com/videos",
    "https://www.twitch.tv",
];

/// The first-start bookmark list, named after each site's host.
pub fn default_bookmarks() -> Vec<PageInfo> {
    DEFAULT_BOOKMARKS
        .iter()
        .map(|link| {
            let mut page = PageInfo::new(*link);
            page.name = host_of(link).unwrap_or_default();
            page
        })
        .collect()
}

/// Access to bookmarked / top pages. Pages are keyed by `link`.
pub struct PageDao<'a> {
    conn: &'a Connection,
    notifier: &'a ChangeNotifier,
}

impl<'a> PageDao<'a> {
    pub(crate) fn new(conn: &'a Connection, notifier: &'a ChangeNotifier) -> Self {
        Self { conn, notifier }
    }

    fn write(conn: &Connection, page: &PageInfo) -> rusqlite::Result<usize> {
        conn.execute(
            r#"
            INSERT OR REPLACE INTO PageInfo (id, isSystem, name, link, icon, favicon)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                page.id,
                page.is_system,
                page.name,
                page.link,
                page.icon,
                page.favicon
            ],
        )
    }

    /// Insert a page; an existing page with the same link is replaced.
    pub fn insert(&self, page: &PageInfo) -> Result<()> {
        Self::write(self.conn, page)?;
        self.notifier.notify(Table::PageInfo, ChangeKind::Inserted, 1);
        Ok(())
    }

    /// Insert all pages in one transaction.
    pub fn insert_all(&self, pages: &[PageInfo]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for page in pages {
            Self::write(&tx, page)?;
        }
        tx.commit()?;

        self.notifier
            .notify(Table::PageInfo, ChangeKind::Inserted, pages.len());
        Ok(pages.len())
    }

    /// Update the page with the same link. Returns `false` if there is none.
    pub fn update(&self, page: &PageInfo) -> Result<bool> {
        let changed = self.conn.execute(
            r#"
            UPDATE PageInfo
            SET id = ?2, isSystem = ?3, name = ?4, icon = ?5, favicon = ?6
            WHERE link = ?1
            "#,
            params![
                page.link,
                page.id,
                page.is_system,
                page.name,
                page.icon,
                page.favicon
            ],
        )?;
        self.notifier
            .notify(Table::PageInfo, ChangeKind::Updated, changed);
        Ok(changed > 0)
    }

    pub fn delete(&self, page: &PageInfo) -> Result<usize> {
        self.delete_by_link(&page.link)
    }

    pub fn delete_by_link(&self, link: &str) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM PageInfo WHERE link = ?1", params![link])?;
        self.notifier
            .notify(Table::PageInfo, ChangeKind::Deleted, removed);
        Ok(removed)
    }

    pub fn delete_all(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM PageInfo", [])?;
        self.notifier
            .notify(Table::PageInfo, ChangeKind::Cleared, removed);
        Ok(removed)
    }

    /// Swap the whole bookmark list atomically.
    pub fn replace_all(&self, pages: &[PageInfo]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute("DELETE FROM PageInfo", [])?;
        for page in pages {
            Self::write(&tx, page)?;
        }
        tx.commit()?;

        self.notifier
            .notify(Table::PageInfo, ChangeKind::Cleared, removed);
        self.notifier
            .notify(Table::PageInfo, ChangeKind::Inserted, pages.len());
        Ok(pages.len())
    }

    pub fn get(&self, link: &str) -> Result<Option<PageInfo>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM PageInfo WHERE link = ?1"),
                params![link],
                row_to_page,
            )
            .optional()?;
        Ok(row)
    }

    /// All pages in insertion order.
    pub fn all(&self) -> Result<Vec<PageInfo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {COLUMNS} FROM PageInfo ORDER BY rowid ASC"))?;

        let rows = stmt.query_map([], row_to_page)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// Pages for the start screen. On a first start with no pages stored, the
    /// default bookmarks are seeded and returned.
    pub fn top_pages(&self, settings: &SettingsManager<'_>) -> Result<Vec<PageInfo>> {
        let pages = self.all()?;
        if !pages.is_empty() || !settings.is_first_start()? {
            return Ok(pages);
        }

        let defaults = default_bookmarks();
        self.insert_all(&defaults)?;
        settings.set_first_start(false)?;
        log::info!("seeded {} default bookmarks", defaults.len());
        Ok(defaults)
    }
}

fn row_to_page(row: &Row) -> rusqlite::Result<PageInfo> {
    Ok(PageInfo {
        id: row.get(0)?,
        is_system: row.get(1)?,
        name: row.get(2)?,
        link: row.get(3)?,
        icon: row.get(4)?,
        favicon: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Db;

    #[test]
    fn same_link_keeps_one_row() {
        let db = Db::open_in_memory().unwrap();
        let mut first = PageInfo::new("https://example.com");
        first.name = "first".into();
        let mut second = PageInfo::new("https://example.com");
        second.name = "second".into();

        db.pages().insert(&first).unwrap();
        db.pages().insert(&second).unwrap();

        let all = db.pages().all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "second");
        assert_eq!(all[0].id, second.id);
    }

    #[test]
    fn favicon_roundtrip() {
        let db = Db::open_in_memory().unwrap();
        let mut page = PageInfo::new("https://example.com");
        page.favicon = Some(vec![0x89, 0x50, 0x4e, 0x47]);
        db.pages().insert(&page).unwrap();

        let loaded = db.pages().get("https://example.com").unwrap().unwrap();
        assert_eq!(loaded.favicon, page.favicon);
    }

    #[test]
    fn update_by_link() {
        let db = Db::open_in_memory().unwrap();
        let mut page = PageInfo::new("https://example.com");
        assert!(!db.pages().update(&page).unwrap());

        db.pages().insert(&page).unwrap();
        page.name = "Example".into();
        page.is_system = false;
        assert!(db.pages().update(&page).unwrap());

        let loaded = db.pages().get("https://example.com").unwrap().unwrap();
        assert_eq!(loaded.name, "Example");
        assert!(!loaded.is_system);
    }

    #[test]
    fn replace_all_swaps_list() {
        let db = Db::open_in_memory().unwrap();
        db.pages()
            .insert_all(&[PageInfo::new("https://a.com"), PageInfo::new("https://b.com")])
            .unwrap();

        db.pages()
            .replace_all(&[PageInfo::new("https://c.com")])
            .unwrap();

        let links: Vec<String> = db.pages().all().unwrap().into_iter().map(|p| p.link).collect();
        assert_eq!(links, vec!["https://c.com".to_string()]);
    }

    #[test]
    fn delete_single_and_all() {
        let db = Db::open_in_memory().unwrap();
        let a = PageInfo::new("https://a.com");
        db.pages()
            .insert_all(&[a.clone(), PageInfo::new("https://b.com")])
            .unwrap();

        assert_eq!(db.pages().delete(&a).unwrap(), 1);
        assert_eq!(db.pages().all().unwrap().len(), 1);
        assert_eq!(db.pages().delete_all().unwrap(), 1);
        assert!(db.pages().all().unwrap().is_empty());
    }

    #[test]
    fn top_pages_seeds_defaults_once() {
        let db = Db::open_in_memory().unwrap();
        let settings = db.settings();

        let seeded = db.pages().top_pages(&settings).unwrap();
        assert_eq!(seeded.len(), DEFAULT_BOOKMARKS.len());
        assert_eq!(seeded[0].name, "www.imdb.com");
        assert_eq!(seeded[0].display_title(), "Imdb");
        assert_eq!(db.pages().all().unwrap(), seeded);

        db.pages().delete_all().unwrap();
        assert!(db.pages().top_pages(&settings).unwrap().is_empty());
    }

    #[test]
    fn top_pages_keeps_user_pages() {
        let db = Db::open_in_memory().unwrap();
        db.pages().insert(&PageInfo::new("https://mine.example.com")).unwrap();

        let pages = db.pages().top_pages(&db.settings()).unwrap();
        assert_eq!(pages.len(), 1);
    }
}
