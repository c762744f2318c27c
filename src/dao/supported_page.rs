use regex::Regex;
use rusqlite::{params, Connection, Row};

use crate::error::Result;
use crate::events::{ChangeKind, ChangeNotifier, Table};
use crate::models::SupportedPage;
use crate::url_utils::{lookup_host, strip_host_prefix};

/// Access to the list of sites with a dedicated extractor.
pub struct SupportedPageDao<'a> {
    conn: &'a Connection,
    notifier: &'a ChangeNotifier,
}

impl<'a> SupportedPageDao<'a> {
    pub(crate) fn new(conn: &'a Connection, notifier: &'a ChangeNotifier) -> Self {
        Self { conn, notifier }
    }

    fn write(conn: &Connection, page: &SupportedPage) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT OR REPLACE INTO SupportedPage (id, name, pattern) VALUES (?1, ?2, ?3)",
            params![page.id, page.name, page.pattern],
        )
    }

    pub fn insert(&self, page: &SupportedPage) -> Result<()> {
        Self::write(self.conn, page)?;
        self.notifier
            .notify(Table::SupportedPage, ChangeKind::Inserted, 1);
        Ok(())
    }

    pub fn insert_all(&self, pages: &[SupportedPage]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for page in pages {
            Self::write(&tx, page)?;
        }
        tx.commit()?;

        self.notifier
            .notify(Table::SupportedPage, ChangeKind::Inserted, pages.len());
        Ok(pages.len())
    }

    pub fn update(&self, page: &SupportedPage) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE SupportedPage SET name = ?2, pattern = ?3 WHERE id = ?1",
            params![page.id, page.name, page.pattern],
        )?;
        self.notifier
            .notify(Table::SupportedPage, ChangeKind::Updated, changed);
        Ok(changed > 0)
    }

    pub fn delete(&self, page: &SupportedPage) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM SupportedPage WHERE id = ?1", params![page.id])?;
        self.notifier
            .notify(Table::SupportedPage, ChangeKind::Deleted, removed);
        Ok(removed)
    }

    pub fn delete_all(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM SupportedPage", [])?;
        self.notifier
            .notify(Table::SupportedPage, ChangeKind::Cleared, removed);
        Ok(removed)
    }

    pub fn all(&self) -> Result<Vec<SupportedPage>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, pattern FROM SupportedPage ORDER BY rowid ASC")?;

        let rows = stmt.query_map([], row_to_supported_page)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// Entries whose pattern matches `url` or whose name is the URL's host.
    ///
    /// Names are compared without `www.` / `m.` prefixes. A pattern that
    /// fails to compile is skipped; the name comparison still applies.
    pub fn matching(&self, url: &str) -> Result<Vec<SupportedPage>> {
        let host = lookup_host(url);
        let mut result = Vec::new();

        for page in self.all()? {
            let name = page.name.trim().to_ascii_lowercase();
            let by_name = host.as_deref() == Some(strip_host_prefix(&name));

            let by_pattern = !page.pattern.is_empty()
                && match Regex::new(&page.pattern) {
                    Ok(re) => re.is_match(url),
                    Err(e) => {
                        log::warn!("supported page {} has invalid pattern: {}", page.id, e);
                        false
                    }
                };

            if by_name || by_pattern {
                result.push(page);
            }
        }
        Ok(result)
    }
}

fn row_to_supported_page(row: &Row) -> rusqlite::Result<SupportedPage> {
    Ok(SupportedPage {
        id: row.get(0)?,
        name: row.get(1)?,
        pattern: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Db;

    #[test]
    fn insert_update_delete() {
        let db = Db::open_in_memory().unwrap();
        let mut page = SupportedPage::new("youtube", r"^https?://(www\.|m\.)?youtube\.com/watch");
        db.supported_pages().insert(&page).unwrap();

        page.name = "YouTube".into();
        assert!(db.supported_pages().update(&page).unwrap());
        assert_eq!(db.supported_pages().all().unwrap(), vec![page.clone()]);

        assert_eq!(db.supported_pages().delete(&page).unwrap(), 1);
        assert!(db.supported_pages().all().unwrap().is_empty());
    }

    #[test]
    fn insert_all_and_clear() {
        let db = Db::open_in_memory().unwrap();
        let pages = vec![
            SupportedPage::new("a", "a"),
            SupportedPage::new("b", "b"),
        ];
        assert_eq!(db.supported_pages().insert_all(&pages).unwrap(), 2);
        assert_eq!(db.supported_pages().all().unwrap(), pages);
        assert_eq!(db.supported_pages().delete_all().unwrap(), 2);
    }

    #[test]
    fn matching_by_pattern_and_host() {
        let db = Db::open_in_memory().unwrap();
        db.supported_pages()
            .insert_all(&[
                SupportedPage::new("youtube", r"^https?://(www\.|m\.)?youtube\.com/watch"),
                SupportedPage::new("vimeo.com", ""),
                SupportedPage::new("broken", "(unclosed"),
            ])
            .unwrap();

        let yt = db
            .supported_pages()
            .matching("https://m.youtube.com/watch?v=abc")
            .unwrap();
        assert_eq!(yt.len(), 1);
        assert_eq!(yt[0].name, "youtube");

        let vimeo = db
            .supported_pages()
            .matching("https://www.vimeo.com/123")
            .unwrap();
        assert_eq!(vimeo.len(), 1);
        assert_eq!(vimeo[0].name, "vimeo.com");

        assert!(db
            .supported_pages()
            .matching("https://example.com/")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn name_matches_host_despite_pattern() {
        let db = Db::open_in_memory().unwrap();
        db.supported_pages()
            .insert_all(&[
                SupportedPage::new("vimeo.com", r"^https://player\.vimeo\.com/"),
                SupportedPage::new("www.dailymotion.com", "(unclosed"),
            ])
            .unwrap();

        let vimeo = db
            .supported_pages()
            .matching("https://vimeo.com/123")
            .unwrap();
        assert_eq!(vimeo.len(), 1);
        assert_eq!(vimeo[0].name, "vimeo.com");

        let player = db
            .supported_pages()
            .matching("https://player.vimeo.com/video/1")
            .unwrap();
        assert_eq!(player.len(), 1);

        let dm = db
            .supported_pages()
            .matching("https://m.dailymotion.com/video/x1")
            .unwrap();
        assert_eq!(dm.len(), 1);
        assert_eq!(dm[0].name, "www.dailymotion.com");
    }
}
