use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::events::{ChangeKind, ChangeNotifier, Table};
use crate::models::{datetime_from_millis, HistoryItem};

const COLUMNS: &str = "id, title, url, datetime, favicon";

/// Access to browsing history.
pub struct HistoryDao<'a> {
    conn: &'a Connection,
    notifier: &'a ChangeNotifier,
}

impl<'a> HistoryDao<'a> {
    pub(crate) fn new(conn: &'a Connection, notifier: &'a ChangeNotifier) -> Self {
        Self { conn, notifier }
    }

    pub fn insert(&self, item: &HistoryItem) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO HistoryItem (id, title, url, datetime, favicon)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                item.id,
                item.title,
                item.url,
                item.datetime.timestamp_millis(),
                item.favicon
            ],
        )?;

        self.notifier
            .notify(Table::HistoryItem, ChangeKind::Inserted, 1);
        Ok(())
    }

    pub fn update(&self, item: &HistoryItem) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE HistoryItem SET title = ?2, url = ?3, datetime = ?4, favicon = ?5 WHERE id = ?1",
            params![
                item.id,
                item.title,
                item.url,
                item.datetime.timestamp_millis(),
                item.favicon
            ],
        )?;

        self.notifier
            .notify(Table::HistoryItem, ChangeKind::Updated, changed);
        Ok(changed > 0)
    }

    pub fn delete(&self, item: &HistoryItem) -> Result<usize> {
        self.delete_by_id(&item.id)
    }

    pub fn delete_by_id(&self, id: &str) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM HistoryItem WHERE id = ?1", params![id])?;
        self.notifier
            .notify(Table::HistoryItem, ChangeKind::Deleted, removed);
        Ok(removed)
    }

    /// Remove all history. Subscribers are told even when it was already empty.
    pub fn clear(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM HistoryItem", [])?;
        self.notifier
            .notify(Table::HistoryItem, ChangeKind::Cleared, removed);
        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Result<Option<HistoryItem>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM HistoryItem WHERE id = ?1"),
                params![id],
                row_to_history,
            )
            .optional()?;
        Ok(row)
    }

    /// All history, newest first.
    pub fn all(&self) -> Result<Vec<HistoryItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM HistoryItem ORDER BY datetime DESC, rowid DESC"
        ))?;

        let rows = stmt.query_map([], row_to_history)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// History whose title or URL contains `text`, newest first.
    pub fn search(&self, text: &str) -> Result<Vec<HistoryItem>> {
        let needle = format!(
            "%{}%",
            text.replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_")
        );

        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {COLUMNS} FROM HistoryItem
            WHERE title LIKE ?1 ESCAPE '\' OR url LIKE ?1 ESCAPE '\'
            ORDER BY datetime DESC, rowid DESC
            "#
        ))?;

        let rows = stmt.query_map(params![needle], row_to_history)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}

fn row_to_history(row: &Row) -> rusqlite::Result<HistoryItem> {
    let millis: i64 = row.get(3)?;
    Ok(HistoryItem {
        id: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        datetime: datetime_from_millis(millis),
        favicon: row.get(4)?,
    })
}
