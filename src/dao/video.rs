use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::codec::{decode_download_urls, decode_formats, encode_download_urls, encode_formats};
use crate::error::Result;
use crate::events::{ChangeKind, ChangeNotifier, Table};
use crate::models::VideoInfo;

use super::decode_or_default;

const COLUMNS: &str = "id, downloadUrls, title, ext, thumbnail, duration, originalUrl, formats, isRegular";

/// Access to detected video metadata.
pub struct VideoDao<'a> {
    conn: &'a Connection,
    notifier: &'a ChangeNotifier,
}

impl<'a> VideoDao<'a> {
    pub(crate) fn new(conn: &'a Connection, notifier: &'a ChangeNotifier) -> Self {
        Self { conn, notifier }
    }

    /// Insert a video, replacing any row with the same id.
    pub fn insert(&self, video: &VideoInfo) -> Result<()> {
        let download_urls = encode_download_urls(&video.download_urls)?;
        let formats = encode_formats(&video.formats)?;

        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO VideoInfo (
              id, downloadUrls, title, ext, thumbnail, duration, originalUrl, formats, isRegular
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                video.id,
                download_urls,
                video.title,
                video.ext,
                video.thumbnail,
                video.duration,
                video.original_url,
                formats,
                video.is_regular_download
            ],
        )?;

        self.notifier.notify(Table::VideoInfo, ChangeKind::Inserted, 1);
        Ok(())
    }

    /// Update the row with the video's id. Returns `false` if there is none.
    pub fn update(&self, video: &VideoInfo) -> Result<bool> {
        let download_urls = encode_download_urls(&video.download_urls)?;
        let formats = encode_formats(&video.formats)?;

        let changed = self.conn.execute(
            r#"
            UPDATE VideoInfo
            SET downloadUrls = ?2, title = ?3, ext = ?4, thumbnail = ?5, duration = ?6,
                originalUrl = ?7, formats = ?8, isRegular = ?9
            WHERE id = ?1
            "#,
            params![
                video.id,
                download_urls,
                video.title,
                video.ext,
                video.thumbnail,
                video.duration,
                video.original_url,
                formats,
                video.is_regular_download
            ],
        )?;

        self.notifier.notify(Table::VideoInfo, ChangeKind::Updated, changed);
        Ok(changed > 0)
    }

    pub fn delete(&self, video: &VideoInfo) -> Result<usize> {
        self.delete_by_id(&video.id)
    }

    pub fn delete_by_id(&self, id: &str) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM VideoInfo WHERE id = ?1", params![id])?;
        self.notifier.notify(Table::VideoInfo, ChangeKind::Deleted, removed);
        Ok(removed)
    }

    /// Remove every video detected on `original_url`.
    pub fn delete_by_url(&self, original_url: &str) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM VideoInfo WHERE originalUrl = ?1",
            params![original_url],
        )?;
        self.notifier.notify(Table::VideoInfo, ChangeKind::Deleted, removed);
        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Result<Option<VideoInfo>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM VideoInfo WHERE id = ?1"),
                params![id],
                row_to_video,
            )
            .optional()?;
        Ok(row)
    }

    /// Most recently written video for a page / manifest URL.
    pub fn get_by_url(&self, original_url: &str) -> Result<Option<VideoInfo>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM VideoInfo WHERE originalUrl = ?1 ORDER BY rowid DESC LIMIT 1"
                ),
                params![original_url],
                row_to_video,
            )
            .optional()?;
        Ok(row)
    }

    pub fn all(&self) -> Result<Vec<VideoInfo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {COLUMNS} FROM VideoInfo ORDER BY rowid ASC"))?;

        let rows = stmt.query_map([], row_to_video)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}

fn row_to_video(row: &Row) -> rusqlite::Result<VideoInfo> {
    let id: String = row.get(0)?;
    let download_urls: String = row.get(1)?;
    let formats: String = row.get(7)?;

    let download_urls = decode_or_default(decode_download_urls(&download_urls), Table::VideoInfo, &id);
    let formats = decode_or_default(decode_formats(&formats), Table::VideoInfo, &id);

    Ok(VideoInfo {
        id,
        download_urls,
        title: row.get(2)?,
        ext: row.get(3)?,
        thumbnail: row.get(4)?,
        duration: row.get(5)?,
        original_url: row.get(6)?,
        formats,
        is_regular_download: row.get(8)?,
    })
}
