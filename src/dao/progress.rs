use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::codec::{decode_video_info, encode_video_info};
use crate::error::Result;
use crate::events::{ChangeKind, ChangeNotifier, Table};
use crate::models::{DownloadState, ProgressInfo};

use super::decode_or_default;

const COLUMNS: &str = "id, downloadId, videoInfo, bytesDownloaded, bytesTotal, \
    progressDownloaded, progressTotal, downloadStatus, isLive, isM3u8, \
    fragmentsDownloaded, fragmentsTotal, infoLine";

/// Access to per-download progress rows.
pub struct ProgressDao<'a> {
    conn: &'a Connection,
    notifier: &'a ChangeNotifier,
}

impl<'a> ProgressDao<'a> {
    pub(crate) fn new(conn: &'a Connection, notifier: &'a ChangeNotifier) -> Self {
        Self { conn, notifier }
    }

    /// Insert a progress row, replacing any row with the same id.
    pub fn insert(&self, progress: &ProgressInfo) -> Result<()> {
        let video_info = encode_video_info(&progress.video_info)?;

        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO ProgressInfo (
              id, downloadId, videoInfo, bytesDownloaded, bytesTotal,
              progressDownloaded, progressTotal, downloadStatus, isLive, isM3u8,
              fragmentsDownloaded, fragmentsTotal, infoLine
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                progress.id,
                progress.download_id,
                video_info,
                progress.bytes_downloaded,
                progress.bytes_total,
                progress.progress_downloaded,
                progress.progress_total,
                progress.download_status.code(),
                progress.is_live,
                progress.is_m3u8,
                progress.fragments_downloaded,
                progress.fragments_total,
                progress.info_line
            ],
        )?;

        self.notifier
            .notify(Table::ProgressInfo, ChangeKind::Inserted, 1);
        Ok(())
    }

    /// Update the row with the same id. Returns `false` if there is none.
    pub fn update(&self, progress: &ProgressInfo) -> Result<bool> {
        let video_info = encode_video_info(&progress.video_info)?;

        let changed = self.conn.execute(
            r#"
            UPDATE ProgressInfo
            SET downloadId = ?2, videoInfo = ?3, bytesDownloaded = ?4, bytesTotal = ?5,
                progressDownloaded = ?6, progressTotal = ?7, downloadStatus = ?8,
                isLive = ?9, isM3u8 = ?10, fragmentsDownloaded = ?11,
                fragmentsTotal = ?12, infoLine = ?13
            WHERE id = ?1
            "#,
            params![
                progress.id,
                progress.download_id,
                video_info,
                progress.bytes_downloaded,
                progress.bytes_total,
                progress.progress_downloaded,
                progress.progress_total,
                progress.download_status.code(),
                progress.is_live,
                progress.is_m3u8,
                progress.fragments_downloaded,
                progress.fragments_total,
                progress.info_line
            ],
        )?;

        self.notifier
            .notify(Table::ProgressInfo, ChangeKind::Updated, changed);
        Ok(changed > 0)
    }

    /// Write only the counters and state of a running download.
    pub fn set_progress(
        &self,
        id: &str,
        downloaded: i64,
        total: i64,
        status: DownloadState,
    ) -> Result<bool> {
        let changed = self.conn.execute(
            r#"
            UPDATE ProgressInfo
            SET progressDownloaded = ?2, progressTotal = ?3, downloadStatus = ?4
            WHERE id = ?1
            "#,
            params![id, downloaded, total, status.code()],
        )?;

        self.notifier
            .notify(Table::ProgressInfo, ChangeKind::Updated, changed);
        Ok(changed > 0)
    }

    pub fn delete(&self, progress: &ProgressInfo) -> Result<usize> {
        self.delete_by_id(&progress.id)
    }

    pub fn delete_by_id(&self, id: &str) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM ProgressInfo WHERE id = ?1", params![id])?;
        self.notifier
            .notify(Table::ProgressInfo, ChangeKind::Deleted, removed);
        Ok(removed)
    }

    /// Remove rows of downloads that completed successfully.
    pub fn delete_finished(&self) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM ProgressInfo WHERE downloadStatus = ?1",
            params![DownloadState::Success.code()],
        )?;
        self.notifier
            .notify(Table::ProgressInfo, ChangeKind::Deleted, removed);
        Ok(removed)
    }

    pub fn clear(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM ProgressInfo", [])?;
        self.notifier
            .notify(Table::ProgressInfo, ChangeKind::Cleared, removed);
        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Result<Option<ProgressInfo>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM ProgressInfo WHERE id = ?1"),
                params![id],
                row_to_progress,
            )
            .optional()?;
        Ok(row)
    }

    /// All rows in the order downloads were queued.
    pub fn all(&self) -> Result<Vec<ProgressInfo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {COLUMNS} FROM ProgressInfo ORDER BY rowid ASC"))?;

        let rows = stmt.query_map([], row_to_progress)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}

fn row_to_progress(row: &Row) -> rusqlite::Result<ProgressInfo> {
    let id: String = row.get(0)?;
    let video_info: String = row.get(2)?;
    let status: i32 = row.get(7)?;

    let video_info = decode_or_default(decode_video_info(&video_info), Table::ProgressInfo, &id);

    Ok(ProgressInfo {
        id,
        download_id: row.get(1)?,
        video_info,
        bytes_downloaded: row.get(3)?,
        bytes_total: row.get(4)?,
        progress_downloaded: row.get(5)?,
        progress_total: row.get(6)?,
        download_status: DownloadState::from_code(status),
        is_live: row.get(8)?,
        is_m3u8: row.get(9)?,
        fragments_downloaded: row.get(10)?,
        fragments_total: row.get(11)?,
        info_line: row.get(12)?,
    })
}
