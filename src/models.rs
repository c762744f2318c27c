use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A bookmarked / top page shown on the browser start screen.
///
/// Identity is the `link`; two pages with the same link are the same page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub id: String,
    /// Seeded by the app rather than added by the user.
    pub is_system: bool,
    pub name: String,
    pub link: String,
    pub icon: String,
    #[serde(default)]
    pub favicon: Option<Vec<u8>>,
}

impl PageInfo {
    pub fn new<S: Into<String>>(link: S) -> Self {
        Self {
            id: new_id(),
            is_system: true,
            name: String::new(),
            link: link.into(),
            icon: String::new(),
            favicon: None,
        }
    }

    /// Name without `www.` / `.com` noise, first letter upper-cased.
    pub fn display_title(&self) -> String {
        let trimmed = self.name.replace("www.", "").replace(".com", "");
        let mut chars = trimmed.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl PartialEq for PageInfo {
    fn eq(&self, other: &Self) -> bool {
        self.link == other.link
    }
}

impl Eq for PageInfo {}

impl Hash for PageInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.link.hash(state);
    }
}

/// A site known to host detectable video.
///
/// A URL belongs to the site when `pattern` (a regular expression) matches
/// it, or when `name` equals the URL host ignoring `www.` / `m.` prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedPage {
    pub id: String,
    pub name: String,
    pub pattern: String,
}

impl SupportedPage {
    pub fn new<S1: Into<String>, S2: Into<String>>(name: S1, pattern: S2) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

/// One downloadable rendition of a video, as reported by the extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoFormat {
    pub id: String,
    pub asr: i32,
    pub tbr: i32,
    pub abr: i32,
    pub format: Option<String>,
    pub format_id: Option<String>,
    pub format_note: Option<String>,
    pub ext: Option<String>,
    pub preference: i32,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub width: i32,
    pub height: i32,
    pub file_size: i64,
    pub file_size_approximate: i64,
    pub fps: i32,
    pub url: Option<String>,
    pub manifest_url: Option<String>,
    pub http_headers: Option<BTreeMap<String, String>>,
}

/// Ordered list of formats stored in the `formats` composite column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatList {
    #[serde(default)]
    pub formats: Vec<VideoFormat>,
}

impl FormatList {
    pub fn new(formats: Vec<VideoFormat>) -> Self {
        Self { formats }
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

/// An HTTP request that fetches (part of) a video stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl DownloadRequest {
    pub fn get<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            body: String::new(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Metadata of a detected, downloadable video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoInfo {
    pub id: String,
    #[serde(rename = "urls")]
    pub download_urls: Vec<DownloadRequest>,
    pub title: String,
    pub ext: String,
    pub thumbnail: String,
    /// Seconds.
    pub duration: i64,
    /// Page or manifest URL the video was detected on. Lookup key.
    pub original_url: String,
    pub formats: FormatList,
    #[serde(rename = "isRegular")]
    pub is_regular_download: bool,
}

impl Default for VideoInfo {
    fn default() -> Self {
        Self {
            id: new_id(),
            download_urls: Vec::new(),
            title: String::new(),
            ext: String::new(),
            thumbnail: String::new(),
            duration: 0,
            original_url: String::new(),
            formats: FormatList::default(),
            is_regular_download: false,
        }
    }
}

impl VideoInfo {
    pub fn new<S1: Into<String>, S2: Into<String>>(title: S1, original_url: S2) -> Self {
        Self {
            title: title.into(),
            original_url: original_url.into(),
            ..Self::default()
        }
    }

    /// File name: `title.ext`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.title, self.ext)
    }

    pub fn first_url(&self) -> Option<&str> {
        self.download_urls.first().map(|r| r.url.as_str())
    }

    /// Whether this is a segmented (HLS / DASH) stream rather than a plain file.
    pub fn is_m3u8(&self) -> bool {
        let is_manifest = |s: &str| s.contains(".m3u8") || s.contains(".mpd");
        is_manifest(&self.original_url)
            || self.original_url.ends_with(".txt")
            || self
                .formats
                .formats
                .iter()
                .filter_map(|f| f.url.as_deref())
                .any(is_manifest)
    }

    /// A manifest offering several renditions.
    pub fn is_master(&self) -> bool {
        self.is_m3u8() && self.formats.len() > 1
    }
}

/// Downloader task state codes as persisted in `downloadStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum DownloadState {
    Default,
    Pending,
    Prepare,
    Start,
    Downloading,
    ProxyReady,
    Success,
    Error,
    Pause,
    /// No space left on device.
    Enospc,
    Unknown(i32),
}

impl DownloadState {
    pub fn code(self) -> i32 {
        match self {
            DownloadState::Default => 0,
            DownloadState::Pending => -1,
            DownloadState::Prepare => 1,
            DownloadState::Start => 2,
            DownloadState::Downloading => 3,
            DownloadState::ProxyReady => 4,
            DownloadState::Success => 5,
            DownloadState::Error => 6,
            DownloadState::Pause => 7,
            DownloadState::Enospc => 8,
            DownloadState::Unknown(code) => code,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            0 => DownloadState::Default,
            -1 => DownloadState::Pending,
            1 => DownloadState::Prepare,
            2 => DownloadState::Start,
            3 => DownloadState::Downloading,
            4 => DownloadState::ProxyReady,
            5 => DownloadState::Success,
            6 => DownloadState::Error,
            7 => DownloadState::Pause,
            8 => DownloadState::Enospc,
            other => DownloadState::Unknown(other),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DownloadState::Downloading => "downloading",
            DownloadState::Success => "success",
            DownloadState::Pause => "pause",
            DownloadState::Pending => "pending",
            DownloadState::Prepare => "prepare",
            DownloadState::Enospc | DownloadState::Error => "failed",
            _ => "undefined",
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, DownloadState::Success)
    }
}

impl From<i32> for DownloadState {
    fn from(code: i32) -> Self {
        DownloadState::from_code(code)
    }
}

impl From<DownloadState> for i32 {
    fn from(state: DownloadState) -> Self {
        state.code()
    }
}

/// Download progress of one video.
///
/// Carries a full snapshot of the `VideoInfo` being downloaded, so the row
/// stays meaningful after the video record itself is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInfo {
    pub id: String,
    pub download_id: i64,
    pub video_info: VideoInfo,
    /// Superseded by `progress_downloaded`; kept for rows written before schema v3.
    pub bytes_downloaded: i32,
    /// Superseded by `progress_total`; kept for rows written before schema v4.
    pub bytes_total: i32,
    pub progress_downloaded: i64,
    pub progress_total: i64,
    pub download_status: DownloadState,
    pub is_live: bool,
    pub is_m3u8: bool,
    pub fragments_downloaded: i32,
    pub fragments_total: i32,
    pub info_line: String,
}

impl ProgressInfo {
    pub fn new(video_info: VideoInfo) -> Self {
        let is_m3u8 = video_info.is_m3u8();
        Self {
            id: new_id(),
            download_id: 0,
            video_info,
            bytes_downloaded: 0,
            bytes_total: 0,
            progress_downloaded: 0,
            progress_total: 0,
            download_status: DownloadState::Pending,
            is_live: false,
            is_m3u8,
            fragments_downloaded: 0,
            fragments_total: 1,
            info_line: String::new(),
        }
    }

    /// Whole percent, 0 while the total is unknown.
    pub fn progress_percent(&self) -> u8 {
        if self.progress_total <= 0 {
            return 0;
        }
        let pct = self.progress_downloaded.max(0) as f64 * 100.0 / self.progress_total as f64;
        pct.min(100.0) as u8
    }

    pub fn status_label(&self) -> &'static str {
        self.download_status.label()
    }

    /// e.g. `"1.5 MB/3 MB - downloading"`.
    pub fn progress_size(&self) -> String {
        format!(
            "{}/{} - {}",
            readable_size(self.progress_downloaded as f64),
            readable_size(self.progress_total as f64),
            self.download_status.label()
        )
    }
}

const KB: f64 = 1024.0;
const MB: f64 = KB * 1024.0;

fn readable_size(length: f64) -> String {
    let (value, unit) = if length > MB {
        (length / MB, "MB")
    } else if length > KB {
        (length / KB, "KB")
    } else {
        (length, "B")
    };
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, unit)
}

/// One browsing-history entry. Timestamps are kept at millisecond precision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub title: Option<String>,
    pub url: String,
    pub datetime: DateTime<Utc>,
    #[serde(default)]
    pub favicon: Option<Vec<u8>>,
}

impl HistoryItem {
    pub fn new<S: Into<String>>(url: S, title: Option<String>) -> Self {
        Self {
            id: new_id(),
            title,
            url: url.into(),
            datetime: now_millis(),
            favicon: None,
        }
    }
}

impl PartialEq for HistoryItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.url == other.url
            && self.datetime.timestamp_millis() == other.datetime.timestamp_millis()
    }
}

impl Eq for HistoryItem {}

/// Current time truncated to what the `datetime` column can hold.
pub fn now_millis() -> DateTime<Utc> {
    datetime_from_millis(Utc::now().timestamp_millis())
}

pub(crate) fn datetime_from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_default()
}

/// A blocked ad / tracker host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdHost {
    pub host: String,
}

impl AdHost {
    pub fn new<S: Into<String>>(host: S) -> Self {
        Self { host: host.into() }
    }
}
