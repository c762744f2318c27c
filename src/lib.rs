//! Local persistence store of the video browser.
//!
//! Bookmarked pages, supported-site rules, detected videos, download
//! progress, browsing history and the ad host block list live in one SQLite
//! file. Open it with [`Db::open_default`] (or [`Db::open_in_memory`] in
//! tests); the schema is migrated to [`SCHEMA_VERSION`] on open.
//!
//! Writes go through the per-table access objects ([`Db::videos`],
//! [`Db::history`], ...). Every committed change is published to
//! [`Subscription`]s, and [`LiveQuery`] keeps a result set current.

pub mod adblock;
pub mod codec;
pub mod config;
pub mod dao;
pub mod db;
pub mod error;
pub mod events;
pub mod live;
mod migrations;
pub mod models;
pub mod settings;
pub mod url_utils;

pub use adblock::{parse_ads_line, AdBlocker};
pub use config::StoreConfig;
pub use db::{Db, SharedDb};
pub use error::{CodecError, Result, StoreError};
pub use events::{ChangeKind, ChangeNotifier, StoreEvent, Subscription, Table};
pub use live::{LiveQuery, LiveResult};
pub use migrations::SCHEMA_VERSION;
pub use models::{
    AdHost, DownloadRequest, DownloadState, FormatList, HistoryItem, PageInfo, ProgressInfo,
    SupportedPage, VideoFormat, VideoInfo,
};
pub use settings::SettingsManager;
