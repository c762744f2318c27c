//! Per-table access objects.
//!
//! Each DAO borrows the connection and change notifier from [`crate::Db`].
//! Every mutating call that touches rows publishes a [`crate::events::StoreEvent`]
//! after the write has been applied.

mod ad_host;
mod history;
mod page;
mod progress;
mod supported_page;
mod video;

pub use ad_host::AdHostDao;
pub use history::HistoryDao;
pub use page::{default_bookmarks, PageDao};
pub use progress::ProgressDao;
pub use supported_page::SupportedPageDao;
pub use video::VideoDao;

use crate::error::CodecError;
use crate::events::Table;

/// Composite columns that fail to decode fall back to their empty value.
///
/// One unreadable format list must not take down the caller listing videos.
pub(crate) fn decode_or_default<T: Default>(
    decoded: Result<T, CodecError>,
    table: Table,
    id: &str,
) -> T {
    match decoded {
        Ok(value) => value,
        Err(e) => {
            log::warn!(
                "{} row {}: unreadable composite column, using empty value: {}",
                table.as_str(),
                id,
                e
            );
            T::default()
        }
    }
}
