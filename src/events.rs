use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// Tables owned by the store. Change events are keyed by table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Table {
    PageInfo,
    SupportedPage,
    VideoInfo,
    ProgressInfo,
    HistoryItem,
    AdHost,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::PageInfo,
        Table::SupportedPage,
        Table::VideoInfo,
        Table::ProgressInfo,
        Table::HistoryItem,
        Table::AdHost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Table::PageInfo => "PageInfo",
            Table::SupportedPage => "SupportedPage",
            Table::VideoInfo => "VideoInfo",
            Table::ProgressInfo => "ProgressInfo",
            Table::HistoryItem => "HistoryItem",
            Table::AdHost => "AdHost",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Inserted,
    Updated,
    Deleted,
    /// Every row of the table was removed.
    Cleared,
}

/// Emitted after a write to `table` has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreEvent {
    pub table: Table,
    pub change: ChangeKind,
    pub rows: usize,
}

/// Fan-out of committed changes to any number of subscribers.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<StoreEvent>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes a change. Writes that touched no rows are not announced.
    pub fn notify(&self, table: Table, change: ChangeKind, rows: usize) {
        if rows == 0 && change != ChangeKind::Cleared {
            return;
        }
        let event = StoreEvent { table, change, rows };
        log::debug!("store change: {:?}", event);
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    /// Subscribes to changes of the given tables; an empty slice means all tables.
    pub fn subscribe(&self, tables: &[Table]) -> Subscription {
        Subscription {
            tables: tables.to_vec(),
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Receives change events for a set of tables. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    tables: Vec<Table>,
    rx: broadcast::Receiver<StoreEvent>,
}

impl Subscription {
    fn wants(&self, table: Table) -> bool {
        self.tables.is_empty() || self.tables.contains(&table)
    }

    /// Waits for the next matching event.
    ///
    /// `RecvError::Lagged` means events were dropped; callers should treat it as
    /// "something changed" and re-read.
    pub async fn recv(&mut self) -> Result<StoreEvent, RecvError> {
        loop {
            let event = self.rx.recv().await?;
            if self.wants(event.table) {
                return Ok(event);
            }
        }
    }

    /// Returns the next matching event if one is already queued.
    pub fn try_recv(&mut self) -> Result<Option<StoreEvent>, RecvError> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.wants(event.table) => return Ok(Some(event)),
                Ok(_) => continue,
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Lagged(n)) => return Err(RecvError::Lagged(n)),
                Err(TryRecvError::Closed) => return Err(RecvError::Closed),
            }
        }
    }
}
