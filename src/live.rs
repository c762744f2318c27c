//! Observable queries.
//!
//! A [`LiveQuery`] runs a read against a [`SharedDb`], publishes the result,
//! and re-runs the read whenever its table changes. Bursts of writes are
//! coalesced into a single re-query.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::db::{Db, SharedDb};
use crate::error::{Result, StoreError};
use crate::events::Table;

/// Latest outcome of a live query.
pub type LiveResult<T> = std::result::Result<Vec<T>, Arc<StoreError>>;

/// Re-evaluated result set of a query over one table.
///
/// Dropping the handle (or calling [`LiveQuery::cancel`]) stops the
/// background task and unsubscribes it.
pub struct LiveQuery<T> {
    rx: watch::Receiver<Option<LiveResult<T>>>,
    task: JoinHandle<()>,
}

impl<T> LiveQuery<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Starts observing `table`. Must be called from within a tokio runtime.
    pub fn spawn<F>(db: SharedDb, table: Table, query: F) -> Self
    where
        F: Fn(&Db) -> Result<Vec<T>> + Send + Sync + 'static,
    {
        let (tx, rx) = watch::channel(None);

        let task = tokio::spawn(async move {
            // Subscribing under the same lock as the first read means no
            // write can fall between the two.
            let mut sub = {
                let guard = db.lock().await;
                let sub = guard.subscribe(&[table]);
                if tx.send(Some(run(&guard, &query))).is_err() {
                    return;
                }
                sub
            };

            loop {
                match sub.recv().await {
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }

                loop {
                    match sub.try_recv() {
                        Ok(Some(_)) | Err(RecvError::Lagged(_)) => continue,
                        Ok(None) => break,
                        Err(RecvError::Closed) => return,
                    }
                }

                let result = {
                    let guard = db.lock().await;
                    run(&guard, &query)
                };
                if tx.send(Some(result)).is_err() {
                    break;
                }
            }

            log::debug!("live query on {} stopped", table.as_str());
        });

        Self { rx, task }
    }

    /// Waits for the next published result.
    ///
    /// The first call yields the initial result. Returns `None` once the
    /// query has stopped.
    pub async fn changed(&mut self) -> Option<LiveResult<T>> {
        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            if let Some(result) = self.rx.borrow_and_update().clone() {
                return Some(result);
            }
        }
    }

    /// Most recent result, if the first read has completed.
    pub fn latest(&self) -> Option<LiveResult<T>> {
        self.rx.borrow().clone()
    }

    pub fn cancel(self) {
        self.task.abort();
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn run<T, F>(db: &Db, query: &F) -> LiveResult<T>
where
    F: Fn(&Db) -> Result<Vec<T>>,
{
    query(db).map_err(|e| {
        log::warn!("live query failed: {}", e);
        Arc::new(e)
    })
}
