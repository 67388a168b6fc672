//! Typed live feed over one store subscription
//!
//! A `LiveFeed` forwards every snapshot of a live query to a callback after
//! decoding it into records. Delivery runs in its own task; the callback is
//! invoked under a gate that `close()` shuts, so once `close()` returns the
//! callback is never called again.

use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::models::{Message, Room};
use crate::store::{Query, RealtimeStore, Snapshot, Subscription, SubscriptionId};

/// A record type that can be decoded from a snapshot child
pub trait FeedRecord: DeserializeOwned + Send + 'static {
    /// Attach the store key the record was read from
    fn set_id(&mut self, id: String);
}

impl FeedRecord for Message {
    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

impl FeedRecord for Room {
    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

/// A live query whose snapshots are delivered to a callback
pub struct LiveFeed {
    store: Arc<dyn RealtimeStore>,
    path: String,
    subscription: Option<SubscriptionId>,
    gate: Arc<Mutex<bool>>,
    task: Option<JoinHandle<()>>,
}

impl LiveFeed {
    /// Subscribe to `query` and start delivering decoded snapshots
    ///
    /// Fails with `Unavailable` outside a tokio runtime. The callback must
    /// not close the feed it is attached to.
    pub fn open<T, F>(
        store: Arc<dyn RealtimeStore>,
        query: Query,
        mut on_snapshot: F,
    ) -> StoreResult<Self>
    where
        T: FeedRecord,
        F: FnMut(Vec<T>) + Send + 'static,
    {
        let runtime = Handle::try_current()
            .map_err(|e| StoreError::Unavailable(format!("no async runtime: {}", e)))?;

        let path = query.path.clone();
        let Subscription {
            id,
            mut snapshots,
        } = store.subscribe(query)?;
        debug!(id, path = %path, "feed opened");

        let gate = Arc::new(Mutex::new(true));
        let task_gate = Arc::clone(&gate);
        let task_path = path.clone();

        let task = runtime.spawn(async move {
            while let Some(snapshot) = snapshots.recv().await {
                let records = decode_snapshot::<T>(&task_path, snapshot);

                {
                    let open = task_gate.lock().unwrap_or_else(PoisonError::into_inner);
                    if !*open {
                        break;
                    }
                    on_snapshot(records);
                }
            }
        });

        Ok(Self {
            store,
            path,
            subscription: Some(id),
            gate,
            task: Some(task),
        })
    }

    /// Whether the feed is still delivering
    pub fn is_open(&self) -> bool {
        self.subscription.is_some()
    }

    /// Detach from the store
    ///
    /// Waits for an in-flight callback to finish. Closing an already closed
    /// feed does nothing.
    pub fn close(&mut self) {
        let Some(id) = self.subscription.take() else {
            return;
        };

        *self.gate.lock().unwrap_or_else(PoisonError::into_inner) = false;
        self.store.unsubscribe(id);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        debug!(id, path = %self.path, "feed closed");
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        self.close();
    }
}

/// Decode snapshot children, skipping records that do not parse
fn decode_snapshot<T: FeedRecord>(path: &str, snapshot: Snapshot) -> Vec<T> {
    snapshot
        .children
        .into_iter()
        .filter_map(|(key, value)| match serde_json::from_value::<T>(value) {
            Ok(mut record) => {
                record.set_id(key);
                Some(record)
            }
            Err(e) => {
                warn!(path = %path, key = %key, "skipping malformed record: {}", e);
                None
            }
        })
        .collect()
}
