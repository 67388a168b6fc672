//! Realtime store collaborator
//!
//! The backing store is an external service exposing an append-only write
//! and live queries over a JSON tree addressed by `/`-separated paths.
//!
//! ## Live queries
//!
//! A [`Query`] names a path, an optional child key to order by, and an
//! optional tail limit. Subscribing delivers the full matching result set
//! as a [`Snapshot`], first for the current state and then again every time
//! anything under the path changes.
//!
//! ```ignore
//! let query = Query::new("rooms/general/messages")
//!     .order_by_child("timestamp")
//!     .limit_to_last(50);
//! let mut sub = store.subscribe(query)?;
//! while let Some(snapshot) = sub.snapshots.recv().await {
//!     // ...
//! }
//! store.unsubscribe(sub.id);
//! ```

mod memory;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{StoreError, StoreResult};

pub use memory::MemoryStore;

/// Identifies one live query registration
pub type SubscriptionId = u64;

/// Full result set of a live query at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// `(key, record)` pairs in query order
    pub children: Vec<(String, Value)>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }
}

/// A live query over the children of one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Path whose children are returned
    pub path: String,
    /// Child key to sort by (key order when absent)
    pub order_by: Option<String>,
    /// Keep only the last N children after sorting
    pub limit_to_last: Option<usize>,
}

impl Query {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            order_by: None,
            limit_to_last: None,
        }
    }

    pub fn order_by_child(mut self, key: impl Into<String>) -> Self {
        self.order_by = Some(key.into());
        self
    }

    pub fn limit_to_last(mut self, limit: usize) -> Self {
        self.limit_to_last = Some(limit);
        self
    }
}

/// A registered live query
///
/// Snapshots stop arriving once the store drops the registration, which
/// happens on [`RealtimeStore::unsubscribe`].
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub snapshots: mpsc::UnboundedReceiver<Snapshot>,
}

/// The realtime store collaborator
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Durably append `record` as a new child of `path`
    ///
    /// Resolves with the generated key once the store acknowledges the write.
    async fn append(&self, path: &str, record: Value) -> StoreResult<String>;

    /// Register a live query
    ///
    /// Returns without waiting for data; snapshots arrive on the
    /// subscription's channel.
    fn subscribe(&self, query: Query) -> StoreResult<Subscription>;

    /// Drop a live query registration. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Split a path into its segments, rejecting empty ones
pub fn path_segments(path: &str) -> StoreResult<Vec<&str>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(StoreError::InvalidPath(path.to_string()));
    }

    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }

    Ok(segments)
}

/// Path holding all room records
pub fn rooms_path() -> &'static str {
    "rooms"
}

/// Path holding the messages of one room
pub fn room_messages_path(room_id: &str) -> String {
    format!("{}/{}/messages", rooms_path(), room_id)
}
