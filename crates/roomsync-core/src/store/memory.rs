//! In-memory realtime store
//!
//! Keeps the whole tree in a `serde_json` map and evaluates live queries on
//! every write. Used by tests and local sessions; nothing is persisted.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::{path_segments, Query, RealtimeStore, Snapshot, Subscription, SubscriptionId};
use crate::error::{StoreError, StoreResult};

/// A registered live query
struct Listener {
    query: Query,
    segments: Vec<String>,
    tx: mpsc::UnboundedSender<Snapshot>,
}

struct Inner {
    root: Map<String, Value>,
    listeners: HashMap<SubscriptionId, Listener>,
    protected: HashSet<String>,
    next_subscription: SubscriptionId,
    next_key: u64,
    online: bool,
}

/// In-memory implementation of [`RealtimeStore`]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty, online store
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                root: Map::new(),
                listeners: HashMap::new(),
                protected: HashSet::new(),
                next_subscription: 1,
                next_key: 0,
                online: true,
            }),
        }
    }

    /// Simulate losing (or regaining) the connection to the backend
    ///
    /// While offline every append and subscribe fails with
    /// [`StoreError::Unavailable`]. Existing subscriptions stay registered.
    pub fn set_online(&self, online: bool) {
        self.lock().online = online;
    }

    /// Reject appends under `path` with [`StoreError::PermissionDenied`]
    pub fn protect(&self, path: &str) {
        self.lock()
            .protected
            .insert(path.trim_matches('/').to_string());
    }

    /// Number of live query registrations
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Read the value stored at `path`
    pub fn value_at(&self, path: &str) -> Option<Value> {
        let segments = path_segments(path).ok()?;
        let inner = self.lock();
        node_at(&inner.root, segments.as_slice()).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn append(&self, path: &str, record: Value) -> StoreResult<String> {
        let segments = path_segments(path)?;
        let mut inner = self.lock();

        if !inner.online {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        let joined = segments.join("/");
        if inner
            .protected
            .iter()
            .any(|p| joined == *p || joined.starts_with(&format!("{}/", p)))
        {
            return Err(StoreError::PermissionDenied { path: joined });
        }

        inner.next_key += 1;
        let key = push_key(inner.next_key);

        let parent = node_mut(&mut inner.root, &segments, path)?;
        parent.insert(key.clone(), record);
        trace!(path = %joined, key = %key, "appended record");

        notify_listeners(&mut inner, &segments);
        Ok(key)
    }

    fn subscribe(&self, query: Query) -> StoreResult<Subscription> {
        let segments: Vec<String> = path_segments(&query.path)?
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut inner = self.lock();

        if !inner.online {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let id = inner.next_subscription;
        inner.next_subscription += 1;

        // Live queries always start with the current result set
        let initial = evaluate(&inner.root, segments.as_slice(), &query);
        let _ = tx.send(initial);

        debug!(id, path = %query.path, "registered live query");
        inner.listeners.insert(
            id,
            Listener {
                query,
                segments,
                tx,
            },
        );

        Ok(Subscription { id, snapshots: rx })
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if self.lock().listeners.remove(&id).is_some() {
            debug!(id, "removed live query");
        }
    }
}

/// Generate a key that sorts after every key generated before it
fn push_key(sequence: u64) -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    format!("-{:012x}{:08x}", millis, sequence)
}

/// Re-evaluate and deliver every query at or above the written path
fn notify_listeners(inner: &mut Inner, written: &[&str]) {
    let mut closed = Vec::new();

    for (id, listener) in &inner.listeners {
        let affected = listener.segments.len() <= written.len()
            && listener
                .segments
                .iter()
                .zip(written)
                .all(|(a, b)| a == b);
        if !affected {
            continue;
        }

        let snapshot = evaluate(&inner.root, listener.segments.as_slice(), &listener.query);
        if listener.tx.send(snapshot).is_err() {
            closed.push(*id);
        }
    }

    for id in closed {
        inner.listeners.remove(&id);
    }
}

/// Compute the result set of `query` against the tree
fn evaluate<S: AsRef<str>>(root: &Map<String, Value>, segments: &[S], query: &Query) -> Snapshot {
    let Some(Value::Object(children)) = node_at(root, segments) else {
        return Snapshot::default();
    };

    let mut entries: Vec<(String, Value)> = children
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    entries.sort_by(|(ka, va), (kb, vb)| match &query.order_by {
        Some(field) => compare_child(va.get(field), vb.get(field)).then_with(|| ka.cmp(kb)),
        None => ka.cmp(kb),
    });

    if let Some(limit) = query.limit_to_last {
        let skip = entries.len().saturating_sub(limit);
        entries.drain(..skip);
    }

    Snapshot { children: entries }
}

/// Order child values: missing/null, booleans, numbers, strings, then objects
fn compare_child(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    rank(a).cmp(&rank(b)).then_with(|| match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => Ordering::Equal,
    })
}

fn node_at<'a, S: AsRef<str>>(root: &'a Map<String, Value>, segments: &[S]) -> Option<&'a Value> {
    let (first, rest) = segments.split_first()?;
    let mut node = root.get(first.as_ref())?;
    for segment in rest {
        node = node.as_object()?.get(segment.as_ref())?;
    }
    Some(node)
}

fn node_mut<'a>(
    root: &'a mut Map<String, Value>,
    segments: &[&str],
    path: &str,
) -> StoreResult<&'a mut Map<String, Value>> {
    let mut node = root;
    for segment in segments {
        let current = node;
        node = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn timestamps(snapshot: &Snapshot) -> Vec<i64> {
        snapshot
            .children
            .iter()
            .map(|(_, v)| v["timestamp"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_initial_snapshot_is_empty_for_unknown_path() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(Query::new("rooms/nowhere/messages")).unwrap();

        let snapshot = sub.snapshots.recv().await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_append_notifies_subscribers() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(Query::new("rooms/a/messages")).unwrap();
        sub.snapshots.recv().await.unwrap();

        let key = store
            .append("rooms/a/messages", json!({"text": "hi", "timestamp": 1}))
            .await
            .unwrap();

        let snapshot = sub.snapshots.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.children[0].0, key);
    }

    #[tokio::test]
    async fn test_ancestor_subscribers_are_notified() {
        let store = MemoryStore::new();
        let mut rooms = store.subscribe(Query::new("rooms")).unwrap();
        rooms.snapshots.recv().await.unwrap();

        store
            .append("rooms/general/messages", json!({"text": "hi", "timestamp": 1}))
            .await
            .unwrap();

        let snapshot = rooms.snapshots.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.children[0].0, "general");
    }

    #[tokio::test]
    async fn test_order_and_limit() {
        let store = MemoryStore::new();
        for ts in [500, 100, 400, 200, 300] {
            store
                .append("rooms/a/messages", json!({"timestamp": ts}))
                .await
                .unwrap();
        }

        let query = Query::new("rooms/a/messages")
            .order_by_child("timestamp")
            .limit_to_last(3);
        let mut sub = store.subscribe(query).unwrap();

        let snapshot = sub.snapshots.recv().await.unwrap();
        assert_eq!(timestamps(&snapshot), vec![300, 400, 500]);
    }

    #[tokio::test]
    async fn test_push_keys_are_ordered() {
        let store = MemoryStore::new();
        let first = store.append("log", json!(1)).await.unwrap();
        let second = store.append("log", json!(2)).await.unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_deliveries() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(Query::new("log")).unwrap();
        sub.snapshots.recv().await.unwrap();

        store.unsubscribe(sub.id);
        assert_eq!(store.listener_count(), 0);

        store.append("log", json!(1)).await.unwrap();
        assert!(sub.snapshots.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_offline_store() {
        let store = MemoryStore::new();
        store.set_online(false);

        let err = store.append("log", json!(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.subscribe(Query::new("log")).is_err());

        store.set_online(true);
        assert!(store.append("log", json!(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_protected_path() {
        let store = MemoryStore::new();
        store.protect("rooms/locked");

        let err = store
            .append("rooms/locked/messages", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::PermissionDenied { .. }));

        assert!(store.append("rooms/lockedout/messages", json!({})).await.is_ok());
    }

    #[tokio::test]
    async fn test_append_through_scalar_fails() {
        let store = MemoryStore::new();
        store.append("a", json!("scalar")).await.unwrap();
        let key = store.value_at("a").unwrap();
        let key = key.as_object().unwrap().keys().next().unwrap().clone();

        let err = store
            .append(&format!("a/{}/child", key), json!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath(_)));
    }
}
