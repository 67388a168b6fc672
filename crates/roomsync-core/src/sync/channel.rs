//! Room channel
//!
//! One live subscription to the tail of a room's message log.

use std::sync::Arc;

use crate::error::{ChatError, ChatResult};
use crate::models::Message;
use crate::store::{room_messages_path, Query, RealtimeStore};

use super::feed::LiveFeed;

/// Number of most recent messages a channel follows by default
pub const DEFAULT_MESSAGE_LIMIT: usize = 50;

/// Child key messages are ordered by
const ORDER_KEY: &str = "timestamp";

/// Live feed of one room's most recent messages
///
/// Snapshots arrive in store order; sorting is left to the consumer.
pub struct RoomChannel {
    room_id: String,
    feed: LiveFeed,
}

impl RoomChannel {
    /// Open a channel on `room_id`, following the last `limit` messages
    ///
    /// Returns before any data arrives. A room that does not exist yields
    /// empty snapshots rather than an error.
    pub fn open<F>(
        store: Arc<dyn RealtimeStore>,
        room_id: &str,
        limit: usize,
        on_messages: F,
    ) -> ChatResult<Self>
    where
        F: FnMut(Vec<Message>) + Send + 'static,
    {
        let room_id = validate_room_id(room_id)?;
        let query = Query::new(room_messages_path(room_id))
            .order_by_child(ORDER_KEY)
            .limit_to_last(limit);

        let feed = LiveFeed::open::<Message, _>(store, query, on_messages)
            .map_err(|e| ChatError::backend("open room channel", e))?;

        Ok(Self {
            room_id: room_id.to_string(),
            feed,
        })
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn is_open(&self) -> bool {
        self.feed.is_open()
    }

    /// Stop following the room. Safe to call more than once.
    pub fn close(&mut self) {
        self.feed.close();
    }
}

/// Check a room id is usable as a single path segment
pub(crate) fn validate_room_id(room_id: &str) -> ChatResult<&str> {
    let room_id = room_id.trim();
    if room_id.is_empty() {
        return Err(ChatError::Validation("room id is empty".into()));
    }
    if room_id.contains('/') {
        return Err(ChatError::Validation(format!(
            "room id '{}' must not contain '/'",
            room_id
        )));
    }
    Ok(room_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryStore;

    #[test]
    fn test_validate_room_id() {
        assert_eq!(validate_room_id(" general ").unwrap(), "general");
        assert!(matches!(
            validate_room_id("   "),
            Err(ChatError::Validation(_))
        ));
        assert!(matches!(
            validate_room_id("a/b"),
            Err(ChatError::Validation(_))
        ));
    }

    #[test]
    fn test_open_outside_runtime_fails() {
        let store = Arc::new(MemoryStore::new());

        let result = RoomChannel::open(store.clone(), "general", 10, |_| {});
        assert!(matches!(
            result,
            Err(ChatError::BackendUnavailable {
                source: StoreError::Unavailable(_),
                ..
            })
        ));
        assert_eq!(store.listener_count(), 0);
    }
}
