//! Room registry
//!
//! Live view of every room in the store.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::error::{ChatError, ChatResult};
use crate::models::Room;
use crate::store::{rooms_path, Query, RealtimeStore};

use super::feed::LiveFeed;

/// Continuously updated list of all rooms
///
/// Room order is whatever the store delivers; do not rely on it.
pub struct RoomRegistry {
    feed: LiveFeed,
    rooms: watch::Receiver<Vec<Room>>,
}

impl RoomRegistry {
    /// Start following the room collection
    pub fn open(store: Arc<dyn RealtimeStore>) -> ChatResult<Self> {
        let (tx, rx) = watch::channel(Vec::new());

        let feed = LiveFeed::open(store, Query::new(rooms_path()), move |rooms: Vec<Room>| {
            debug!(count = rooms.len(), "room snapshot delivered");
            tx.send_replace(rooms);
        })
        .map_err(|e| ChatError::backend("list rooms", e))?;

        Ok(Self { feed, rooms: rx })
    }

    /// Live sequence of full room sets
    ///
    /// The receiver immediately holds the latest known set.
    pub fn list_rooms(&self) -> watch::Receiver<Vec<Room>> {
        self.rooms.clone()
    }

    /// Latest known room set
    pub fn rooms(&self) -> Vec<Room> {
        self.rooms.borrow().clone()
    }

    /// Look up a room by id in the latest set
    pub fn find(&self, room_id: &str) -> Option<Room> {
        self.rooms
            .borrow()
            .iter()
            .find(|r| r.id.as_deref() == Some(room_id))
            .cloned()
    }

    pub fn is_open(&self) -> bool {
        self.feed.is_open()
    }

    /// Stop following the room collection. Safe to call more than once.
    pub fn close(&mut self) {
        self.feed.close();
    }
}
