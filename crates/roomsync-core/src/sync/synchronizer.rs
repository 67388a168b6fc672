//! Message synchronizer
//!
//! Owns the ordered message view of the active room and mediates writes.
//!
//! ## View updates
//!
//! Every snapshot delivered by the room channel replaces the whole view,
//! re-sorted by timestamp. Sends never touch the view directly: the
//! canonical copy of a sent message arrives through the channel like any
//! other.
//!
//! ## Room switching
//!
//! Switching closes the current channel, empties the view, then opens the
//! channel for the new room. Until the first snapshot of the new room
//! arrives the view stays empty.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ChatError, ChatResult, StoreError};
use crate::models::{sort_by_timestamp, Message, Room};
use crate::session::SessionContext;
use crate::store::{room_messages_path, rooms_path, RealtimeStore};

use super::channel::{validate_room_id, RoomChannel, DEFAULT_MESSAGE_LIMIT};

/// Room joined when a synchronizer is created
pub const DEFAULT_ROOM: &str = "general";

/// Synchronizer settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Room to start in
    pub default_room: String,
    /// Number of most recent messages kept in the view
    pub message_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_room: DEFAULT_ROOM.to_string(),
            message_limit: DEFAULT_MESSAGE_LIMIT,
        }
    }
}

impl From<&Config> for SyncConfig {
    fn from(config: &Config) -> Self {
        Self {
            default_room: config.default_room.clone(),
            message_limit: config.message_limit,
        }
    }
}

/// Ordered view of the active room's messages
pub struct MessageSynchronizer {
    store: Arc<dyn RealtimeStore>,
    session: SessionContext,
    config: SyncConfig,
    current_room: String,
    channel: Option<RoomChannel>,
    view: Arc<watch::Sender<Vec<Message>>>,
}

impl MessageSynchronizer {
    /// Create a synchronizer positioned on the configured default room
    ///
    /// Nothing is fetched until [`listen`](Self::listen) is called.
    pub fn new(store: Arc<dyn RealtimeStore>, session: SessionContext, config: SyncConfig) -> Self {
        let (view, _) = watch::channel(Vec::new());
        let current_room = config.default_room.clone();

        Self {
            store,
            session,
            config,
            current_room,
            channel: None,
            view: Arc::new(view),
        }
    }

    /// Start following the current room, if not already
    pub fn listen(&mut self) -> ChatResult<()> {
        if self.channel.is_some() {
            return Ok(());
        }

        let channel = self.open_channel(&self.current_room)?;
        self.channel = Some(channel);
        Ok(())
    }

    /// Stop following the current room. The view keeps its last state.
    pub fn stop(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
            debug!(room = %channel.room_id(), "stopped listening");
        }
    }

    /// Make `room_id` the active room
    ///
    /// An invalid id leaves the current room untouched. If the new channel
    /// cannot be opened the room is still switched (with an empty view) and
    /// [`listen`](Self::listen) can be retried.
    pub fn switch_room(&mut self, room_id: &str) -> ChatResult<()> {
        let room_id = validate_room_id(room_id)?;

        self.stop();
        self.view.send_replace(Vec::new());
        info!(from = %self.current_room, to = %room_id, "switching room");
        self.current_room = room_id.to_string();

        let channel = self.open_channel(room_id)?;
        self.channel = Some(channel);
        Ok(())
    }

    /// Post `text` to the active room
    ///
    /// Resolves with the store-assigned message id once the store has
    /// acknowledged the write.
    pub async fn send_message(&self, text: &str) -> ChatResult<String> {
        let author = self.session.require()?;
        if text.trim().is_empty() {
            return Err(ChatError::Validation("message text is empty".into()));
        }

        let message = Message::compose(text, &author);
        let record = serde_json::to_value(&message)
            .map_err(|e| ChatError::backend("send message", StoreError::from(e)))?;

        let path = room_messages_path(&self.current_room);
        let id = self.store.append(&path, record).await.map_err(|e| {
            warn!(room = %self.current_room, "send failed: {}", e);
            ChatError::backend("send message", e)
        })?;

        info!(room = %self.current_room, id = %id, "message sent");
        Ok(id)
    }

    /// Create a room owned by the signed-in user
    ///
    /// Resolves with the new room's id. The active room does not change.
    pub async fn create_room(&self, name: &str, description: Option<&str>) -> ChatResult<String> {
        let creator = self.session.require()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatError::Validation("room name is empty".into()));
        }

        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let room = Room::new(name, description, &creator);
        let record = serde_json::to_value(&room)
            .map_err(|e| ChatError::backend("create room", StoreError::from(e)))?;

        let id = self.store.append(rooms_path(), record).await.map_err(|e| {
            warn!(name = %name, "room creation failed: {}", e);
            ChatError::backend("create room", e)
        })?;

        info!(id = %id, name = %name, "room created");
        Ok(id)
    }

    /// Id of the active room
    pub fn current_room_id(&self) -> &str {
        &self.current_room
    }

    /// Whether a channel is open on the active room
    pub fn is_listening(&self) -> bool {
        self.channel.as_ref().is_some_and(RoomChannel::is_open)
    }

    /// Current view, oldest first
    pub fn messages(&self) -> Vec<Message> {
        self.view.borrow().clone()
    }

    /// Live view; the receiver immediately holds the current messages
    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.view.subscribe()
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    fn open_channel(&self, room_id: &str) -> ChatResult<RoomChannel> {
        let view = Arc::clone(&self.view);
        let room = room_id.to_string();

        RoomChannel::open(
            Arc::clone(&self.store),
            room_id,
            self.config.message_limit,
            move |mut messages| {
                sort_by_timestamp(&mut messages);
                debug!(room = %room, count = messages.len(), "message snapshot delivered");
                view.send_replace(messages);
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::store::MemoryStore;

    fn synchronizer(session: SessionContext) -> MessageSynchronizer {
        MessageSynchronizer::new(
            Arc::new(MemoryStore::new()),
            session,
            SyncConfig::default(),
        )
    }

    #[test]
    fn test_sync_config_default() {
        let config = SyncConfig::default();
        assert_eq!(config.default_room, "general");
        assert_eq!(config.message_limit, 50);
    }

    #[test]
    fn test_new_synchronizer() {
        let sync = synchronizer(SessionContext::anonymous());
        assert_eq!(sync.current_room_id(), "general");
        assert!(!sync.is_listening());
        assert!(sync.messages().is_empty());
    }

    #[tokio::test]
    async fn test_send_requires_session() {
        let sync = synchronizer(SessionContext::anonymous());
        let err = sync.send_message("hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_create_room_rejects_blank_name() {
        let sync = synchronizer(SessionContext::signed_in(Identity::new("u1")));
        let err = sync.create_room("   ", None).await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }

    #[tokio::test]
    async fn test_switch_room_rejects_blank_id() {
        let mut sync = synchronizer(SessionContext::anonymous());
        sync.listen().unwrap();

        let err = sync.switch_room(" ").unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
        assert_eq!(sync.current_room_id(), "general");
        assert!(sync.is_listening());
    }

    #[test]
    fn test_listen_outside_runtime_fails() {
        let mut sync = synchronizer(SessionContext::anonymous());

        let err = sync.listen().unwrap_err();
        assert!(err.is_recoverable());
        assert!(!sync.is_listening());
    }
}
