//! Data models for roomsync
//!
//! Defines the records exchanged with the realtime store: Message and Room.
//! Field names serialize in camelCase to match the stored record shape. The
//! `id` of either record is the store key and is never written into it.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Email stored on messages from identities without one
const UNKNOWN_EMAIL: &str = "Unknown";

/// A chat message in one room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Store-assigned key, absent before the write is acknowledged
    #[serde(skip)]
    pub id: Option<String>,
    /// Message body
    pub text: String,
    /// Author's user id
    pub user_id: String,
    /// Author's email, or "Unknown"
    #[serde(default)]
    pub user_email: String,
    /// Author's display label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// Client clock at send time, epoch milliseconds
    pub timestamp: i64,
    /// ISO-8601 creation time
    #[serde(default)]
    pub created_at: String,
}

impl Message {
    /// Compose an unsent message authored by `author`
    pub fn compose(text: impl Into<String>, author: &Identity) -> Self {
        Self::compose_at(text, author, Utc::now())
    }

    /// Compose an unsent message with an explicit send time
    pub fn compose_at(text: impl Into<String>, author: &Identity, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            text: text.into(),
            user_id: author.uid.clone(),
            user_email: author
                .email
                .clone()
                .unwrap_or_else(|| UNKNOWN_EMAIL.to_string()),
            user_name: Some(author.display_label()),
            timestamp: now.timestamp_millis(),
            created_at: iso_timestamp(now),
        }
    }

    /// Whether this message was written by `uid`
    pub fn is_from(&self, uid: &str) -> bool {
        self.user_id == uid
    }

    /// Label to show for the author
    pub fn author_label(&self) -> &str {
        self.user_name.as_deref().unwrap_or(&self.user_email)
    }
}

/// Sort messages ascending by timestamp
///
/// The sort is stable, so messages sharing a timestamp keep delivery order.
pub fn sort_by_timestamp(messages: &mut [Message]) {
    messages.sort_by_key(|m| m.timestamp);
}

/// A chat room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Store-assigned key
    #[serde(skip)]
    pub id: Option<String>,
    /// Room name (empty for rooms that only ever received messages)
    #[serde(default)]
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// User id of the creator
    #[serde(default)]
    pub created_by: String,
    /// ISO-8601 creation time
    #[serde(default)]
    pub created_at: String,
    /// Cached copy of the most recent message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Message>,
    /// Number of participants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_count: Option<u32>,
}

impl Room {
    /// Create a new room record created by `creator`, who is its only participant
    pub fn new(name: impl Into<String>, description: Option<String>, creator: &Identity) -> Self {
        Self {
            id: None,
            name: name.into(),
            description,
            created_by: creator.uid.clone(),
            created_at: iso_timestamp(Utc::now()),
            last_message: None,
            participant_count: Some(1),
        }
    }

    /// Name to show for this room, falling back to its id
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            return &self.name;
        }
        self.id.as_deref().unwrap_or_default()
    }
}

/// Format a time the way the store's `createdAt` fields expect
fn iso_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ada() -> Identity {
        Identity::new("uid-ada").with_email("ada@example.com")
    }

    fn message_at(ts: i64) -> Message {
        let mut msg = Message::compose("hi", &ada());
        msg.timestamp = ts;
        msg
    }

    #[test]
    fn test_compose_message() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let msg = Message::compose_at("hello", &ada(), now);

        assert!(msg.id.is_none());
        assert_eq!(msg.text, "hello");
        assert_eq!(msg.user_id, "uid-ada");
        assert_eq!(msg.user_email, "ada@example.com");
        assert_eq!(msg.user_name.as_deref(), Some("ada"));
        assert_eq!(msg.timestamp, now.timestamp_millis());
        assert_eq!(msg.created_at, "2024-05-01T12:30:00.000Z");
    }

    #[test]
    fn test_compose_without_email() {
        let msg = Message::compose("hello", &Identity::new("u2"));
        assert_eq!(msg.user_email, "Unknown");
        assert_eq!(msg.author_label(), "Anonymous");
        assert!(msg.is_from("u2"));
    }

    #[test]
    fn test_record_shape() {
        let msg = Message::compose("hello", &ada());
        let value = serde_json::to_value(&msg).unwrap();

        assert!(value.get("id").is_none());
        assert!(value.get("userId").is_some());
        assert!(value.get("userEmail").is_some());
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn test_sort_by_timestamp() {
        let mut messages = vec![message_at(300), message_at(100), message_at(200)];
        sort_by_timestamp(&mut messages);

        let order: Vec<i64> = messages.iter().map(|m| m.timestamp).collect();
        assert_eq!(order, vec![100, 200, 300]);
    }

    #[test]
    fn test_new_room() {
        let room = Room::new("Team X", None, &ada());
        assert_eq!(room.created_by, "uid-ada");
        assert_eq!(room.participant_count, Some(1));

        let value = serde_json::to_value(&room).unwrap();
        assert_eq!(value["participantCount"], 1);
        assert_eq!(value["createdBy"], "uid-ada");
        assert!(value.get("description").is_none());
    }

    #[test]
    fn test_room_without_metadata() {
        let value = serde_json::json!({ "messages": { "k1": { "text": "hi" } } });
        let mut room: Room = serde_json::from_value(value).unwrap();
        room.id = Some("general".to_string());

        assert!(room.name.is_empty());
        assert_eq!(room.display_name(), "general");
    }
}
