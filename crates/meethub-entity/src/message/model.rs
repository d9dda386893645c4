//! Chat message entity and last-message summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use meethub_core::types::id::{MessageId, RoomId, UserId};

/// Maximum snippet length carried in a room's last-message summary.
const SNIPPET_MAX_CHARS: usize = 80;

/// A chat message.
///
/// Messages are persisted by the storage collaborator; the realtime core
/// only routes them and derives unread counts and summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Room the message was sent to.
    pub room_id: RoomId,
    /// Author.
    pub sender_id: UserId,
    /// Author display name at send time.
    pub sender_name: String,
    /// Message body.
    pub text: String,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message.
    pub fn new(
        room_id: RoomId,
        sender_id: UserId,
        sender_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            room_id,
            sender_id,
            sender_name: sender_name.into(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// Summary of a room's most recent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMessage {
    /// The message.
    pub message_id: MessageId,
    /// Author.
    pub sender_id: UserId,
    /// Truncated body text.
    pub snippet: String,
    /// When the message was sent.
    pub sent_at: DateTime<Utc>,
}

impl LastMessage {
    /// Build a summary from message text, truncating to the snippet limit.
    pub fn from_text(
        message_id: MessageId,
        sender_id: UserId,
        text: &str,
        sent_at: DateTime<Utc>,
    ) -> Self {
        let snippet = if text.chars().count() > SNIPPET_MAX_CHARS {
            let truncated: String = text.chars().take(SNIPPET_MAX_CHARS).collect();
            format!("{truncated}…")
        } else {
            text.to_string()
        };

        Self {
            message_id,
            sender_id,
            snippet,
            sent_at,
        }
    }
}
