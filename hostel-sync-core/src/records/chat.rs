use chrono::{DateTime, Utc};

use crate::decode::{self, Decode};
use crate::document::{CollectionPath, DocPath, Fields, PathError};

/// Conversation between the admin desk and one participant
/// (`conversations/{participantId}`).
///
/// The `last*` fields are denormalized from the newest message for list
/// previews and are merge-updated on every send.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    pub participant_id: String,
    pub participant_name: String,
    pub last_message: String,
    pub last_message_time: Option<DateTime<Utc>>,
    pub last_sender_id: String,
    pub unread_count: u32,
}

impl Conversation {
    pub fn collection() -> CollectionPath {
        CollectionPath::known("conversations")
    }

    pub fn path(participant_id: &str) -> Result<DocPath, PathError> {
        Self::collection().doc(participant_id)
    }

    /// Append-only message log of a conversation.
    pub fn messages(participant_id: &str) -> Result<CollectionPath, PathError> {
        Self::path(participant_id)?.child("messages")
    }
}

impl Decode for Conversation {
    fn decode(id: &str, fields: &Fields) -> Self {
        Self {
            participant_id: id.to_string(),
            participant_name: decode::string_or(fields, "participantName", id),
            last_message: decode::string(fields, "lastMessage"),
            last_message_time: decode::timestamp(fields, "lastMessageTime"),
            last_sender_id: decode::string(fields, "lastSenderId"),
            unread_count: u32::try_from(decode::integer(fields, "unreadCount").max(0))
                .unwrap_or(u32::MAX),
        }
    }
}

/// One chat message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender_id: String,
    pub sender_name: String,
    /// Server time; `None` until the write has been applied.
    pub created_at: Option<DateTime<Utc>>,
    pub read: bool,
}

impl Decode for ChatMessage {
    fn decode(id: &str, fields: &Fields) -> Self {
        Self {
            id: id.to_string(),
            text: decode::string(fields, "text"),
            sender_id: decode::string(fields, "senderId"),
            sender_name: decode::string(fields, "senderName"),
            created_at: decode::timestamp(fields, "createdAt"),
            read: decode::boolean(fields, "read"),
        }
    }
}
