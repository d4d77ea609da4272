//! Backend payload models.
//!
//! These structs mirror the portal backend's JSON contracts (directory
//! entries, membership records, pushed messages, unseen-count snapshots) and
//! replace the loosely typed state slices of the original client: every
//! server response is validated into one of these types where it is parsed.
//!
//! Unknown fields are tolerated so the backend can grow its payloads without
//! breaking deployed clients.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::DecodeError;

/// Stable numeric chat identifier.
pub type ChatId = i64;

/// Stable numeric user identifier.
pub type UserId = i64;

/// Per-chat unseen counts as served by the seen ledger.
///
/// Invariant: the badge total equals the sum of the values.
pub type UnseenMap = HashMap<ChatId, u64>;

/// One chat in the user's directory.
///
/// Identity is `chat_id`; the directory is replaced wholesale on refetch, so
/// instances are never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatInfo {
    /// Chat identity.
    #[serde(rename = "chatID")]
    pub chat_id: ChatId,

    /// Display name.
    #[serde(rename = "chatName")]
    pub chat_name: String,

    /// True for group chats, false for direct chats.
    pub group: bool,

    /// Reference to the chat's icon asset. Empty when unset.
    #[serde(rename = "chatIcon", default)]
    pub chat_icon: String,
}

/// One member of a chat.
///
/// Read-only reference data fetched per chat on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMember {
    /// Member identity.
    #[serde(rename = "userID")]
    pub user_id: UserId,

    /// Display name.
    #[serde(rename = "userName")]
    pub user_name: String,

    /// Reference to the member's profile photo. Empty when unset.
    #[serde(rename = "profilePhotoRef", default)]
    pub profile_photo_ref: String,

    /// Portal role of the member.
    #[serde(rename = "userRole", default)]
    pub user_role: String,
}

/// A message pushed on a chat topic.
///
/// Ephemeral: the client keeps no message history, only the side effects
/// (counter increment, observer notification).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Chat the message belongs to.
    #[serde(rename = "chatID")]
    pub chat_id: ChatId,

    /// Sender identity, compared against the session's own user id.
    #[serde(rename = "senderID")]
    pub sender_id: UserId,

    /// Sender display name, for the toast.
    #[serde(rename = "senderName", default)]
    pub sender_name: String,

    /// Message text.
    #[serde(default)]
    pub content: String,

    /// Server timestamp in Unix milliseconds.
    #[serde(default)]
    pub timestamp: i64,
}

impl InboundMessage {
    /// Decode a pushed message from an envelope body.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::Payload` if the body is not a valid message
    /// object.
    pub fn from_json(body: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(body).map_err(|e| DecodeError::Payload(e.to_string()))
    }
}
