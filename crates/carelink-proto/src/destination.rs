//! Broker destination addressing.
//!
//! A destination is the addressable name of one publish/subscribe channel on
//! the broker. Chats map deterministically onto `topic-chat-{id}` topics; the
//! presence announcement published after every handshake goes to the
//! well-known `app-join` destination.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ChatId;

/// Prefix of per-chat topics.
const CHAT_TOPIC_PREFIX: &str = "topic-chat-";

/// Destination of the post-handshake presence announcement.
const JOIN_DESTINATION: &str = "app-join";

/// Wire-level subscription destination.
///
/// Serializes transparently as its string form, so it can be embedded in
/// [`crate::Envelope`] fields and used directly as a registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Destination(String);

impl Destination {
    /// Destination of the topic carrying pushes for one chat.
    pub fn chat(chat_id: ChatId) -> Self {
        Self(format!("{CHAT_TOPIC_PREFIX}{chat_id}"))
    }

    /// The well-known join-announcement destination.
    pub fn join() -> Self {
        Self(JOIN_DESTINATION.to_string())
    }

    /// The raw wire string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Chat id encoded in a chat topic. `None` for non-chat destinations.
    pub fn chat_id(&self) -> Option<ChatId> {
        self.0.strip_prefix(CHAT_TOPIC_PREFIX)?.parse().ok()
    }

    /// Whether this is the join-announcement destination.
    pub fn is_join(&self) -> bool {
        self.0 == JOIN_DESTINATION
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
