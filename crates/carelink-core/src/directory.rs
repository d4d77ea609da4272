//! The user's chat directory.
//!
//! Holds the externally fetched list of chats the current user belongs to
//! and maps it onto broker destinations. The list is replaced wholesale on
//! every refetch; the session diffs it against the subscription registry and
//! subscribes only to destinations that are not yet live. Nothing is ever
//! unsubscribed implicitly; chats leaving a user's list is rare and out of
//! scope.

use carelink_proto::{ChatId, ChatInfo, Destination};

use crate::registry::SubscriptionRegistry;

/// The chats the current user belongs to.
#[derive(Debug, Clone, Default)]
pub struct ChatDirectory {
    chats: Vec<ChatInfo>,
}

impl ChatDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the directory with a freshly fetched chat list.
    pub fn replace(&mut self, chats: Vec<ChatInfo>) {
        self.chats = chats;
    }

    /// All chats, in fetch order.
    pub fn chats(&self) -> &[ChatInfo] {
        &self.chats
    }

    /// Look up a chat by id.
    pub fn get(&self, chat_id: ChatId) -> Option<&ChatInfo> {
        self.chats.iter().find(|c| c.chat_id == chat_id)
    }

    /// Whether a chat is in the directory.
    pub fn contains(&self, chat_id: ChatId) -> bool {
        self.get(chat_id).is_some()
    }

    /// Number of chats.
    pub fn len(&self) -> usize {
        self.chats.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    /// The broker destination of every chat, in directory order.
    pub fn destinations(&self) -> impl Iterator<Item = Destination> + '_ {
        self.chats.iter().map(|c| Destination::chat(c.chat_id))
    }

    /// Destinations that do not yet have a live subscription.
    ///
    /// This is the diff the session subscribes after a directory refresh.
    pub fn missing_from(&self, registry: &SubscriptionRegistry) -> Vec<Destination> {
        self.destinations().filter(|d| !registry.has(d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use carelink_proto::ChatInfo;

    use super::*;
    use crate::registry::SubscriptionHandle;

    fn chat(chat_id: ChatId) -> ChatInfo {
        ChatInfo {
            chat_id,
            chat_name: format!("chat {chat_id}"),
            group: false,
            chat_icon: String::new(),
        }
    }

    #[test]
    fn destinations_follow_directory_order() {
        let mut directory = ChatDirectory::new();
        directory.replace(vec![chat(2), chat(1)]);

        let destinations: Vec<_> = directory.destinations().collect();
        assert_eq!(destinations, vec![Destination::chat(2), Destination::chat(1)]);
    }

    #[test]
    fn missing_from_skips_registered() {
        let mut directory = ChatDirectory::new();
        directory.replace(vec![chat(1), chat(2), chat(3)]);

        let mut registry = SubscriptionRegistry::new();
        registry.register(Destination::chat(1), SubscriptionHandle::new(1));
        registry.register(Destination::chat(2), SubscriptionHandle::new(2));

        assert_eq!(directory.missing_from(&registry), vec![Destination::chat(3)]);
    }

    #[test]
    fn replace_is_wholesale() {
        let mut directory = ChatDirectory::new();
        directory.replace(vec![chat(1)]);
        directory.replace(vec![chat(2)]);

        assert!(!directory.contains(1));
        assert!(directory.contains(2));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn lookup_by_id() {
        let mut directory = ChatDirectory::new();
        directory.replace(vec![chat(4)]);

        assert_eq!(directory.get(4).map(|c| c.chat_id), Some(4));
        assert!(directory.get(5).is_none());
        assert!(!directory.is_empty());
    }
}
