//! Unseen-message counters.
//!
//! The server's seen ledger is the source of truth; this store is a
//! read-through cache merging three inputs: the authoritative snapshot fetch,
//! live increments from pushed messages, and optimistic zeroes when the user
//! opens a chat. Reconciliation is one-directional: a snapshot load
//! overwrites everything, which bounds the race between an optimistic
//! zero and a message arriving before the server acknowledges it.

use carelink_proto::{ChatId, UnseenMap};

/// Per-chat unseen counts plus the badge total.
#[derive(Debug, Clone, Default)]
pub struct UnseenCounterStore {
    counts: UnseenMap,
}

impl UnseenCounterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole map with an authoritative server snapshot.
    pub fn load_snapshot(&mut self, snapshot: UnseenMap) {
        self.counts = snapshot;
    }

    /// Count one more unseen message for a chat.
    ///
    /// Chats unknown to the store (for example a chat created concurrently
    /// with the running session) get an entry starting at 1.
    pub fn increment(&mut self, chat_id: ChatId) {
        *self.counts.entry(chat_id).or_insert(0) += 1;
    }

    /// Optimistically zero a chat's count.
    ///
    /// The caller is responsible for issuing the server mark-seen request and
    /// loading the refreshed snapshot afterwards; until then the zero stands,
    /// even if the request fails.
    pub fn mark_seen(&mut self, chat_id: ChatId) {
        self.counts.insert(chat_id, 0);
    }

    /// The badge total: sum of all per-chat counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Unseen count for one chat. Zero if unknown.
    pub fn count(&self, chat_id: ChatId) -> u64 {
        self.counts.get(&chat_id).copied().unwrap_or(0)
    }

    /// The per-chat view backing the badge breakdown.
    pub fn by_chat(&self) -> &UnseenMap {
        &self.counts
    }
}
