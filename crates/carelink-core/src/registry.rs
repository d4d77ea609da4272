//! Subscription bookkeeping.
//!
//! The registry tracks which destinations currently have a live subscription
//! handle. It is the dedup authority for the whole session: repeated connect
//! calls and directory refreshes consult it before issuing any wire traffic,
//! so a destination is never subscribed twice.
//!
//! # Invariants
//!
//! At most one entry per destination. Registering an already-registered
//! destination keeps the first handle (logged, not an error); duplicate
//! subscription attempts are expected during reconnects and refreshes.

use std::collections::HashMap;

use carelink_proto::Destination;

/// Opaque token identifying one live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    /// Wrap a raw token value.
    pub fn new(token: u64) -> Self {
        Self(token)
    }

    /// The raw token value.
    pub fn token(self) -> u64 {
        self.0
    }
}

/// Live subscriptions keyed by destination.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    entries: HashMap<Destination, SubscriptionHandle>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a destination has a live subscription.
    pub fn has(&self, destination: &Destination) -> bool {
        self.entries.contains_key(destination)
    }

    /// The live handle for a destination. `None` if not registered.
    pub fn handle(&self, destination: &Destination) -> Option<SubscriptionHandle> {
        self.entries.get(destination).copied()
    }

    /// Register a subscription, first-write-wins.
    ///
    /// Returns the handle that is live after the call: the given one if the
    /// destination was free, the previously stored one otherwise.
    pub fn register(
        &mut self,
        destination: Destination,
        handle: SubscriptionHandle,
    ) -> SubscriptionHandle {
        if let Some(existing) = self.entries.get(&destination) {
            tracing::debug!(%destination, "destination already subscribed, keeping handle");
            return *existing;
        }

        self.entries.insert(destination, handle);
        handle
    }

    /// Drop every entry. Only deliberate disposal clears the registry; it
    /// persists across transport reconnects.
    pub fn unregister_all(&mut self) {
        self.entries.clear();
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no subscriptions are live.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the registered destinations (unordered).
    pub fn destinations(&self) -> impl Iterator<Item = &Destination> {
        self.entries.keys()
    }
}
