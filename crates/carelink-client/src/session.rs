//! Broker session state machine.
//!
//! Manages the lifecycle of the single socket multiplexed over all chat
//! topics. Uses the action pattern: methods mutate state and return actions
//! for the driver to execute. This keeps the state machine pure (no I/O) and
//! makes the subscription semantics directly testable.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐  connect   ┌────────────┐  transport up  ┌───────────┐
//! │ Disconnected │───────────>│ Connecting │───────────────>│ Connected │
//! └──────────────┘            └────────────┘                └───────────┘
//!        ▲                          ▲      transport down          │
//!        │                          └─────────────────────────────┘
//!        │ dispose                       (driver retries with a
//!        └────────── (any state)          fixed delay, no state
//!                                         machine involvement)
//! ```
//!
//! The subscription registry persists across transport drops and is cleared
//! only by `dispose`; a reconnect therefore re-issues wire subscriptions
//! without ever allocating a second handle for a destination.

use std::time::Duration;

use carelink_core::{SubscriptionHandle, SubscriptionRegistry};
use carelink_proto::{Destination, Envelope};

/// Fixed delay between reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default capacity for the driver's command and notification channels.
const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Broker WebSocket URL.
    pub broker_url: String,
    /// Fixed delay between reconnect attempts.
    pub reconnect_delay: Duration,
    /// Capacity of the command channel into the driver.
    pub command_capacity: usize,
    /// Capacity of the notification channel handed to the UI.
    pub notify_capacity: usize,
}

impl SessionConfig {
    /// Configuration with defaults for everything but the broker URL.
    pub fn new(broker_url: impl Into<String>) -> Self {
        Self {
            broker_url: broker_url.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            command_capacity: DEFAULT_CHANNEL_CAPACITY,
            notify_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No transport. Initial state, and terminal after disposal.
    Disconnected,
    /// Transport requested or lost; the driver is (re)trying.
    Connecting,
    /// Transport handshake completed.
    Connected,
}

/// Actions returned by the session state machine.
///
/// The driver (transport task or test harness) executes these:
/// - `OpenTransport`: start the socket retry loop against the URL
/// - `SendFrame`: encode and send one envelope on the live socket
/// - `CloseTransport`: close the socket and stop retrying
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketAction {
    /// Start the transport against this URL.
    OpenTransport {
        /// Broker WebSocket URL.
        url: String,
    },

    /// Send this envelope to the broker.
    SendFrame(Envelope),

    /// Close the transport and stop the retry loop.
    CloseTransport,
}

/// The single broker connection of one authenticated session.
///
/// Owns the transport lifecycle state and the subscription registry. Scoped
/// to one login: construct after authentication, `dispose` on logout, and
/// never share across identities.
#[derive(Debug, Clone)]
pub struct SocketConnection {
    status: ConnectionStatus,
    config: SessionConfig,
    registry: SubscriptionRegistry,
    identity: Option<String>,
    next_token: u64,
}

impl SocketConnection {
    /// Create a new connection in [`ConnectionStatus::Disconnected`] state.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            config,
            registry: SubscriptionRegistry::new(),
            identity: None,
            next_token: 0,
        }
    }

    /// Current status.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The live subscription registry.
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Request the transport. Idempotent.
    ///
    /// Only the first call opens a transport; while connecting or connected
    /// the call is a logged no-op, so repeated connect calls can never
    /// produce a second socket. The identity is announced to the broker on
    /// every completed handshake.
    pub fn connect(&mut self, client_identity: &str) -> Vec<SocketAction> {
        match self.status {
            ConnectionStatus::Disconnected => {
                self.identity = Some(client_identity.to_string());
                self.status = ConnectionStatus::Connecting;
                vec![SocketAction::OpenTransport { url: self.config.broker_url.clone() }]
            },
            ConnectionStatus::Connecting | ConnectionStatus::Connected => {
                tracing::debug!(status = ?self.status, "connect while transport exists, ignoring");
                Vec::new()
            },
        }
    }

    /// Register a subscription for a destination.
    ///
    /// Already-registered destinations return the existing handle with no
    /// wire traffic (logged, not an error). New registrations emit the
    /// subscribe frame immediately when connected; before that the frame is
    /// deferred and flushed by the `Connected` transition, never dropped.
    pub fn subscribe(&mut self, destination: Destination) -> (SubscriptionHandle, Vec<SocketAction>) {
        if let Some(existing) = self.registry.handle(&destination) {
            tracing::debug!(%destination, "already subscribed, returning existing handle");
            return (existing, Vec::new());
        }

        let handle = SubscriptionHandle::new(self.next_token);
        self.next_token += 1;
        self.registry.register(destination.clone(), handle);

        let actions = if self.status == ConnectionStatus::Connected {
            vec![SocketAction::SendFrame(Envelope::Subscribe { destination })]
        } else {
            Vec::new()
        };

        (handle, actions)
    }

    /// Publish a body to a destination, fire-and-forget.
    ///
    /// No delivery acknowledgement is modeled. Without a live transport the
    /// frame is dropped with a debug log.
    pub fn publish(&self, destination: Destination, body: impl Into<String>) -> Vec<SocketAction> {
        if self.status != ConnectionStatus::Connected {
            tracing::debug!(%destination, "publish without live transport, dropping");
            return Vec::new();
        }

        vec![SocketAction::SendFrame(Envelope::Send { destination, body: body.into() })]
    }

    /// Process a completed transport handshake.
    ///
    /// Announces the session identity on the join destination, then issues
    /// one subscribe frame per registered destination: the broker forgets
    /// subscriptions when the socket drops, so this covers both the initial
    /// flush of deferred subscriptions and wire re-subscription after a
    /// reconnect. Handles are untouched.
    pub fn handle_transport_up(&mut self) -> Vec<SocketAction> {
        match self.status {
            ConnectionStatus::Disconnected => {
                tracing::debug!("transport handshake after disposal, ignoring");
                return Vec::new();
            },
            ConnectionStatus::Connected => {
                tracing::debug!("transport handshake while already connected, ignoring");
                return Vec::new();
            },
            ConnectionStatus::Connecting => {},
        }

        self.status = ConnectionStatus::Connected;

        let mut actions = Vec::new();
        if let Some(identity) = &self.identity {
            actions.push(SocketAction::SendFrame(Envelope::Send {
                destination: Destination::join(),
                body: identity.clone(),
            }));
        }

        // Stable wire order
        let mut destinations: Vec<_> = self.registry.destinations().cloned().collect();
        destinations.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        for destination in destinations {
            actions.push(SocketAction::SendFrame(Envelope::Subscribe { destination }));
        }

        actions
    }

    /// Process a transport drop.
    ///
    /// The registry persists; the driver keeps retrying with its fixed delay
    /// and the next handshake re-issues the wire subscriptions.
    pub fn handle_transport_down(&mut self) {
        if self.status == ConnectionStatus::Connected {
            tracing::debug!("transport lost, awaiting reconnect");
            self.status = ConnectionStatus::Connecting;
        }
    }

    /// Tear the session down.
    ///
    /// Unsubscribes every registered destination, closes the transport, and
    /// clears the registry. The only way back is a fresh `connect`.
    pub fn dispose(&mut self) -> Vec<SocketAction> {
        let mut actions = Vec::new();

        if self.status == ConnectionStatus::Connected {
            let mut destinations: Vec<_> = self.registry.destinations().cloned().collect();
            destinations.sort_by(|a, b| a.as_str().cmp(b.as_str()));

            for destination in destinations {
                actions.push(SocketAction::SendFrame(Envelope::Unsubscribe { destination }));
            }
        }

        actions.push(SocketAction::CloseTransport);

        self.registry.unregister_all();
        self.identity = None;
        self.status = ConnectionStatus::Disconnected;

        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig::new("ws://broker.test/ws")
    }

    fn subscribe_frames(actions: &[SocketAction]) -> Vec<&Envelope> {
        actions
            .iter()
            .filter_map(|a| match a {
                SocketAction::SendFrame(env @ Envelope::Subscribe { .. }) => Some(env),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn connect_is_idempotent() {
        let mut socket = SocketConnection::new(config());

        let first = socket.connect("user-7");
        assert_eq!(first.len(), 1);
        assert!(matches!(first[0], SocketAction::OpenTransport { .. }));
        assert_eq!(socket.status(), ConnectionStatus::Connecting);

        // Second and third call while connecting/connected: no new transport.
        assert!(socket.connect("user-7").is_empty());
        socket.handle_transport_up();
        assert!(socket.connect("user-7").is_empty());
    }

    #[test]
    fn handshake_announces_identity() {
        let mut socket = SocketConnection::new(config());
        socket.connect("user-7");

        let actions = socket.handle_transport_up();
        assert_eq!(
            actions.first(),
            Some(&SocketAction::SendFrame(Envelope::Send {
                destination: Destination::join(),
                body: "user-7".to_string(),
            }))
        );
        assert_eq!(socket.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn subscribe_before_handshake_is_deferred() {
        let mut socket = SocketConnection::new(config());
        socket.connect("user-7");

        let (_, actions) = socket.subscribe(Destination::chat(1));
        assert!(actions.is_empty());
        assert!(socket.registry().has(&Destination::chat(1)));

        // Flushed exactly once by the handshake.
        let flushed = socket.handle_transport_up();
        assert_eq!(subscribe_frames(&flushed).len(), 1);
    }

    #[test]
    fn subscribe_while_connected_is_immediate() {
        let mut socket = SocketConnection::new(config());
        socket.connect("user-7");
        socket.handle_transport_up();

        let (_, actions) = socket.subscribe(Destination::chat(2));
        assert_eq!(
            actions,
            vec![SocketAction::SendFrame(Envelope::Subscribe {
                destination: Destination::chat(2),
            })]
        );
    }

    #[test]
    fn duplicate_subscribe_keeps_handle_and_stays_silent() {
        let mut socket = SocketConnection::new(config());
        socket.connect("user-7");
        socket.handle_transport_up();

        let (first, _) = socket.subscribe(Destination::chat(3));
        let (second, actions) = socket.subscribe(Destination::chat(3));

        assert_eq!(first, second);
        assert!(actions.is_empty());
        assert_eq!(socket.registry().len(), 1);
    }

    #[test]
    fn reconnect_reissues_subscriptions_without_new_handles() {
        let mut socket = SocketConnection::new(config());
        socket.connect("user-7");
        socket.handle_transport_up();

        let (handle_a, _) = socket.subscribe(Destination::chat(1));
        let (handle_b, _) = socket.subscribe(Destination::chat(2));

        socket.handle_transport_down();
        assert_eq!(socket.status(), ConnectionStatus::Connecting);
        assert_eq!(socket.registry().len(), 2);

        let actions = socket.handle_transport_up();
        // Join announcement plus one subscribe per registered destination.
        assert_eq!(subscribe_frames(&actions).len(), 2);
        assert_eq!(socket.registry().handle(&Destination::chat(1)), Some(handle_a));
        assert_eq!(socket.registry().handle(&Destination::chat(2)), Some(handle_b));
    }

    #[test]
    fn publish_is_dropped_without_transport() {
        let mut socket = SocketConnection::new(config());
        assert!(socket.publish(Destination::chat(1), "x").is_empty());

        socket.connect("user-7");
        assert!(socket.publish(Destination::chat(1), "x").is_empty());

        socket.handle_transport_up();
        assert_eq!(socket.publish(Destination::chat(1), "x").len(), 1);
    }

    #[test]
    fn dispose_unsubscribes_and_clears() {
        let mut socket = SocketConnection::new(config());
        socket.connect("user-7");
        socket.handle_transport_up();
        socket.subscribe(Destination::chat(1));
        socket.subscribe(Destination::chat(2));

        let actions = socket.dispose();
        let unsubscribes = actions
            .iter()
            .filter(|a| matches!(a, SocketAction::SendFrame(Envelope::Unsubscribe { .. })))
            .count();
        assert_eq!(unsubscribes, 2);
        assert_eq!(actions.last(), Some(&SocketAction::CloseTransport));

        assert_eq!(socket.status(), ConnectionStatus::Disconnected);
        assert!(socket.registry().is_empty());

        // A handshake racing the disposal is ignored.
        assert!(socket.handle_transport_up().is_empty());
        assert_eq!(socket.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn connect_after_dispose_starts_fresh() {
        let mut socket = SocketConnection::new(config());
        socket.connect("user-7");
        socket.handle_transport_up();
        socket.subscribe(Destination::chat(1));
        socket.dispose();

        let actions = socket.connect("user-8");
        assert_eq!(actions.len(), 1);
        assert!(socket.registry().is_empty());
    }
}
