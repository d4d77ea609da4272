//! Session orchestration.
//!
//! The [`Coordinator`] ties the socket, the chat directory, and the unseen
//! counters together for one authenticated session. It is the single fan-out
//! point for inbound broker traffic: counting, UI notification, and ledger
//! reconciliation all happen here rather than inside transport callbacks.
//!
//! Like the session it is a pure state machine (events in, actions out), so
//! the full provisioning and reconnect behavior is testable without a
//! socket.
//!
//! # Phases
//!
//! 1. **Idle**: no directory loaded, no transport requested.
//! 2. **Provisioning**: directory loaded, transport requested, chat
//!    subscriptions registered (deferred until the handshake).
//! 3. **Live**: handshake completed; inbound pushes are routed. Directory
//!    refreshes re-enter here and subscribe only new destinations.

use carelink_core::{ChatDirectory, UnseenCounterStore};
use carelink_proto::{ChatId, ChatInfo, Destination, Envelope, InboundMessage, UnseenMap, UserId};

use crate::session::{ConnectionStatus, SessionConfig, SocketAction, SocketConnection};

/// Coordinator lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No directory loaded yet.
    Idle,
    /// Directory loaded, waiting for the transport handshake.
    Provisioning,
    /// Connected and routing inbound pushes.
    Live,
}

/// Actions produced by the coordinator for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorAction {
    /// Execute a socket action (open, send frame, close).
    Transport(SocketAction),

    /// Hand a pushed message to the UI observer (toast).
    NotifyMessage(InboundMessage),

    /// Refetch the authoritative unseen snapshot from the seen ledger and
    /// feed it back via [`Coordinator::snapshot_loaded`].
    FetchSnapshot,

    /// Push a mark-seen acknowledgement to the seen ledger, then refetch the
    /// snapshot to reconcile.
    PushSeen {
        /// Chat whose counter was zeroed optimistically.
        chat_id: ChatId,
    },
}

/// Orchestrates the chat/notification session.
///
/// One instance per authenticated session: construct at login, `dispose` at
/// logout. Nothing here is process-global.
#[derive(Debug, Clone)]
pub struct Coordinator {
    socket: SocketConnection,
    directory: ChatDirectory,
    unseen: UnseenCounterStore,
    user_id: UserId,
    phase: Phase,
}

impl Coordinator {
    /// Create an idle coordinator for one user.
    pub fn new(user_id: UserId, config: SessionConfig) -> Self {
        Self {
            socket: SocketConnection::new(config),
            directory: ChatDirectory::new(),
            unseen: UnseenCounterStore::new(),
            user_id,
            phase: Phase::Idle,
        }
    }

    /// The session's user id.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current transport status.
    pub fn status(&self) -> ConnectionStatus {
        self.socket.status()
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        self.socket.config()
    }

    /// The chats the session is following.
    pub fn directory(&self) -> &ChatDirectory {
        &self.directory
    }

    /// Badge total across all chats.
    pub fn unseen_total(&self) -> u64 {
        self.unseen.total()
    }

    /// Unseen count for one chat.
    pub fn unseen_count(&self, chat_id: ChatId) -> u64 {
        self.unseen.count(chat_id)
    }

    /// Per-chat unseen view.
    pub fn unseen_by_chat(&self) -> &UnseenMap {
        self.unseen.by_chat()
    }

    /// Process a freshly fetched chat directory.
    ///
    /// The first load requests the transport; every load diffs the directory
    /// against the subscription registry and subscribes only destinations
    /// without a live subscription. Existing subscriptions are never
    /// implicitly dropped.
    pub fn directory_loaded(&mut self, chats: Vec<ChatInfo>) -> Vec<CoordinatorAction> {
        self.directory.replace(chats);

        let mut actions = Vec::new();

        if self.phase == Phase::Idle {
            self.phase = Phase::Provisioning;
            let identity = self.user_id.to_string();
            actions.extend(
                self.socket.connect(&identity).into_iter().map(CoordinatorAction::Transport),
            );
        }

        for destination in self.directory.missing_from(self.socket.registry()) {
            let (_, socket_actions) = self.socket.subscribe(destination);
            actions.extend(socket_actions.into_iter().map(CoordinatorAction::Transport));
        }

        actions
    }

    /// Process a completed transport handshake.
    pub fn transport_up(&mut self) -> Vec<CoordinatorAction> {
        let actions = self.socket.handle_transport_up();

        if self.phase == Phase::Provisioning && self.status() == ConnectionStatus::Connected {
            self.phase = Phase::Live;
        }

        actions.into_iter().map(CoordinatorAction::Transport).collect()
    }

    /// Process a transport drop. Invisible above this layer; the driver
    /// retries and the next handshake restores the wire subscriptions.
    pub fn transport_down(&mut self) {
        self.socket.handle_transport_down();
    }

    /// Route one inbound broker frame.
    ///
    /// Chat pushes fan out to the unseen counters (foreign senders only),
    /// the UI observer, and (for foreign senders) a snapshot refetch that
    /// reconciles any counting drift. Chats missing from the directory are
    /// still counted; undecodable bodies are logged and dropped.
    pub fn frame_received(&mut self, envelope: Envelope) -> Vec<CoordinatorAction> {
        let Envelope::Message { destination, body } = envelope else {
            tracing::debug!("unexpected frame kind from broker, ignoring");
            return Vec::new();
        };

        if destination.chat_id().is_none() {
            tracing::debug!(%destination, "broadcast on non-chat destination, ignoring");
            return Vec::new();
        }

        let message = match InboundMessage::from_json(&body) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(%destination, %error, "dropping undecodable chat push");
                return Vec::new();
            },
        };

        let mut actions = Vec::new();
        let foreign = message.sender_id != self.user_id;

        if foreign {
            self.unseen.increment(message.chat_id);
        }

        actions.push(CoordinatorAction::NotifyMessage(message));

        if foreign {
            actions.push(CoordinatorAction::FetchSnapshot);
        }

        actions
    }

    /// Load an authoritative unseen snapshot from the seen ledger.
    pub fn snapshot_loaded(&mut self, snapshot: UnseenMap) {
        self.unseen.load_snapshot(snapshot);
    }

    /// Mark a chat as seen.
    ///
    /// Zeroes the local counter immediately for UI responsiveness and asks
    /// the driver to push the acknowledgement; the snapshot reload on its
    /// response reconciles messages that raced the acknowledgement.
    pub fn mark_seen(&mut self, chat_id: ChatId) -> Vec<CoordinatorAction> {
        self.unseen.mark_seen(chat_id);
        vec![CoordinatorAction::PushSeen { chat_id }]
    }

    /// Publish a body to a destination, fire-and-forget.
    pub fn publish(
        &mut self,
        destination: Destination,
        body: impl Into<String>,
    ) -> Vec<CoordinatorAction> {
        self.socket
            .publish(destination, body)
            .into_iter()
            .map(CoordinatorAction::Transport)
            .collect()
    }

    /// Tear the session down. Terminal; a logout/login cycle builds a fresh
    /// coordinator instead of reusing this one.
    pub fn dispose(&mut self) -> Vec<CoordinatorAction> {
        self.phase = Phase::Idle;
        self.socket.dispose().into_iter().map(CoordinatorAction::Transport).collect()
    }
}
