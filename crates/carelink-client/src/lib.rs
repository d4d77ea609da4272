//! Client
//!
//! Action-based session state machine for the Carelink real-time chat and
//! notification layer. Manages the single broker socket multiplexed over all
//! chat topics, the per-destination subscription registry, and the unseen
//! counters behind the notification badge.
//!
//! # Architecture
//!
//! The session follows the sans-io action pattern: state machines receive
//! events, mutate pure state, and return actions for the caller to execute.
//! All mutation is confined to whichever task drives the machines (the
//! provided transport driver is such a single-writer task), so no locking is
//! involved.
//!
//! # Components
//!
//! - [`SocketConnection`]: transport lifecycle and subscription dedup
//! - [`Coordinator`]: provisioning, inbound fan-out, unseen reconciliation
//! - [`SeenLedger`]: seam to the REST-backed directory and seen ledger
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::ConnectedChannel`]: a running session with command and
//!   notification channels
//! - [`transport::spawn`]: start the WebSocket driver with fixed-delay
//!   reconnect

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod coordinator;
mod error;
mod ledger;
mod session;

#[cfg(feature = "transport")]
pub mod transport;

pub use carelink_core::{
    ChatDirectory, SubscriptionHandle, SubscriptionRegistry, UnseenCounterStore,
};
pub use carelink_proto::{
    ChatId, ChatInfo, ChatMember, Destination, Envelope, InboundMessage, UnseenMap, UserId,
};
pub use coordinator::{Coordinator, CoordinatorAction, Phase};
pub use error::{LedgerError, TransportError};
pub use ledger::SeenLedger;
pub use session::{
    ConnectionStatus, DEFAULT_RECONNECT_DELAY, SessionConfig, SocketAction, SocketConnection,
};
