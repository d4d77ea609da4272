//! Error types for the session layer.
//!
//! Nothing in this subsystem is fatal to the host application: transport
//! failures are retried by the driver, duplicate subscriptions are silent
//! no-ops, and ledger failures degrade to a stale badge until the next
//! snapshot load.

use carelink_proto::ChatId;
use thiserror::Error;

/// Errors from the REST-backed collaborators (directory, seen ledger).
///
/// Surfaced to the caller via logs; unseen counts keep their last-known
/// values rather than being cleared. An optimistic mark-seen zero is not
/// rolled back on failure; the next snapshot load is the recovery path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The chat directory could not be fetched.
    #[error("directory fetch failed: {reason}")]
    Directory {
        /// What went wrong.
        reason: String,
    },

    /// The unseen snapshot could not be fetched.
    #[error("unseen snapshot fetch failed: {reason}")]
    Snapshot {
        /// What went wrong.
        reason: String,
    },

    /// The mark-seen acknowledgement was not obtained.
    #[error("mark-seen failed for chat {chat_id}: {reason}")]
    MarkSeen {
        /// Chat whose counter was already zeroed optimistically.
        chat_id: ChatId,
        /// What went wrong.
        reason: String,
    },

    /// A chat's member list could not be fetched.
    #[error("member fetch failed for chat {chat_id}: {reason}")]
    Members {
        /// Chat whose members were requested.
        chat_id: ChatId,
        /// What went wrong.
        reason: String,
    },
}

/// Transport-level errors.
///
/// Connection and handshake failures are consumed by the driver's fixed-delay
/// retry loop; the variants here surface only through the channel handle.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The socket could not be opened.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The driver task is gone; the session was disposed or aborted.
    #[error("driver command channel closed")]
    ChannelClosed,
}
