//! JSON-encoded broker frames.
//!
//! Every WebSocket text frame carries exactly one `Envelope`, tagged by its
//! `frame` field. The client sends `subscribe`/`unsubscribe`/`send`; the
//! broker delivers `message` broadcasts on subscribed destinations. Bodies
//! are opaque strings at this layer; chat pushes carry a JSON-encoded
//! [`crate::InboundMessage`] that is decoded one level up.
//!
//! # Invariants
//!
//! Round-trip encoding must produce identical values, and decoding arbitrary
//! input must return an error rather than panic (fuzzed in `fuzz/`).

use serde::{Deserialize, Serialize};

use crate::{destination::Destination, errors::DecodeError};

/// One frame on the broker socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "lowercase")]
pub enum Envelope {
    /// Open a subscription for a destination (client to broker).
    Subscribe {
        /// Destination to subscribe.
        destination: Destination,
    },

    /// Drop the subscription for a destination (client to broker).
    Unsubscribe {
        /// Destination to unsubscribe.
        destination: Destination,
    },

    /// Publish a body to a destination, fire-and-forget (client to broker).
    Send {
        /// Destination to publish to.
        destination: Destination,
        /// Opaque payload.
        body: String,
    },

    /// A broadcast delivered on a subscribed destination (broker to client).
    Message {
        /// Destination the broadcast arrived on.
        destination: Destination,
        /// Opaque payload.
        body: String,
    },
}

impl Envelope {
    /// Encode to the wire representation (one JSON text frame).
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::Frame` if serialization fails.
    pub fn encode(&self) -> Result<String, DecodeError> {
        serde_json::to_string(self).map_err(|e| DecodeError::Frame(e.to_string()))
    }

    /// Decode one wire frame.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::Frame` for anything that is not a valid tagged
    /// envelope.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(raw).map_err(|e| DecodeError::Frame(e.to_string()))
    }

    /// The destination this frame addresses.
    pub fn destination(&self) -> &Destination {
        match self {
            Self::Subscribe { destination }
            | Self::Unsubscribe { destination }
            | Self::Send { destination, .. }
            | Self::Message { destination, .. } => destination,
        }
    }
}
