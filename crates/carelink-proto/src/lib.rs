//! Wire types for the Carelink chat broker and portal backend.
//!
//! The broker speaks tagged JSON over WebSocket text frames: every frame is
//! one [`Envelope`], addressed by a [`Destination`]. Backend payloads (chat
//! directory entries, unseen-count snapshots, pushed messages) are plain JSON
//! objects decoded into the precisely typed structs in this crate.
//!
//! Decoding is validated at this boundary: malformed input produces a
//! [`DecodeError`], never a panic. The decoder is fuzzed (see `fuzz/`).

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod destination;
mod envelope;
mod errors;
mod model;

pub use destination::Destination;
pub use envelope::Envelope;
pub use errors::DecodeError;
pub use model::{ChatId, ChatInfo, ChatMember, InboundMessage, UnseenMap, UserId};
