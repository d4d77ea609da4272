//! Decode errors for wire input.
//!
//! Malformed broker frames and backend payloads are rejected with a typed
//! error at the parse boundary. Nothing here is fatal to the host
//! application; callers log and drop the offending input.

use thiserror::Error;

/// Error decoding wire input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The text frame is not a valid tagged envelope.
    #[error("malformed broker frame: {0}")]
    Frame(String),

    /// The envelope body is not a valid payload of the expected type.
    #[error("malformed payload: {0}")]
    Payload(String),
}
