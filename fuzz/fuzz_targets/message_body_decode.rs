//! Fuzz target for InboundMessage::from_json
//!
//! Envelope bodies come straight off the wire; decoding one must reject
//! malformed payloads without panicking, whatever the broker delivers.

#![no_main]

use carelink_proto::InboundMessage;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = InboundMessage::from_json(text);
    }
});
