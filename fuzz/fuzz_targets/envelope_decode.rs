//! Fuzz target for Envelope::decode
//!
//! This fuzzer tests broker frame decoding with arbitrary byte sequences to
//! find:
//! - Parser crashes or panics
//! - Pathological inputs in the tagged-enum dispatch
//! - Unicode edge cases in destination and body strings
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use carelink_proto::Envelope;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Attempt to decode arbitrary bytes as a broker frame
    // This should never panic, only return Err for invalid data
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = Envelope::decode(text);
    }
});
