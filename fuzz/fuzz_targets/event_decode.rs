//! Fuzz target for wire event decoding
//!
//! This fuzzer tests event and room-key decoding with arbitrary text to find:
//! - Parser crashes or panics
//! - Integer overflows in room number parsing
//! - Malformed payloads that bypass validation
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use worldchat_proto::{ClientEvent, RoomId, ServerEvent};

fuzz_target!(|data: &[u8]| {
    // Attempt to decode arbitrary text as wire events and room keys
    // This should never panic, only return Err for invalid data
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = ClientEvent::from_json(text);
        let _ = ServerEvent::from_json(text);
        let _ = text.parse::<RoomId>();
    }
});
