//! Protocol error types.
//!
//! Strongly typed so callers can tell a malformed room key apart from a
//! malformed event without string matching.

use thiserror::Error;

/// Convenience alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding, decoding, or validating wire data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Room id string does not match the `room_<positive integer>` pattern.
    #[error("invalid room id: {0:?}")]
    InvalidRoomId(String),

    /// Room number is not a positive integer.
    #[error("invalid room number: {0}")]
    InvalidRoomNumber(i64),

    /// Event could not be serialized to JSON.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Inbound text was not a valid event.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}
