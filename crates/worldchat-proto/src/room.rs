//! Room identifiers.
//!
//! Rooms are keyed by a positive integer rendered as `room_<n>` on the wire
//! and in persisted session records. Ordering follows the numeric suffix, not
//! the string form, because the assignment policy scans rooms from the lowest
//! number upward and clients display the number as a human-facing "world
//! channel".

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ProtocolError;

/// Wire prefix for room keys.
const ROOM_PREFIX: &str = "room_";

/// Identifier of a chat room.
///
/// Wraps the positive room number. The wire form is `room_<n>`; anything else
/// fails to parse. Comparison is numeric, so `room_10` sorts after `room_9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomId(u32);

impl RoomId {
    /// Create a room id from a positive room number.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidRoomNumber`] for zero.
    pub fn from_number(number: u32) -> Result<Self, ProtocolError> {
        if number == 0 {
            return Err(ProtocolError::InvalidRoomNumber(0));
        }
        Ok(Self(number))
    }

    /// The positive room number behind this id.
    pub fn number(self) -> u32 {
        self.0
    }

    /// The lowest room id, `room_1`.
    pub const fn first() -> Self {
        Self(1)
    }

    /// The next room id, saturating at the numeric ceiling.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ROOM_PREFIX}{}", self.0)
    }
}

impl FromStr for RoomId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix(ROOM_PREFIX)
            .ok_or_else(|| ProtocolError::InvalidRoomId(s.to_string()))?;

        // `u32::from_str` tolerates a leading `+`; the wire pattern does not.
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ProtocolError::InvalidRoomId(s.to_string()));
        }

        let number: u32 =
            digits.parse().map_err(|_| ProtocolError::InvalidRoomId(s.to_string()))?;

        Self::from_number(number).map_err(|_| ProtocolError::InvalidRoomId(s.to_string()))
    }
}

impl Serialize for RoomId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RoomId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
