//! Client and server wire events.
//!
//! Every event is one JSON text message, internally tagged with an `event`
//! field. Payload shapes mirror the room-placement protocol: placement
//! confirmations carry the full room status so clients can persist it, and
//! join/leave announcements carry a pre-rendered human message alongside the
//! raw counts.

use serde::{Deserialize, Serialize};

use crate::{errors::ProtocolError, room::RoomId};

/// Events sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Set or replace the connection's display name.
    Identify {
        /// Display name the server should associate with this connection.
        nickname: String,
    },

    /// Fan a chat line out to the sender's current room.
    SendMessage {
        /// Display name to attribute the line to.
        nickname: String,
        /// Chat text.
        text: String,
    },

    /// Request a seat in a specific room.
    ///
    /// Carried as a plain signed integer so the server can treat a
    /// non-positive number as "no room requested" instead of the whole
    /// event dying at the decode layer.
    JoinSpecificRoom {
        /// Requested room number; must be positive to name a room.
        room_number: i64,
    },

    /// Ask the server to pick the room.
    RequestAutoRoomAssignment,
}

/// Events sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The requesting connection now occupies a room.
    RoomAssigned {
        /// Room the connection was placed in.
        room_id: RoomId,
        /// Member count after placement, including the new member.
        member_count: u32,
        /// Maximum members per room.
        capacity: u32,
        /// Display name of the placed connection, when it has identified.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nickname: Option<String>,
        /// Numeric room number, duplicated for direct display.
        room_number: u32,
    },

    /// Another member entered the recipient's room.
    UserJoined {
        /// Room the join happened in.
        room_id: RoomId,
        /// Member count after the join.
        member_count: u32,
        /// Pre-rendered announcement line.
        message: String,
    },

    /// A member left the recipient's room.
    UserLeft {
        /// Room the leave happened in.
        room_id: RoomId,
        /// Member count after the leave.
        member_count: u32,
        /// Pre-rendered announcement line.
        message: String,
    },

    /// A chat line addressed to everyone in the room, sender included.
    Message {
        /// Display name the line is attributed to.
        user: String,
        /// Chat text.
        text: String,
        /// Server-assigned send time, unix milliseconds.
        timestamp_ms: u64,
    },

    /// The explicitly requested room had no free seat.
    ///
    /// Informational only: the server follows up with a fresh
    /// [`ServerEvent::RoomAssigned`] for the fallback room, so the requested
    /// and granted rooms stay distinguishable.
    RoomFull {
        /// Pre-rendered explanation naming the requested room.
        message: String,
    },
}

impl ClientEvent {
    /// Encode the event as a JSON text message.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// Decode an event from a JSON text message.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}

impl ServerEvent {
    /// Encode the event as a JSON text message.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// Decode an event from a JSON text message.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}
