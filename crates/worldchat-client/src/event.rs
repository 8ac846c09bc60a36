//! Session events and actions.
//!
//! The caller (UI shell plus transport) feeds [`SessionEvent`]s in and
//! executes the returned [`SessionAction`]s. The session itself never
//! touches a socket, the location bar, or the screen.

use worldchat_proto::{ClientEvent, RoomId, ServerEvent};

/// Where a room-resolution attempt got its target from.
///
/// Precedence is fixed: the location fragment outranks the stored session
/// record, which outranks automatic assignment. Keeping the source explicit
/// makes the precedence testable on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// A room number embedded in the current location fragment.
    Location,
    /// A valid persisted session record.
    Stored,
    /// Server-side automatic assignment.
    Auto,
}

/// Events the caller feeds into the session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The hosting surface is ready; begin the session. Fired once.
    Start,

    /// The transport finished connecting.
    Connected,

    /// An event arrived from the server.
    Server(ServerEvent),

    /// The transport dropped without an explicit leave.
    ConnectionLost {
        /// Human-readable cause, for the system log.
        reason: String,
    },

    /// The location fragment changed (back/forward navigation).
    LocationChanged {
        /// The new fragment, with or without its leading `#`.
        fragment: String,
    },

    /// The user submitted a chat line.
    SubmitMessage {
        /// Raw input text; blank input is dropped.
        text: String,
    },

    /// The user explicitly left the room.
    Leave,
}

/// Actions the session produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Open a connection to the server.
    Connect,

    /// Close the connection.
    Disconnect,

    /// Send a wire event to the server.
    Send(ClientEvent),

    /// Rewrite the visible location fragment.
    SetLocation {
        /// Fragment to show, including the leading `#`.
        fragment: String,
    },

    /// Reset the location to the room-less state.
    ResetLocation,

    /// Append a system line to the visible log.
    AppendSystem {
        /// Line to append.
        text: String,
    },

    /// Append a chat line to the visible log.
    AppendChat {
        /// Display name the line is attributed to.
        user: String,
        /// Chat text.
        text: String,
        /// Server-assigned send time, unix milliseconds.
        timestamp_ms: u64,
    },

    /// Update the room indicator and notify the roster UI.
    RoomStatusChanged {
        /// Current room.
        room_id: RoomId,
        /// Current member count.
        member_count: u32,
        /// Room capacity.
        capacity: u32,
    },

    /// Return room-specific UI to its pre-join state.
    ResetRoomUi,
}
