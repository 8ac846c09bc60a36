//! Wire protocol for the worldchat room service.
//!
//! Defines the JSON events exchanged between clients and the server, and the
//! [`RoomId`] key type shared by both halves. Events are internally tagged
//! (`{"event": "...", ...}`) so a single text message is self-describing.
//!
//! The protocol is deliberately small: clients identify themselves, request a
//! seat (specific or automatic), and send chat lines; the server confirms
//! placements, announces joins/leaves, and fans messages out. Nothing here
//! does I/O - transports live in the server and client crates.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod errors;
mod event;
mod room;

pub use errors::{ProtocolError, Result};
pub use event::{ClientEvent, ServerEvent};
pub use room::RoomId;
