//! Worldchat session client.
//!
//! Action-based session state machine for the worldchat room service.
//! Manages one connection's lifecycle: display-name resolution, connecting
//! and identifying, room resolution (location fragment, then stored session
//! record, then automatic assignment), and rendering of inbound events.
//!
//! # Architecture
//!
//! The session follows the sans-IO pattern: it receives [`SessionEvent`]s,
//! processes them through pure state machine logic, and returns
//! [`SessionAction`]s for the caller to execute. Persistence goes through
//! the [`SessionStore`] trait so the record survives restarts in production
//! (file-backed) and stays in memory under test.
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::ConnectedSession`]: session with WebSocket transport
//! - [`transport::connect`]: connect to a server

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod event;
mod identity;
mod location;
mod session;
mod store;

#[cfg(feature = "transport")]
pub mod transport;

pub use event::{ResolutionSource, SessionAction, SessionEvent};
pub use identity::{NameSources, resolve_display_name};
pub use location::{fragment_for_room, room_from_fragment};
pub use session::{Session, SessionConfig};
pub use store::{
    FileStore, MemoryStore, RECORD_TTL, SessionRecord, SessionStore, StoreError,
};
