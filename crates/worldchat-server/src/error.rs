//! Server error types.

use thiserror::Error;
use worldchat_proto::ProtocolError;

use crate::registry::{ConnectionId, RegistryError};

/// Errors from driver and runtime operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A registry invariant refused the operation.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A wire event could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// An event referenced a connection the driver does not know.
    #[error("unknown connection: {0}")]
    UnknownConnection(ConnectionId),

    /// Bind or transport failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
