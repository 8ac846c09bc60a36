//! Shared environment abstraction for the worldchat workspace.
//!
//! Both halves of the system consult the clock (message timestamps, session
//! record expiry) and the RNG (fallback guest names). Funneling those through
//! the [`Environment`] trait keeps the protocol logic free of system calls,
//! so tests can pin or step time instead of sleeping through an expiry
//! window.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod env;

pub use env::{Environment, SystemEnv};
