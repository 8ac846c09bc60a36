//! Environment trait and its production implementation.
//!
//! Decouples room and session logic from system resources (wall clock,
//! randomness, timers). Production code uses [`SystemEnv`]; tests implement
//! the trait with a fixed or hand-stepped clock to exercise expiry and
//! timestamp behavior deterministically.

use std::time::Duration;

/// Abstract environment providing time, randomness, and async sleep.
///
/// # Invariants
///
/// - `wall_clock_ms()` never goes backwards within one execution context
/// - `random_bytes()` uses OS entropy in production
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time as unix milliseconds.
    ///
    /// Used for server-assigned message timestamps and for validating the
    /// client's persisted session record against its expiry window.
    fn wall_clock_ms(&self) -> u64;

    /// Fill the buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Sleep for the given duration.
    ///
    /// The only async method in the trait; driver and runtime code use it
    /// (reconnect pacing), protocol logic never does.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Random `u64`, for connection and suffix generation.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}

/// Production environment backed by the system clock and OS RNG.
///
/// # Panics
///
/// Panics if the OS RNG fails. A process without functioning entropy cannot
/// generate usable fallback identities; RNG failure indicates OS-level
/// trouble and is unrecoverable here.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::expect_used)]
    fn wall_clock_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("invariant: system clock is after the unix epoch")
            .as_millis() as u64
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
