//! Production Environment implementation using system time and RNG.
//!
//! Time comes from `std::time::Instant`, sleeping from tokio, and randomness
//! from the OS via getrandom. Nothing here is reproducible; tests use the
//! harness's simulated environment instead.

use std::time::Duration;

use roomcast_core::Environment;

/// Production environment using system time and cryptographic RNG.
///
/// # Panics
///
/// Panics if the OS RNG fails. Tokens are bearer credentials, so a server
/// without working randomness must not keep issuing them.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - tokens would be predictable");
    }
}
