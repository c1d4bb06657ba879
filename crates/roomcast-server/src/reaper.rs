//! Inactivity reaper.
//!
//! Wakes on a fixed interval and evicts every user whose last activity is
//! older than the inactivity threshold. A user counts as active when it
//! completes a handshake or sends an accepted datagram.

use std::sync::Arc;

use roomcast_core::{Environment, Registry, User};

use crate::config::ReaperConfig;

/// Periodic eviction of idle users.
pub struct Reaper<R, E> {
    registry: Arc<R>,
    env: E,
    config: ReaperConfig,
}

impl<R: Registry, E: Environment> Reaper<R, E> {
    /// Create a reaper. Nothing runs until [`Self::run`] or [`Self::sweep`].
    pub fn new(registry: Arc<R>, env: E, config: ReaperConfig) -> Self {
        Self { registry, env, config }
    }

    /// Run one eviction cycle and return the evicted users.
    pub fn sweep(&self) -> Vec<User> {
        let evicted = self.registry.reap_inactive(self.config.inactivity_threshold);

        for user in &evicted {
            tracing::info!(
                user = %user.display_name,
                room = user.room.as_deref().unwrap_or("-"),
                "evicted inactive user"
            );
        }
        if !evicted.is_empty() {
            tracing::debug!(
                evicted = evicted.len(),
                remaining = self.registry.user_count(),
                "reaper sweep finished"
            );
        }

        evicted
    }

    /// Sleep for the configured interval, sweep, repeat. Never returns.
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            threshold_secs = self.config.inactivity_threshold.as_secs(),
            "reaper started"
        );

        loop {
            self.env.sleep(self.config.interval).await;
            self.sweep();
        }
    }
}
