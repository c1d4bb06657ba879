//! Server configuration.
//!
//! Every knob has a default matching the reference deployment: both sockets
//! on port 8088, a reaper that wakes once a minute and evicts users idle for
//! five minutes, and 4 KiB datagram buffers.

use std::{net::SocketAddr, time::Duration};

use roomcast_core::RegistryConfig;

use crate::error::ServerError;

/// Port both sockets bind by default.
pub const DEFAULT_PORT: u16 = 8088;

/// Inactivity reaper timing.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Time between sweeps
    pub interval: Duration,
    /// Users idle for longer than this are evicted
    pub inactivity_threshold: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(60), inactivity_threshold: Duration::from_secs(300) }
    }
}

/// Datagram buffer pool sizing.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Bytes per buffer. Longer datagrams are truncated by the socket.
    pub buffer_size: usize,
    /// Idle buffers kept for reuse; extras are freed on return
    pub max_idle: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { buffer_size: 4096, max_idle: 64 }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Handshake (TCP) listen address
    pub tcp_bind: String,
    /// Chat (UDP) listen address
    pub udp_bind: String,
    /// Inactivity reaper timing
    pub reaper: ReaperConfig,
    /// Datagram buffer pool sizing
    pub pool: PoolConfig,
    /// Registry behavior
    pub registry: RegistryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tcp_bind: format!("0.0.0.0:{DEFAULT_PORT}"),
            udp_bind: format!("0.0.0.0:{DEFAULT_PORT}"),
            reaper: ReaperConfig::default(),
            pool: PoolConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Configuration with both sockets on an ephemeral loopback port.
    pub fn loopback() -> Self {
        Self {
            tcp_bind: "127.0.0.1:0".to_string(),
            udp_bind: "127.0.0.1:0".to_string(),
            ..Self::default()
        }
    }

    /// Check values that would otherwise fail later, at runtime.
    pub fn validate(&self) -> Result<(), ServerError> {
        parse_addr(&self.tcp_bind)?;
        parse_addr(&self.udp_bind)?;

        if self.pool.buffer_size == 0 {
            return Err(ServerError::Config("buffer size must be non-zero".to_string()));
        }
        if self.reaper.interval.is_zero() {
            return Err(ServerError::Config("reap interval must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Parse a bind address.
pub(crate) fn parse_addr(address: &str) -> Result<SocketAddr, ServerError> {
    address
        .parse()
        .map_err(|e| ServerError::Config(format!("invalid bind address '{address}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.tcp_bind, "0.0.0.0:8088");
        assert_eq!(config.udp_bind, "0.0.0.0:8088");
        assert_eq!(config.reaper.interval, Duration::from_secs(60));
        assert_eq!(config.reaper.inactivity_threshold, Duration::from_secs(300));
        assert_eq!(config.pool.buffer_size, 4096);
        assert!(config.registry.reclaim_empty_rooms);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let config = ServerConfig { tcp_bind: "not an address".to_string(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));

        let mut config = ServerConfig::loopback();
        config.pool.buffer_size = 0;
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));

        let mut config = ServerConfig::loopback();
        config.reaper.interval = Duration::ZERO;
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));
    }
}
