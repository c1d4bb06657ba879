//! Roomcast production server.
//!
//! Wraps [`roomcast_core`]'s registry with real sockets: a TCP listener for
//! the handshake, a UDP socket for chat datagrams, and the reaper task.
//!
//! # Architecture
//!
//! ```text
//!  TCP accept ──spawn──▶ run_handshake ──┐
//!                                        ├──▶ SessionRegistry (one RwLock)
//!  UDP recv ──pool copy──spawn──▶ Fanout ┘          ▲
//!                                                   │
//!  Reaper ──sleep(interval)──▶ reap_inactive ───────┘
//! ```
//!
//! # Components
//!
//! - [`Server`]: binds both sockets and runs every loop
//! - [`run_handshake`]: server side of the create/join exchange
//! - [`FanoutEngine`]: authenticates datagrams and relays them
//! - [`Reaper`]: periodic eviction of idle users
//! - [`BufferPool`]: reusable datagram buffers
//! - [`SystemEnv`]: production environment (real time, crypto RNG)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
pub mod fanout;
pub mod handshake;
mod pool;
mod reaper;
mod system_env;

use std::{net::SocketAddr, sync::Arc};

pub use config::{DEFAULT_PORT, PoolConfig, ReaperConfig, ServerConfig};
pub use error::ServerError;
pub use fanout::{DatagramSink, FanoutEngine, FanoutError, FanoutReport};
pub use handshake::{HandshakeError, HandshakeOutcome, run_handshake};
pub use pool::{BufferPool, PooledBuffer};
pub use reaper::Reaper;
use roomcast_core::{Environment, Registry, SessionRegistry};
pub use system_env::SystemEnv;
use tokio::net::{TcpListener, UdpSocket};

/// Production Roomcast server.
///
/// Both sockets are bound in [`Self::bind`], so local addresses (and ports
/// chosen by the OS) are known before [`Self::run`] starts serving.
pub struct Server<E: Environment = SystemEnv> {
    listener: TcpListener,
    socket: Arc<UdpSocket>,
    registry: Arc<SessionRegistry<E>>,
    env: E,
    config: ServerConfig,
}

impl Server<SystemEnv> {
    /// Bind both sockets using the system environment.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        Self::bind_with_env(config, SystemEnv::new()).await
    }
}

impl<E: Environment> Server<E> {
    /// Bind both sockets with a caller-supplied environment.
    pub async fn bind_with_env(config: ServerConfig, env: E) -> Result<Self, ServerError> {
        config.validate()?;

        let tcp_addr = config::parse_addr(&config.tcp_bind)?;
        let udp_addr = config::parse_addr(&config.udp_bind)?;

        let listener = TcpListener::bind(tcp_addr)
            .await
            .map_err(|e| ServerError::Transport(format!("failed to bind {tcp_addr}: {e}")))?;
        let socket = UdpSocket::bind(udp_addr)
            .await
            .map_err(|e| ServerError::Transport(format!("failed to bind {udp_addr}: {e}")))?;

        let registry =
            Arc::new(SessionRegistry::with_config(env.clone(), config.registry.clone()));

        tracing::info!(tcp = %listener.local_addr()?, udp = %socket.local_addr()?, "sockets bound");

        Ok(Self { listener, socket: Arc::new(socket), registry, env, config })
    }

    /// Handshake listener address.
    pub fn tcp_local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Chat socket address.
    pub fn udp_local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.socket.local_addr()?)
    }

    /// Shared registry, for inspection.
    pub fn registry(&self) -> Arc<SessionRegistry<E>> {
        Arc::clone(&self.registry)
    }

    /// Serve until the process exits.
    ///
    /// Spawns the reaper and the handshake accept loop, then runs the
    /// datagram receive loop on the current task. Per-connection and
    /// per-datagram errors are logged and never end the loops.
    pub async fn run(self) -> Result<(), ServerError> {
        let Self { listener, socket, registry, env, config } = self;

        let reaper = Reaper::new(Arc::clone(&registry), env.clone(), config.reaper.clone());
        tokio::spawn(reaper.run());

        tokio::spawn(accept_handshakes(listener, Arc::clone(&registry), env));

        let engine = FanoutEngine::new(registry, Arc::clone(&socket));
        let pool = BufferPool::new(&config.pool);
        receive_datagrams(socket, engine, pool).await;

        Ok(())
    }
}

/// Accept TCP connections forever, one handshake task each.
async fn accept_handshakes<R, E>(listener: TcpListener, registry: Arc<R>, env: E)
where
    R: Registry + 'static,
    E: Environment,
{
    loop {
        match listener.accept().await {
            Ok((mut stream, peer)) => {
                let registry = Arc::clone(&registry);
                let env = env.clone();

                tokio::spawn(async move {
                    match run_handshake(&mut stream, registry.as_ref(), &env).await {
                        Ok(outcome) => tracing::debug!(%peer, ?outcome, "handshake finished"),
                        Err(e) => tracing::debug!(%peer, error = %e, "handshake aborted"),
                    }
                });
            },
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
            },
        }
    }
}

/// Receive datagrams forever, copying each into a pooled buffer and handing
/// it to its own fan-out task.
///
/// Datagrams larger than the pool's buffer size are dropped whole rather than
/// relayed truncated.
async fn receive_datagrams<R: Registry + 'static>(
    socket: Arc<UdpSocket>,
    engine: FanoutEngine<R, UdpSocket>,
    pool: BufferPool,
) {
    // One spare byte tells an exact fit apart from a truncated read
    let mut recv_buf = vec![0u8; pool.buffer_size() + 1];

    loop {
        let (len, from) = match socket.recv_from(&mut recv_buf).await {
            Ok(received) => received,
            Err(e) => {
                tracing::warn!(error = %e, "datagram receive failed");
                continue;
            },
        };

        if len > pool.buffer_size() {
            tracing::debug!(%from, limit = pool.buffer_size(), "oversized datagram dropped");
            continue;
        }

        let mut buffer = pool.acquire();
        buffer.fill_from(&recv_buf[..len]);
        let engine = engine.clone();

        tokio::spawn(async move {
            match engine.handle(&buffer, from).await {
                Ok(report) => {
                    tracing::debug!(%from, delivered = report.delivered, failed = report.failed, "datagram relayed");
                },
                Err(e) => tracing::debug!(%from, error = %e, "datagram dropped"),
            }
            drop(buffer);
        });
    }
}
