//! Roomcast server binary.
//!
//! # Usage
//!
//! ```bash
//! # Both sockets on port 8088
//! roomcast-server
//!
//! # Separate ports, faster eviction, verbose logs
//! roomcast-server --bind-tcp 0.0.0.0:9000 --bind-udp 0.0.0.0:9001 \
//!     --inactivity-secs 60 --log-level debug
//! ```

use std::time::Duration;

use clap::Parser;
use roomcast_core::RegistryConfig;
use roomcast_server::{PoolConfig, ReaperConfig, Server, ServerConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Roomcast chat server
#[derive(Parser, Debug)]
#[command(name = "roomcast-server")]
#[command(about = "Room-based chat relay: TCP handshake, UDP fan-out")]
#[command(version)]
struct Args {
    /// Handshake (TCP) address to bind to
    #[arg(long, default_value = "0.0.0.0:8088")]
    bind_tcp: String,

    /// Chat (UDP) address to bind to
    #[arg(long, default_value = "0.0.0.0:8088")]
    bind_udp: String,

    /// Seconds between inactivity sweeps
    #[arg(long, default_value = "60")]
    reap_interval_secs: u64,

    /// Seconds of silence after which a user is evicted
    #[arg(long, default_value = "300")]
    inactivity_secs: u64,

    /// Keep rooms alive after their last member leaves
    #[arg(long)]
    keep_empty_rooms: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            tcp_bind: self.bind_tcp,
            udp_bind: self.bind_udp,
            reaper: ReaperConfig {
                interval: Duration::from_secs(self.reap_interval_secs),
                inactivity_threshold: Duration::from_secs(self.inactivity_secs),
            },
            pool: PoolConfig::default(),
            registry: RegistryConfig { reclaim_empty_rooms: !self.keep_empty_rooms },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Roomcast server starting");

    let server = Server::bind(args.into_config()).await?;

    tracing::info!(
        tcp = %server.tcp_local_addr()?,
        udp = %server.udp_local_addr()?,
        "Server listening"
    );

    server.run().await?;

    Ok(())
}
