//! Line-based Roomcast client.
//!
//! # Usage
//!
//! ```bash
//! # Create a room and chat in it
//! roomcast-client --user alice --room lobby --create
//!
//! # Join it from another terminal
//! roomcast-client --user bob --room lobby
//! ```
//!
//! Each stdin line is sent as one message; relayed lines are printed as they
//! arrive.

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use clap::Parser;
use roomcast_client::{ChatSocket, ClientError, create_room, join_room};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Roomcast chat client
#[derive(Parser, Debug)]
#[command(name = "roomcast-client")]
#[command(about = "Create or join a Roomcast room and chat from the terminal")]
#[command(version)]
struct Args {
    /// Server IP address
    #[arg(long, default_value = "127.0.0.1")]
    server: IpAddr,

    /// Server handshake (TCP) port
    #[arg(long, default_value = "8088")]
    tcp_port: u16,

    /// Server chat (UDP) port
    #[arg(long, default_value = "8088")]
    udp_port: u16,

    /// Display name shown to other members
    #[arg(short, long)]
    user: String,

    /// Room to create or join
    #[arg(short, long)]
    room: String,

    /// Create the room instead of joining it
    #[arg(long)]
    create: bool,

    /// Room password (stored by the server, not checked)
    #[arg(long)]
    password: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    let tcp = SocketAddr::new(args.server, args.tcp_port);
    let udp = SocketAddr::new(args.server, args.udp_port);

    let session = if args.create {
        create_room(tcp, &args.room, &args.user, args.password).await?
    } else {
        join_room(tcp, &args.room, &args.user, args.password).await?
    };
    tracing::info!(room = %session.room_name, "joined");

    let socket = Arc::new(ChatSocket::bind(udp).await?);
    socket.announce(&session).await?;

    let receiver = Arc::clone(&socket);
    tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        loop {
            match receiver.recv().await {
                Ok(line) => {
                    let text = format!("{}> {}\n", line.display_name, line.message);
                    if stdout.write_all(text.as_bytes()).await.is_err()
                        || stdout.flush().await.is_err()
                    {
                        break;
                    }
                },
                Err(e) => tracing::warn!(error = %e, "receive failed"),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            continue;
        }
        if let Err(e) = socket.send_in(&session, &line).await {
            match e {
                ClientError::Protocol(_) => tracing::warn!(error = %e, "message not sent"),
                other => return Err(other.into()),
            }
        }
    }

    Ok(())
}
