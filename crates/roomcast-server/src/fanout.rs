//! Datagram fan-out.
//!
//! Each inbound chat datagram is authenticated against the registry and
//! relayed as `"{display_name}> {message}"` to every other member of the room
//! with a known return address. Nothing is ever sent back to the sender, and
//! a datagram that fails any check is dropped silently.

use std::{future::Future, io, net::SocketAddr, sync::Arc};

use futures::future::join_all;
use roomcast_core::{Registry, RegistryError, Token};
use roomcast_proto::{ChatLine, DatagramFrame, ProtocolError};
use thiserror::Error;
use tokio::net::UdpSocket;

/// Outbound datagram transport.
///
/// Implemented for [`UdpSocket`]; tests substitute recording or failing
/// sinks.
pub trait DatagramSink: Send + Sync + 'static {
    /// Send one datagram to `target`.
    fn send_to(
        &self,
        buf: &[u8],
        target: SocketAddr,
    ) -> impl Future<Output = io::Result<usize>> + Send;
}

impl DatagramSink for UdpSocket {
    fn send_to(
        &self,
        buf: &[u8],
        target: SocketAddr,
    ) -> impl Future<Output = io::Result<usize>> + Send {
        UdpSocket::send_to(self, buf, target)
    }
}

/// Why a datagram was dropped.
#[derive(Debug, Error)]
pub enum FanoutError {
    /// Frame did not decode, or room/token are not UTF-8.
    #[error("malformed datagram: {0}")]
    Malformed(#[from] ProtocolError),

    /// Sender is unknown or not a member of the room.
    #[error("rejected datagram: {0}")]
    Rejected(#[from] RegistryError),
}

/// Per-datagram delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Recipients the sink accepted the datagram for
    pub delivered: usize,
    /// Recipients whose send failed
    pub failed: usize,
}

/// Authenticates chat datagrams and relays them to room members.
pub struct FanoutEngine<R, S> {
    registry: Arc<R>,
    sink: Arc<S>,
}

impl<R, S> Clone for FanoutEngine<R, S> {
    fn clone(&self) -> Self {
        Self { registry: Arc::clone(&self.registry), sink: Arc::clone(&self.sink) }
    }
}

impl<R: Registry, S: DatagramSink> FanoutEngine<R, S> {
    /// Create an engine over a shared registry and sink.
    pub fn new(registry: Arc<R>, sink: Arc<S>) -> Self {
        Self { registry, sink }
    }

    /// Process one datagram received from `from`.
    ///
    /// On success the sender's return address and activity are refreshed and
    /// every other member with a known address has been sent the chat line.
    /// Individual send failures are logged and counted, never propagated.
    ///
    /// # Errors
    ///
    /// - `FanoutError::Malformed` if the frame or its text fields are invalid
    /// - `FanoutError::Rejected` if the token is unknown or not a member of
    ///   the named room
    pub async fn handle(&self, datagram: &[u8], from: SocketAddr) -> Result<FanoutReport, FanoutError> {
        let frame = DatagramFrame::decode(datagram)?;
        let room = frame.room_name_str()?;
        let token = Token::from(frame.token_str()?);

        let sender = self.registry.authorize(room, &token)?;
        self.registry.set_return_address(&token, from)?;
        self.registry.touch(&token)?;

        let recipients = self.registry.recipients(room, &token)?;
        let line = ChatLine::render(&sender.display_name, &frame.message);

        let sends = recipients.iter().map(|recipient| {
            let line = &line;
            async move { (recipient, self.sink.send_to(line, recipient.addr).await) }
        });

        let mut report = FanoutReport::default();
        for (recipient, result) in join_all(sends).await {
            match result {
                Ok(_) => {
                    report.delivered += 1;
                    tracing::debug!(%room, to = %recipient.display_name, addr = %recipient.addr, "delivered");
                },
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        %room,
                        to = %recipient.display_name,
                        addr = %recipient.addr,
                        error = %e,
                        "delivery failed"
                    );
                },
            }
        }

        Ok(report)
    }
}
