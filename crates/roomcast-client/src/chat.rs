//! Chat socket: sends datagrams to the server and receives relayed lines.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use roomcast_proto::{ChatLine, DatagramFrame};
use tokio::net::UdpSocket;

use crate::{error::ClientError, handshake::Session};

/// Largest relayed line the socket accepts; matches the server's buffers.
pub const RECV_BUFFER_SIZE: usize = 4096;

/// UDP socket bound for one server.
///
/// The server learns this socket's address from the first datagram sent, so
/// nothing is received before [`Self::announce`] or the first [`Self::send`].
#[derive(Debug)]
pub struct ChatSocket {
    socket: UdpSocket,
    server: SocketAddr,
}

impl ChatSocket {
    /// Bind an ephemeral local port for talking to `server`.
    pub async fn bind(server: SocketAddr) -> Result<Self, ClientError> {
        let local = if server.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(local).await?;
        Ok(Self { socket, server })
    }

    /// Local address of the socket.
    pub fn local_addr(&self) -> Result<SocketAddr, ClientError> {
        Ok(self.socket.local_addr()?)
    }

    /// Send `text` to `room`, authenticated with `token`.
    ///
    /// # Errors
    ///
    /// - `ClientError::Protocol` if the room name or token exceeds 255 bytes
    /// - `ClientError::Io` if the send fails
    pub async fn send(&self, room: &str, token: &str, text: &str) -> Result<(), ClientError> {
        let wire =
            DatagramFrame::new(room.to_string(), token.to_string(), text.to_string()).to_vec()?;
        self.socket.send_to(&wire, self.server).await?;
        Ok(())
    }

    /// Send `text` using a session's room and token.
    pub async fn send_in(&self, session: &Session, text: &str) -> Result<(), ClientError> {
        self.send(&session.room_name, &session.token, text).await
    }

    /// Register this socket's address with the server by sending an empty
    /// message. The server relays nothing for it.
    pub async fn announce(&self, session: &Session) -> Result<(), ClientError> {
        self.send_in(session, "").await
    }

    /// Wait for the next relayed line.
    ///
    /// Datagrams from any address other than the server's are ignored.
    pub async fn recv(&self) -> Result<ChatLine, ClientError> {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            let (len, from) = self.socket.recv_from(&mut buf).await?;
            if from == self.server {
                return Ok(ChatLine::parse(&buf[..len]));
            }
            tracing::debug!(%from, "ignoring datagram from unexpected peer");
        }
    }
}
