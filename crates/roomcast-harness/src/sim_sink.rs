//! In-memory datagram sink.
//!
//! Records every datagram the fan-out engine sends instead of putting it on
//! the network, and can be told to fail sends to particular addresses.

#![allow(clippy::disallowed_types, reason = "Synchronous bookkeeping only")]

use std::{
    collections::HashSet,
    future::Future,
    io,
    net::SocketAddr,
    sync::{Mutex, PoisonError},
};

use roomcast_server::DatagramSink;

/// Recording [`DatagramSink`] with per-address failure injection.
#[derive(Debug, Default)]
pub struct SimSink {
    sent: Mutex<Vec<(SocketAddr, Vec<u8>)>>,
    failing: Mutex<HashSet<SocketAddr>>,
}

impl SimSink {
    /// Sink that accepts every send.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later send to `addr` fail.
    pub fn fail_sends_to(&self, addr: SocketAddr) {
        self.failing.lock().unwrap_or_else(PoisonError::into_inner).insert(addr);
    }

    /// Every accepted datagram, in send order.
    pub fn sent(&self) -> Vec<(SocketAddr, Vec<u8>)> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Datagrams accepted for `addr`.
    pub fn sent_to(&self, addr: SocketAddr) -> Vec<Vec<u8>> {
        self.sent().into_iter().filter(|(to, _)| *to == addr).map(|(_, bytes)| bytes).collect()
    }
}

impl DatagramSink for SimSink {
    fn send_to(
        &self,
        buf: &[u8],
        target: SocketAddr,
    ) -> impl Future<Output = io::Result<usize>> + Send {
        let result = if self.failing.lock().unwrap_or_else(PoisonError::into_inner).contains(&target)
        {
            tracing::trace!(%target, "injected send failure");
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "injected send failure"))
        } else {
            self.sent.lock().unwrap_or_else(PoisonError::into_inner).push((target, buf.to_vec()));
            Ok(buf.len())
        };
        std::future::ready(result)
    }
}
