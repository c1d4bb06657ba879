//! Client error types.

use roomcast_proto::{ProtocolError, Status};
use thiserror::Error;

/// Errors from the client side of the handshake and chat socket.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Socket I/O failed, including the server closing the connection
    /// early (it does so without a reply for malformed requests).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The server sent a frame or body that does not decode.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The server refused the request.
    #[error("rejected by server (status {}): {message}", status.0)]
    Rejected {
        /// Status code from the failure body
        status: Status,
        /// Reason text from the failure body
        message: String,
    },

    /// The server answered out of order.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}
