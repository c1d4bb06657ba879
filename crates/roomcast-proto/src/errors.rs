//! Protocol error types.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding frames.
///
/// Every variant is fatal to the frame being processed and never to the
/// process. Callers drop the frame (datagram) or the connection (handshake).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Fewer bytes than the header or the declared body requires.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum number of bytes needed
        expected: usize,
        /// Bytes actually available
        actual: usize,
    },

    /// A field or body does not fit its one-byte length prefix.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Offending length
        size: usize,
        /// Largest accepted length
        max: usize,
    },

    /// The handshake body is not the JSON shape expected for its state.
    #[error("invalid JSON body: {0}")]
    Json(String),

    /// Room name or token bytes are not valid UTF-8.
    #[error("field is not valid UTF-8")]
    InvalidUtf8,

    /// Handshake state byte is not 0, 1 or 2.
    #[error("unknown handshake state: {0}")]
    UnknownState(u8),

    /// Handshake frame carries a different state than the exchange expects.
    #[error("unexpected handshake state: expected {expected}, got {actual}")]
    UnexpectedState {
        /// State the reader was waiting for
        expected: u8,
        /// State byte found in the header
        actual: u8,
    },
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
