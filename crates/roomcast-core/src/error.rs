//! Registry error types.
//!
//! Every registry error is recoverable by the caller: the handshake reports
//! it to the client, the fan-out engine drops the datagram, the reaper
//! ignores it. None of them should stop a serving loop.

use thiserror::Error;

/// Errors from registry lookups and mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A room with this name already exists.
    #[error("room already exists: {0}")]
    AlreadyExists(String),

    /// No room with this name exists.
    #[error("room not found: {0}")]
    RoomNotFound(String),

    /// No user is registered under this token.
    #[error("user not found")]
    UserNotFound,

    /// The token is unknown, so the sender cannot be identified.
    #[error("unauthenticated: unknown token")]
    Unauthenticated,

    /// The token is valid but its user is not a member of the target room.
    #[error("not authorized for room {room}")]
    NotAuthorized {
        /// Room the sender tried to reach
        room: String,
    },

    /// Room names must be non-empty.
    #[error("invalid room name")]
    InvalidName,
}
