//! Roomcast wire protocol.
//!
//! Two binary framings share this crate:
//!
//! - [`HandshakeFrame`]: 3-byte header plus a JSON body, exchanged over the
//!   connection-oriented socket to create or join a room.
//! - [`DatagramFrame`]: 2-byte header plus room name, token and message,
//!   carried one per datagram on the chat socket.
//!
//! Frames are pure data holders. They validate structure (lengths) only; room
//! existence and token validity are checked by the server registry.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chat_line;
pub mod datagram;
pub mod errors;
pub mod handshake;
pub mod payloads;

pub use chat_line::ChatLine;
pub use datagram::{DatagramFrame, DatagramHeader};
pub use errors::{ProtocolError, Result};
pub use handshake::{HandshakeFrame, HandshakeHeader, HandshakeState, Operation};
pub use payloads::{Acknowledge, Completion, HandshakeBody, RoomRequest, Status};

/// Largest value a one-byte length prefix can describe.
pub const MAX_FIELD_SIZE: usize = u8::MAX as usize;
