//! Roomcast client.
//!
//! The two halves of a chat session:
//!
//! - [`create_room`] / [`join_room`]: one TCP handshake that yields a
//!   [`Session`] (token + room name)
//! - [`ChatSocket`]: UDP datagrams out, relayed `"name> message"` lines in

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod chat;
mod error;
mod handshake;

pub use chat::{ChatSocket, RECV_BUFFER_SIZE};
pub use error::ClientError;
pub use handshake::{Session, create_room, handshake, join_room};
pub use roomcast_proto::ChatLine;
