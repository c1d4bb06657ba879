//! Chat datagram carried on the connectionless socket.
//!
//! Layout on the wire:
//! `[room_name_size: u8][token_size: u8] + [room_name][token][message]`
//!
//! The message length is implicit: whatever follows the two size-prefixed
//! fields. An empty message is valid.

use bytes::{BufMut, Bytes};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{
    MAX_FIELD_SIZE,
    errors::{ProtocolError, Result},
};

/// Fixed 2-byte datagram header.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
pub struct DatagramHeader {
    room_name_size: u8,
    token_size: u8,
}

impl DatagramHeader {
    /// Size of the serialized header.
    pub const SIZE: usize = 2;

    /// Parse a header from the front of `bytes` (zero-copy).
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooShort` if fewer than 2 bytes are available
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(bytes)
            .map(|(header, _rest)| header)
            .map_err(|_| ProtocolError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() })
    }

    /// Declared room name length.
    #[must_use]
    pub fn room_name_size(&self) -> usize {
        usize::from(self.room_name_size)
    }

    /// Declared token length.
    #[must_use]
    pub fn token_size(&self) -> usize {
        usize::from(self.token_size)
    }
}

/// Decoded chat datagram.
///
/// Fields are raw bytes; use [`Self::room_name_str`] and [`Self::token_str`]
/// for text. The message is never interpreted by the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatagramFrame {
    /// Target room name
    pub room_name: Bytes,
    /// Bearer token issued by the handshake
    pub token: Bytes,
    /// Chat message (may be empty)
    pub message: Bytes,
}

impl DatagramFrame {
    /// Create a frame. Field lengths are checked by [`Self::encode`].
    #[must_use]
    pub fn new(
        room_name: impl Into<Bytes>,
        token: impl Into<Bytes>,
        message: impl Into<Bytes>,
    ) -> Self {
        Self { room_name: room_name.into(), token: token.into(), message: message.into() }
    }

    /// Encode the frame into `dst`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if the room name or the token does
    ///   not fit a one-byte length prefix
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let room_name_size = field_size(&self.room_name)?;
        let token_size = field_size(&self.token)?;

        dst.put_slice(DatagramHeader { room_name_size, token_size }.as_bytes());
        dst.put_slice(&self.room_name);
        dst.put_slice(&self.token);
        dst.put_slice(&self.message);

        Ok(())
    }

    /// Encode into a fresh buffer.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if the room name or the token is too
    ///   long
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(
            DatagramHeader::SIZE + self.room_name.len() + self.token.len() + self.message.len(),
        );
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Decode a datagram.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooShort` if the datagram is under 2 bytes, or
    ///   the body is shorter than `room_name_size + token_size`
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = DatagramHeader::from_bytes(bytes)?;
        let name_end = DatagramHeader::SIZE + header.room_name_size();
        let token_end = name_end + header.token_size();

        let too_short = ProtocolError::FrameTooShort { expected: token_end, actual: bytes.len() };
        let room_name = bytes.get(DatagramHeader::SIZE..name_end).ok_or(too_short.clone())?;
        let token = bytes.get(name_end..token_end).ok_or(too_short.clone())?;
        let message = bytes.get(token_end..).ok_or(too_short)?;

        Ok(Self {
            room_name: Bytes::copy_from_slice(room_name),
            token: Bytes::copy_from_slice(token),
            message: Bytes::copy_from_slice(message),
        })
    }

    /// Room name as text.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidUtf8` if the bytes are not UTF-8
    pub fn room_name_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.room_name).map_err(|_| ProtocolError::InvalidUtf8)
    }

    /// Token as text.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidUtf8` if the bytes are not UTF-8
    pub fn token_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.token).map_err(|_| ProtocolError::InvalidUtf8)
    }
}

fn field_size(field: &[u8]) -> Result<u8> {
    u8::try_from(field.len())
        .map_err(|_| ProtocolError::PayloadTooLarge { size: field.len(), max: MAX_FIELD_SIZE })
}
