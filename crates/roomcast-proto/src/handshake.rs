//! Handshake frame used on the connection-oriented socket.
//!
//! Layout on the wire:
//! `[operation: u8][state: u8][payload_size: u8] + [payload: payload_size bytes]`
//!
//! The payload is a UTF-8 JSON body whose shape depends on `state`; see
//! [`crate::payloads`]. One exchange is three frames: request (state 0),
//! acknowledge (state 1) and complete (state 2).

use bytes::{BufMut, Bytes};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{
    MAX_FIELD_SIZE,
    errors::{ProtocolError, Result},
};

/// Room operation requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create a new room and become its host
    Create,
    /// Join an existing room
    Join,
}

impl Operation {
    /// Wire value of this operation.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Create => 1,
            Self::Join => 2,
        }
    }

    /// Parse a wire value. `None` for anything but 1 or 2.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Create),
            2 => Some(Self::Join),
            _ => None,
        }
    }
}

/// Position of a frame within the three-step exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeState {
    /// Client request carrying room and user names
    Request,
    /// Server confirms the request parsed
    Acknowledge,
    /// Server reports the outcome (token or failure)
    Complete,
}

impl HandshakeState {
    /// Wire value of this state.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Request => 0,
            Self::Acknowledge => 1,
            Self::Complete => 2,
        }
    }

    /// Parse a wire value. `None` for anything above 2.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Request),
            1 => Some(Self::Acknowledge),
            2 => Some(Self::Complete),
            _ => None,
        }
    }
}

/// Fixed 3-byte handshake header.
///
/// Every byte pattern is a structurally valid header, so it can be cast
/// straight from untrusted input. Unknown operation or state values are kept
/// as raw bytes and surface as `None` from [`Self::operation_enum`] and
/// [`Self::state_enum`]; rejecting them is the state machine's job.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
pub struct HandshakeHeader {
    operation: u8,
    state: u8,
    pub(crate) payload_size: u8,
}

impl HandshakeHeader {
    /// Size of the serialized header.
    pub const SIZE: usize = 3;

    /// Largest body a handshake frame can carry.
    pub const MAX_PAYLOAD_SIZE: usize = MAX_FIELD_SIZE;

    /// Header for a known operation and state with an empty body.
    #[must_use]
    pub fn new(operation: Operation, state: HandshakeState) -> Self {
        Self::from_raw(operation.to_u8(), state.to_u8())
    }

    /// Header from raw operation and state bytes, without validation.
    #[must_use]
    pub fn from_raw(operation: u8, state: u8) -> Self {
        Self { operation, state, payload_size: 0 }
    }

    /// Parse a header from the front of `bytes` (zero-copy).
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooShort` if fewer than 3 bytes are available
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(bytes)
            .map(|(header, _rest)| header)
            .map_err(|_| ProtocolError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() })
    }

    /// Serialize the header.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(self.as_bytes());
        arr
    }

    /// Operation as raw byte.
    #[must_use]
    pub fn operation(&self) -> u8 {
        self.operation
    }

    /// Operation as enum. `None` if unrecognized.
    #[must_use]
    pub fn operation_enum(&self) -> Option<Operation> {
        Operation::from_u8(self.operation)
    }

    /// State as raw byte.
    #[must_use]
    pub fn state(&self) -> u8 {
        self.state
    }

    /// State as enum. `None` if unrecognized.
    #[must_use]
    pub fn state_enum(&self) -> Option<HandshakeState> {
        HandshakeState::from_u8(self.state)
    }

    /// Declared body length.
    #[must_use]
    pub fn payload_size(&self) -> usize {
        usize::from(self.payload_size)
    }
}

/// Complete handshake frame: header plus raw JSON body bytes.
///
/// # Invariants
///
/// - `payload.len()` matches `header.payload_size()` for every frame built with
///   [`Self::new`] or returned by [`Self::decode`], as long as the payload is
///   within [`HandshakeHeader::MAX_PAYLOAD_SIZE`].
/// - Oversized payloads can be constructed but never encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeFrame {
    /// Frame header
    pub header: HandshakeHeader,
    /// Raw JSON body
    pub payload: Bytes,
}

impl HandshakeFrame {
    /// Create a frame, setting `payload_size` from the payload length.
    ///
    /// Payloads longer than 255 bytes are accepted here and rejected by
    /// [`Self::encode`].
    #[must_use]
    pub fn new(mut header: HandshakeHeader, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        header.payload_size = u8::try_from(payload.len()).unwrap_or(u8::MAX);
        Self { header, payload }
    }

    /// Encode the frame into `dst`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if the body exceeds 255 bytes
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.payload.len() > HandshakeHeader::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: HandshakeHeader::MAX_PAYLOAD_SIZE,
            });
        }

        debug_assert_eq!(self.payload.len(), self.header.payload_size());

        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.payload);

        Ok(())
    }

    /// Encode into a fresh buffer.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if the body exceeds 255 bytes
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(HandshakeHeader::SIZE + self.payload.len());
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Decode a frame from wire bytes. Trailing bytes are ignored.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooShort` if fewer than 3 bytes are present, or
    ///   the declared body is longer than the bytes that follow the header
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = *HandshakeHeader::from_bytes(bytes)?;
        let total_size = HandshakeHeader::SIZE + header.payload_size();

        let body = bytes
            .get(HandshakeHeader::SIZE..total_size)
            .ok_or(ProtocolError::FrameTooShort { expected: total_size, actual: bytes.len() })?;

        Ok(Self { header, payload: Bytes::copy_from_slice(body) })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    impl Arbitrary for HandshakeFrame {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with((): Self::Parameters) -> Self::Strategy {
            (any::<u8>(), any::<u8>(), prop::collection::vec(any::<u8>(), 0..=255))
                .prop_map(|(op, state, body)| Self::new(HandshakeHeader::from_raw(op, state), body))
                .boxed()
        }
    }

    proptest! {
        #[test]
        fn frame_round_trip(frame in any::<HandshakeFrame>()) {
            let wire = frame.to_vec().expect("should encode");
            let parsed = HandshakeFrame::decode(&wire).expect("should decode");
            prop_assert_eq!(frame, parsed);
        }
    }

    #[test]
    fn header_layout_is_three_bytes() {
        let mut header = HandshakeHeader::new(Operation::Join, HandshakeState::Complete);
        header.payload_size = 7;
        assert_eq!(header.to_bytes(), [2, 2, 7]);
    }

    #[test]
    fn reject_short_header() {
        for len in 0..HandshakeHeader::SIZE {
            let bytes = vec![1u8; len];
            let result = HandshakeFrame::decode(&bytes);
            assert_eq!(result, Err(ProtocolError::FrameTooShort { expected: 3, actual: len }));
        }
    }

    #[test]
    fn reject_truncated_body() {
        // Header claims 10 bytes, only 4 follow
        let bytes = [1, 0, 10, b'{', b'"', b'a', b'"'];
        let result = HandshakeFrame::decode(&bytes);
        assert!(matches!(result, Err(ProtocolError::FrameTooShort { expected: 13, actual: 7 })));
    }

    #[test]
    fn reject_oversized_body_on_encode() {
        let header = HandshakeHeader::new(Operation::Create, HandshakeState::Request);
        let frame = HandshakeFrame::new(header, vec![b'x'; 256]);

        let result = frame.to_vec();
        assert_eq!(result, Err(ProtocolError::PayloadTooLarge { size: 256, max: 255 }));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let header = HandshakeHeader::new(Operation::Create, HandshakeState::Acknowledge);
        let frame = HandshakeFrame::new(header, b"{}".to_vec());

        let mut wire = frame.to_vec().unwrap();
        wire.extend_from_slice(b"garbage");

        let parsed = HandshakeFrame::decode(&wire).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn unknown_operation_still_decodes() {
        let parsed = HandshakeFrame::decode(&[9, 7, 0]).unwrap();
        assert_eq!(parsed.header.operation(), 9);
        assert_eq!(parsed.header.operation_enum(), None);
        assert_eq!(parsed.header.state_enum(), None);
    }
}
