//! JSON bodies of the handshake exchange.
//!
//! The header's `state` byte selects the body type, so the JSON itself carries
//! no variant tag:
//!
//! | state | body                                   |
//! |-------|----------------------------------------|
//! | 0     | [`RoomRequest`]                        |
//! | 1     | [`Acknowledge`]                        |
//! | 2     | [`Completion`] (token or failure)      |
//!
//! Field names (`room_name`, `password`, `user_name`, `status`, `token`) are
//! part of the wire contract.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use crate::{
    HandshakeFrame, HandshakeHeader, HandshakeState, Operation,
    errors::{ProtocolError, Result},
};

/// Client request to create or join a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRequest {
    /// Room to create or join
    pub room_name: String,
    /// Room password. Stored with the room, never checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Display name shown to other members
    pub user_name: String,
}

/// Numeric status code carried in acknowledge and failure bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Status(pub u8);

impl Status {
    /// Request accepted.
    pub const OK: Self = Self(0);
    /// A room with this name already exists.
    pub const ROOM_ALREADY_EXISTS: Self = Self(1);
    /// No room with this name exists.
    pub const ROOM_NOT_FOUND: Self = Self(2);
    /// Request was well-formed but could not be honored.
    pub const INVALID_REQUEST: Self = Self(3);

    /// Whether this status reports success.
    #[must_use]
    pub fn is_ok(self) -> bool {
        self == Self::OK
    }
}

/// Server acknowledgment that the request parsed.
///
/// Sent before the room operation runs, so it does not promise success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledge {
    /// Always [`Status::OK`] from this server
    pub status: Status,
}

impl Acknowledge {
    /// The acknowledgment every parsed request receives.
    #[must_use]
    pub fn ok() -> Self {
        Self { status: Status::OK }
    }
}

/// Final outcome of the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Completion {
    /// Room operation succeeded; the token authorizes chat datagrams
    Issued {
        /// Bearer token
        token: String,
    },
    /// Room operation failed; no token was issued
    Failed {
        /// Reason code
        status: Status,
        /// Human-readable reason
        message: String,
    },
}

impl Completion {
    /// Failure body for a status code.
    pub fn failed(status: Status, message: impl Into<String>) -> Self {
        Self::Failed { status, message: message.into() }
    }
}

/// Any handshake body, tagged by the state it travels in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeBody {
    /// State 0
    Request(RoomRequest),
    /// State 1
    Acknowledge(Acknowledge),
    /// State 2
    Complete(Completion),
}

impl HandshakeBody {
    /// State this body travels in.
    #[must_use]
    pub const fn state(&self) -> HandshakeState {
        match self {
            Self::Request(_) => HandshakeState::Request,
            Self::Acknowledge(_) => HandshakeState::Acknowledge,
            Self::Complete(_) => HandshakeState::Complete,
        }
    }

    /// Serialize the body as JSON into `dst`.
    ///
    /// Does not enforce the 255-byte limit; see [`Self::into_frame`].
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Json` if serialization fails
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let writer = dst.writer();
        match self {
            Self::Request(inner) => serde_json::to_writer(writer, inner),
            Self::Acknowledge(inner) => serde_json::to_writer(writer, inner),
            Self::Complete(inner) => serde_json::to_writer(writer, inner),
        }
        .map_err(ProtocolError::from)
    }

    /// Parse a JSON body for the given state.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Json` if the body does not match the state's shape
    pub fn decode(state: HandshakeState, bytes: &[u8]) -> Result<Self> {
        let body = match state {
            HandshakeState::Request => Self::Request(serde_json::from_slice(bytes)?),
            HandshakeState::Acknowledge => Self::Acknowledge(serde_json::from_slice(bytes)?),
            HandshakeState::Complete => Self::Complete(serde_json::from_slice(bytes)?),
        };
        Ok(body)
    }

    /// Build a frame for `operation` carrying this body.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Json` if serialization fails
    /// - `ProtocolError::PayloadTooLarge` if the JSON exceeds 255 bytes
    pub fn into_frame(self, operation: Operation) -> Result<HandshakeFrame> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;

        if buf.len() > HandshakeHeader::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: buf.len(),
                max: HandshakeHeader::MAX_PAYLOAD_SIZE,
            });
        }

        let header = HandshakeHeader::new(operation, self.state());
        Ok(HandshakeFrame::new(header, buf))
    }

    /// Parse the body of a frame according to its header state.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownState` if the state byte is not 0, 1 or 2
    /// - `ProtocolError::Json` if the body does not match the state's shape
    pub fn from_frame(frame: &HandshakeFrame) -> Result<Self> {
        let state = frame
            .header
            .state_enum()
            .ok_or(ProtocolError::UnknownState(frame.header.state()))?;
        Self::decode(state, &frame.payload)
    }

    /// Parse the body of a frame that must be in `expected` state.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnexpectedState` if the header carries another state
    /// - `ProtocolError::Json` if the body does not match the state's shape
    pub fn from_frame_in_state(frame: &HandshakeFrame, expected: HandshakeState) -> Result<Self> {
        if frame.header.state() != expected.to_u8() {
            return Err(ProtocolError::UnexpectedState {
                expected: expected.to_u8(),
                actual: frame.header.state(),
            });
        }
        Self::decode(expected, &frame.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(password: Option<&str>) -> RoomRequest {
        RoomRequest {
            room_name: "lobby".to_string(),
            password: password.map(str::to_string),
            user_name: "alice".to_string(),
        }
    }

    #[test]
    fn request_field_names_match_wire_contract() {
        let mut buf = Vec::new();
        HandshakeBody::Request(request(Some("pw"))).encode(&mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(value["room_name"], "lobby");
        assert_eq!(value["password"], "pw");
        assert_eq!(value["user_name"], "alice");
    }

    #[test]
    fn password_is_optional() {
        let body = br#"{"room_name":"lobby","user_name":"alice"}"#;
        let decoded = HandshakeBody::decode(HandshakeState::Request, body).unwrap();
        assert_eq!(decoded, HandshakeBody::Request(request(None)));
    }

    #[test]
    fn acknowledge_uses_numeric_status() {
        let frame = HandshakeBody::Acknowledge(Acknowledge::ok()).into_frame(Operation::Join).unwrap();
        assert_eq!(&frame.payload[..], br#"{"status":0}"#);
        assert_eq!(frame.header.operation_enum(), Some(Operation::Join));
        assert_eq!(frame.header.state_enum(), Some(HandshakeState::Acknowledge));
    }

    #[test]
    fn completion_round_trip() {
        for completion in [
            Completion::Issued { token: "0123abcd".to_string() },
            Completion::failed(Status::ROOM_NOT_FOUND, "room not found: lobby"),
        ] {
            let frame =
                HandshakeBody::Complete(completion.clone()).into_frame(Operation::Create).unwrap();
            let decoded = HandshakeBody::from_frame(&frame).unwrap();
            assert_eq!(decoded, HandshakeBody::Complete(completion));
        }
    }

    #[test]
    fn issued_completion_is_token_only() {
        let frame = HandshakeBody::Complete(Completion::Issued { token: "t".to_string() })
            .into_frame(Operation::Create)
            .unwrap();
        assert_eq!(&frame.payload[..], br#"{"token":"t"}"#);
    }

    #[test]
    fn oversized_request_is_rejected() {
        let body = RoomRequest {
            room_name: "r".repeat(200),
            password: None,
            user_name: "u".repeat(100),
        };
        let result = HandshakeBody::Request(body).into_frame(Operation::Create);
        assert!(matches!(result, Err(ProtocolError::PayloadTooLarge { max: 255, .. })));
    }

    #[test]
    fn wrong_state_is_rejected() {
        let frame = HandshakeBody::Acknowledge(Acknowledge::ok()).into_frame(Operation::Join).unwrap();
        let result = HandshakeBody::from_frame_in_state(&frame, HandshakeState::Complete);
        assert_eq!(result, Err(ProtocolError::UnexpectedState { expected: 2, actual: 1 }));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let result = HandshakeBody::decode(HandshakeState::Request, b"{not json");
        assert!(matches!(result, Err(ProtocolError::Json(_))));
    }
}
