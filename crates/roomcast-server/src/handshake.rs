//! Handshake state machine.
//!
//! One exchange per TCP connection, strictly sequential:
//!
//! ```text
//! client                         server
//!   │── state 0 {room_name, ...} ──▶│  parse, validate
//!   │◀────────── state 1 {status:0} ─│  (before any registry change)
//!   │                               │  create or join
//!   │◀──────── state 2 {token} ──────│  or {status, message} on failure
//! ```
//!
//! A request that does not parse gets no reply at all; the caller drops the
//! connection.

use bytes::BytesMut;
use roomcast_core::{Environment, Registry, RegistryError, Token, User};
use roomcast_proto::{
    Acknowledge, ChatLine, Completion, HandshakeBody, HandshakeFrame, HandshakeHeader,
    HandshakeState, Operation, ProtocolError, RoomRequest, Status,
};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Errors that abort a handshake without a final reply.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// Socket read or write failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The request frame or its body is malformed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The operation byte is neither create nor join.
    #[error("unknown operation {0}")]
    UnknownOperation(u8),

    /// The request is well-formed but unusable (empty names, or a display
    /// name containing the chat line separator).
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// How a completed exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// A token was issued and the user is a member of `room`.
    Issued {
        /// Bearer token sent to the client
        token: Token,
        /// Room the user joined
        room: String,
        /// Whether the user created the room
        is_host: bool,
    },
    /// The room operation failed; the client received a failure body.
    Rejected {
        /// Status sent to the client
        status: Status,
    },
}

/// Read one handshake frame: the 3-byte header, then exactly the declared
/// body.
pub async fn read_frame<S>(stream: &mut S) -> Result<HandshakeFrame, HandshakeError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = BytesMut::zeroed(HandshakeHeader::SIZE);
    stream.read_exact(&mut buf).await?;

    let payload_size = HandshakeHeader::from_bytes(&buf)?.payload_size();
    buf.resize(HandshakeHeader::SIZE + payload_size, 0);
    stream.read_exact(&mut buf[HandshakeHeader::SIZE..]).await?;

    Ok(HandshakeFrame::decode(&buf)?)
}

/// Encode `body` for `operation` and write it as one frame.
pub async fn write_body<S>(
    stream: &mut S,
    operation: Operation,
    body: HandshakeBody,
) -> Result<(), HandshakeError>
where
    S: AsyncWrite + Unpin,
{
    let wire = body.into_frame(operation)?.to_vec()?;
    stream.write_all(&wire).await?;
    stream.flush().await?;
    Ok(())
}

/// Run the server side of one handshake over `stream`.
///
/// Returns `Err` only when no final reply was sent: malformed request or a
/// broken socket. Registry failures after the acknowledgment are reported to
/// the client and come back as [`HandshakeOutcome::Rejected`].
pub async fn run_handshake<S, R, E>(
    stream: &mut S,
    registry: &R,
    env: &E,
) -> Result<HandshakeOutcome, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    R: Registry + ?Sized,
    E: Environment,
{
    let frame = read_frame(stream).await?;
    let operation = frame
        .header
        .operation_enum()
        .ok_or(HandshakeError::UnknownOperation(frame.header.operation()))?;

    let HandshakeBody::Request(request) =
        HandshakeBody::from_frame_in_state(&frame, HandshakeState::Request)?
    else {
        return Err(ProtocolError::UnexpectedState {
            expected: HandshakeState::Request.to_u8(),
            actual: frame.header.state(),
        }
        .into());
    };

    if request.room_name.is_empty() || !ChatLine::is_valid_display_name(&request.user_name) {
        return Err(RegistryError::InvalidName.into());
    }

    write_body(stream, operation, HandshakeBody::Acknowledge(Acknowledge::ok())).await?;

    let result = match operation {
        Operation::Create => create(registry, env, request.clone()),
        Operation::Join => join(registry, env, request.clone()),
    };

    match result {
        Ok((token, is_host)) => {
            let body = Completion::Issued { token: token.as_str().to_string() };
            write_body(stream, operation, HandshakeBody::Complete(body)).await?;

            tracing::info!(
                room = %request.room_name,
                user = %request.user_name,
                ?operation,
                is_host,
                "token issued"
            );
            Ok(HandshakeOutcome::Issued { token, room: request.room_name, is_host })
        },
        Err(err) => {
            let status = status_for(&err);
            let body = Completion::failed(status, failure_message(status));
            write_body(stream, operation, HandshakeBody::Complete(body)).await?;

            tracing::info!(
                room = %request.room_name,
                user = %request.user_name,
                ?operation,
                error = %err,
                "handshake rejected"
            );
            Ok(HandshakeOutcome::Rejected { status })
        },
    }
}

fn create<R, E>(registry: &R, env: &E, request: RoomRequest) -> Result<(Token, bool), RegistryError>
where
    R: Registry + ?Sized,
    E: Environment,
{
    registry.create_room(&request.room_name, request.password)?;
    enroll(registry, env, &request.room_name, request.user_name, true)
}

fn join<R, E>(registry: &R, env: &E, request: RoomRequest) -> Result<(Token, bool), RegistryError>
where
    R: Registry + ?Sized,
    E: Environment,
{
    registry.find_room(&request.room_name)?;
    enroll(registry, env, &request.room_name, request.user_name, false)
}

/// Register a fresh user and add it to `room`, undoing the registration if
/// the room vanished in between.
fn enroll<R, E>(
    registry: &R,
    env: &E,
    room: &str,
    display_name: String,
    is_host: bool,
) -> Result<(Token, bool), RegistryError>
where
    R: Registry + ?Sized,
    E: Environment,
{
    let token = Token::generate(env);
    let user = User::new(token.clone(), display_name);
    registry.register_user(user.clone());

    if let Err(err) = registry.add_member(room, &user, is_host) {
        registry.delete_user(&token);
        return Err(err);
    }

    let is_host = registry.find_user(&token).map(|user| user.is_host).unwrap_or(is_host);
    Ok((token, is_host))
}

fn status_for(err: &RegistryError) -> Status {
    match err {
        RegistryError::AlreadyExists(_) => Status::ROOM_ALREADY_EXISTS,
        RegistryError::RoomNotFound(_) => Status::ROOM_NOT_FOUND,
        _ => Status::INVALID_REQUEST,
    }
}

fn failure_message(status: Status) -> &'static str {
    match status {
        Status::ROOM_ALREADY_EXISTS => "room already exists",
        Status::ROOM_NOT_FOUND => "room not found",
        _ => "invalid request",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            status_for(&RegistryError::AlreadyExists("x".to_string())),
            Status::ROOM_ALREADY_EXISTS
        );
        assert_eq!(status_for(&RegistryError::RoomNotFound("x".to_string())), Status::ROOM_NOT_FOUND);
        assert_eq!(status_for(&RegistryError::InvalidName), Status::INVALID_REQUEST);
        assert_eq!(failure_message(Status::ROOM_NOT_FOUND), "room not found");
    }

    #[tokio::test]
    async fn read_frame_reads_exactly_one_frame() {
        let frame = HandshakeBody::Acknowledge(Acknowledge::ok()).into_frame(Operation::Join).unwrap();
        let mut wire = frame.to_vec().unwrap();
        wire.extend_from_slice(b"trailing");

        let mut reader = &wire[..];
        let decoded = read_frame(&mut reader).await.unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(reader, b"trailing");
    }

    #[tokio::test]
    async fn read_frame_fails_on_truncated_body() {
        let mut wire = HandshakeBody::Acknowledge(Acknowledge::ok())
            .into_frame(Operation::Join)
            .unwrap()
            .to_vec()
            .unwrap();
        wire.truncate(wire.len() - 1);

        let mut reader = &wire[..];
        let result = read_frame(&mut reader).await;
        assert!(matches!(result, Err(HandshakeError::Io(_))));
    }
}
