//! Client side of the create/join handshake.

use std::net::SocketAddr;

use bytes::BytesMut;
use roomcast_proto::{
    Completion, HandshakeBody, HandshakeFrame, HandshakeHeader, HandshakeState, Operation,
    RoomRequest,
};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};

use crate::error::ClientError;

/// Credentials for one room, returned by a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token to put in every chat datagram
    pub token: String,
    /// Room the token is valid for
    pub room_name: String,
}

/// Create `room` on the server and become its host.
pub async fn create_room(
    server: SocketAddr,
    room: &str,
    user: &str,
    password: Option<String>,
) -> Result<Session, ClientError> {
    let mut stream = TcpStream::connect(server).await?;
    handshake(&mut stream, Operation::Create, request(room, user, password)).await
}

/// Join an existing `room` on the server.
pub async fn join_room(
    server: SocketAddr,
    room: &str,
    user: &str,
    password: Option<String>,
) -> Result<Session, ClientError> {
    let mut stream = TcpStream::connect(server).await?;
    handshake(&mut stream, Operation::Join, request(room, user, password)).await
}

fn request(room: &str, user: &str, password: Option<String>) -> RoomRequest {
    RoomRequest { room_name: room.to_string(), password, user_name: user.to_string() }
}

/// Run the three-message exchange over an already-connected stream.
///
/// # Errors
///
/// - `ClientError::Rejected` if the acknowledgment or completion carries a
///   failure status
/// - `ClientError::UnexpectedReply` if the server answers in the wrong state
/// - `ClientError::Io` if the server closes the connection early
pub async fn handshake<S>(
    stream: &mut S,
    operation: Operation,
    request: RoomRequest,
) -> Result<Session, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let room_name = request.room_name.clone();
    let wire = HandshakeBody::Request(request).into_frame(operation)?.to_vec()?;
    stream.write_all(&wire).await?;
    stream.flush().await?;

    match HandshakeBody::from_frame(&read_frame(stream).await?)? {
        HandshakeBody::Acknowledge(ack) if ack.status.is_ok() => {},
        HandshakeBody::Acknowledge(ack) => {
            return Err(ClientError::Rejected {
                status: ack.status,
                message: "request not acknowledged".to_string(),
            });
        },
        other => {
            return Err(ClientError::UnexpectedReply(format!(
                "expected acknowledge, got state {}",
                other.state().to_u8()
            )));
        },
    }

    match HandshakeBody::from_frame_in_state(&read_frame(stream).await?, HandshakeState::Complete)?
    {
        HandshakeBody::Complete(Completion::Issued { token }) => {
            tracing::debug!(room = %room_name, "token received");
            Ok(Session { token, room_name })
        },
        HandshakeBody::Complete(Completion::Failed { status, message }) => {
            Err(ClientError::Rejected { status, message })
        },
        other => Err(ClientError::UnexpectedReply(format!(
            "expected completion, got state {}",
            other.state().to_u8()
        ))),
    }
}

async fn read_frame<S>(stream: &mut S) -> Result<HandshakeFrame, ClientError>
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

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use roomcast_proto::{Acknowledge, Status};
    use tokio::io::duplex;

    use super::*;

    async fn reply(stream: &mut tokio::io::DuplexStream, body: HandshakeBody) {
        let wire = body.into_frame(Operation::Join).unwrap().to_vec().unwrap();
        stream.write_all(&wire).await.unwrap();
    }

    #[tokio::test]
    async fn issued_token_becomes_session() {
        let (mut client, mut server) = duplex(1024);

        let server_task = tokio::spawn(async move {
            let frame = read_frame(&mut server).await.unwrap();
            let HandshakeBody::Request(request) = HandshakeBody::from_frame(&frame).unwrap() else {
                panic!("expected request");
            };
            assert_eq!(request.room_name, "lobby");
            assert_eq!(request.user_name, "bob");

            reply(&mut server, HandshakeBody::Acknowledge(Acknowledge::ok())).await;
            reply(&mut server, HandshakeBody::Complete(Completion::Issued { token: "abc".to_string() }))
                .await;
        });

        let session =
            handshake(&mut client, Operation::Join, request("lobby", "bob", None)).await.unwrap();
        assert_eq!(session, Session { token: "abc".to_string(), room_name: "lobby".to_string() });
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn failure_body_becomes_rejected() {
        let (mut client, mut server) = duplex(1024);

        tokio::spawn(async move {
            read_frame(&mut server).await.unwrap();
            reply(&mut server, HandshakeBody::Acknowledge(Acknowledge::ok())).await;
            reply(
                &mut server,
                HandshakeBody::Complete(Completion::failed(Status::ROOM_NOT_FOUND, "room not found")),
            )
            .await;
        });

        let result = handshake(&mut client, Operation::Join, request("nowhere", "bob", None)).await;
        assert!(matches!(
            result,
            Err(ClientError::Rejected { status: Status::ROOM_NOT_FOUND, .. })
        ));
    }

    #[tokio::test]
    async fn early_close_is_io_error() {
        let (mut client, mut server) = duplex(1024);

        tokio::spawn(async move {
            read_frame(&mut server).await.unwrap();
            drop(server);
        });

        let result = handshake(&mut client, Operation::Create, request("lobby", "a", None)).await;
        assert!(matches!(result, Err(ClientError::Io(_))));
    }
}
