//! Protocol message definitions
//!
//! Every message starts with a single id byte. The bytes that follow depend
//! on the id and the direction:
//!
//! | id      | client -> server       | server -> client          |
//! |---------|------------------------|---------------------------|
//! | `Init`  | string (pairing code)  | one byte, 1 accepted / 0 rejected |
//! | `Start` | -                      | -                         |
//! | `Stop`  | -                      | - (presentation ended)    |
//! | `Next`  | -                      | -                         |
//! | `Prev`  | -                      | -                         |
//! | `Notes` | -                      | string (slide notes)      |
//! | `Image` | -                      | bytes (encoded slide)     |
//! | `Ping`  | -                      | - (liveness probe)        |

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::protocol::framing::{put_bytes, put_string, read_bytes, read_string};
use crate::{Error, Result};

/// Single-byte message identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageId {
    Init = 0,
    Start = 1,
    Stop = 2,
    Next = 3,
    Prev = 4,
    Notes = 5,
    Image = 6,
    Ping = 100,
}

impl MessageId {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Init),
            1 => Some(Self::Start),
            2 => Some(Self::Stop),
            3 => Some(Self::Next),
            4 => Some(Self::Prev),
            5 => Some(Self::Notes),
            6 => Some(Self::Image),
            100 => Some(Self::Ping),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Playback commands a paired peer can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientRequest {
    StartPresentation,
    StopPresentation,
    NextSlide,
    PreviousSlide,
}

impl ClientRequest {
    pub fn message_id(self) -> MessageId {
        match self {
            Self::StartPresentation => MessageId::Start,
            Self::StopPresentation => MessageId::Stop,
            Self::NextSlide => MessageId::Next,
            Self::PreviousSlide => MessageId::Prev,
        }
    }
}

/// Messages sent by the remote peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Pairing attempt carrying the candidate code
    Init { code: String },
    /// Playback command
    Request(ClientRequest),
    /// Id this side does not handle; carries no payload we know of
    Unknown(u8),
}

impl ClientMessage {
    /// Decode the body of a message whose id byte was already read.
    pub async fn read_body<R: AsyncRead + Unpin>(id: u8, reader: &mut R) -> Result<Self> {
        let message = match MessageId::from_byte(id) {
            // A code that is not UTF-8 can never match; it is rejected, not fatal
            Some(MessageId::Init) => Self::Init {
                code: String::from_utf8_lossy(&read_bytes(reader).await?).into_owned(),
            },
            Some(MessageId::Start) => Self::Request(ClientRequest::StartPresentation),
            Some(MessageId::Stop) => Self::Request(ClientRequest::StopPresentation),
            Some(MessageId::Next) => Self::Request(ClientRequest::NextSlide),
            Some(MessageId::Prev) => Self::Request(ClientRequest::PreviousSlide),
            _ => Self::Unknown(id),
        };
        Ok(message)
    }

    /// Read one complete message
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self> {
        let id = reader
            .read_u8()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        Self::read_body(id, reader).await
    }

    /// Encode as the peer would put it on the wire
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        match self {
            Self::Init { code } => {
                buf.push(MessageId::Init.as_byte());
                put_string(&mut buf, code)?;
            }
            Self::Request(request) => buf.push(request.message_id().as_byte()),
            Self::Unknown(id) => buf.push(*id),
        }
        Ok(buf)
    }
}

/// Messages sent to the remote peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Answer to a pairing attempt
    InitReply { accepted: bool },
    /// The presentation ended
    Stop,
    /// Notes of the current slide
    Notes(String),
    /// Encoded image of the current slide
    Image(Vec<u8>),
    /// Liveness probe
    Ping,
}

impl ServerMessage {
    /// Notes message with line endings normalized to `\n`
    pub fn notes(text: &str) -> Self {
        Self::Notes(normalize_newlines(text))
    }

    pub fn message_id(&self) -> MessageId {
        match self {
            Self::InitReply { .. } => MessageId::Init,
            Self::Stop => MessageId::Stop,
            Self::Notes(_) => MessageId::Notes,
            Self::Image(_) => MessageId::Image,
            Self::Ping => MessageId::Ping,
        }
    }

    /// Serialize to wire bytes.
    ///
    /// Returns an error if a payload exceeds the protocol's size limit.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = vec![self.message_id().as_byte()];
        match self {
            Self::InitReply { accepted } => buf.push(u8::from(*accepted)),
            Self::Notes(text) => put_string(&mut buf, text)?,
            Self::Image(data) => put_bytes(&mut buf, data)?,
            Self::Stop | Self::Ping => {}
        }
        Ok(buf)
    }

    /// Read one complete message, as the peer would.
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self> {
        let id = reader
            .read_u8()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        match MessageId::from_byte(id) {
            Some(MessageId::Init) => {
                let flag = reader
                    .read_u8()
                    .await
                    .map_err(|e| Error::Network(e.to_string()))?;
                Ok(Self::InitReply { accepted: flag == 1 })
            }
            Some(MessageId::Stop) => Ok(Self::Stop),
            Some(MessageId::Notes) => Ok(Self::Notes(read_string(reader).await?)),
            Some(MessageId::Image) => Ok(Self::Image(read_bytes(reader).await?)),
            Some(MessageId::Ping) => Ok(Self::Ping),
            _ => Err(Error::InvalidMessage(format!(
                "unexpected server message id {}",
                id
            ))),
        }
    }
}

/// Convert `\r\n` and lone `\r` line breaks to `\n`
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_message_id_values() {
        assert_eq!(MessageId::Init.as_byte(), 0);
        assert_eq!(MessageId::Prev.as_byte(), 4);
        assert_eq!(MessageId::Image.as_byte(), 6);
        assert_eq!(MessageId::Ping.as_byte(), 100);
        assert_eq!(MessageId::from_byte(100), Some(MessageId::Ping));
        assert_eq!(MessageId::from_byte(7), None);
        assert_eq!(MessageId::from_byte(255), None);
    }

    #[test]
    fn test_notes_encoding() {
        let bytes = ServerMessage::notes("Hello\nWorld").encode().unwrap();

        let mut expected = vec![MessageId::Notes.as_byte(), 0, 0, 0, 11];
        expected.extend_from_slice(b"Hello\nWorld");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_notes_are_newline_normalized() {
        assert_eq!(
            ServerMessage::notes("a\r\nb\rc\nd"),
            ServerMessage::Notes("a\nb\nc\nd".to_string())
        );
    }

    #[test]
    fn test_payloadless_messages_are_one_byte() {
        assert_eq!(ServerMessage::Ping.encode().unwrap(), vec![100]);
        assert_eq!(ServerMessage::Stop.encode().unwrap(), vec![2]);
        assert_eq!(
            ServerMessage::InitReply { accepted: true }.encode().unwrap(),
            vec![0, 1]
        );
        assert_eq!(
            ServerMessage::InitReply { accepted: false }.encode().unwrap(),
            vec![0, 0]
        );
    }

    #[test]
    fn test_image_encoding() {
        let bytes = ServerMessage::Image(vec![0x89, b'P', b'N', b'G']).encode().unwrap();
        assert_eq!(bytes, vec![6, 0, 0, 0, 4, 0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_client_requests_decode() {
        let cases = [
            (1u8, ClientRequest::StartPresentation),
            (2, ClientRequest::StopPresentation),
            (3, ClientRequest::NextSlide),
            (4, ClientRequest::PreviousSlide),
        ];
        for (id, request) in cases {
            let mut cursor = Cursor::new(vec![id]);
            assert_eq!(
                ClientMessage::read_from(&mut cursor).await.unwrap(),
                ClientMessage::Request(request)
            );
        }
    }

    #[tokio::test]
    async fn test_client_init_decode() {
        let bytes = ClientMessage::Init { code: "ABC123".to_string() }.encode().unwrap();
        let mut cursor = Cursor::new(bytes);

        let decoded = ClientMessage::read_from(&mut cursor).await.unwrap();
        assert_eq!(decoded, ClientMessage::Init { code: "ABC123".to_string() });
    }

    #[tokio::test]
    async fn test_init_with_invalid_utf8_stays_in_sync() {
        let mut cursor = Cursor::new(vec![0u8, 0, 0, 0, 2, 0xC3, 0x28, 3]);

        match ClientMessage::read_from(&mut cursor).await.unwrap() {
            ClientMessage::Init { code } => assert!(!code.is_empty()),
            other => panic!("expected Init, got {:?}", other),
        }
        assert_eq!(
            ClientMessage::read_from(&mut cursor).await.unwrap(),
            ClientMessage::Request(ClientRequest::NextSlide)
        );
    }

    #[tokio::test]
    async fn test_unknown_ids_consume_only_the_id() {
        let mut cursor = Cursor::new(vec![42u8, 3]);

        assert_eq!(
            ClientMessage::read_from(&mut cursor).await.unwrap(),
            ClientMessage::Unknown(42)
        );
        // The following byte is still a message of its own
        assert_eq!(
            ClientMessage::read_from(&mut cursor).await.unwrap(),
            ClientMessage::Request(ClientRequest::NextSlide)
        );
    }

    #[tokio::test]
    async fn test_server_messages_read_back() {
        let mut buf = Vec::new();
        for message in [
            ServerMessage::InitReply { accepted: true },
            ServerMessage::Ping,
            ServerMessage::Image(vec![1, 2, 3]),
        ] {
            buf.extend(message.encode().unwrap());
        }

        let mut cursor = Cursor::new(buf);
        assert_eq!(
            ServerMessage::read_from(&mut cursor).await.unwrap(),
            ServerMessage::InitReply { accepted: true }
        );
        assert_eq!(ServerMessage::read_from(&mut cursor).await.unwrap(), ServerMessage::Ping);
        assert_eq!(
            ServerMessage::read_from(&mut cursor).await.unwrap(),
            ServerMessage::Image(vec![1, 2, 3])
        );
    }

    #[tokio::test]
    async fn test_read_from_closed_stream_fails() {
        let mut cursor = Cursor::new(Vec::new());
        assert!(matches!(
            ClientMessage::read_from(&mut cursor).await,
            Err(Error::Network(_))
        ));
    }
}
