//! The connected peer: a polling reader owned by the session loop and a
//! shared writer every outbound message goes through

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::{Error, Result};

type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;

struct PeerSlot {
    stream: BoxedWrite,
    authenticated: bool,
}

/// Write half of the current session, shared between the session loop and
/// the host.
///
/// All sends take the same lock, so messages reach the peer whole and in
/// the order they were issued. Each write is bounded by the I/O timeout.
#[derive(Clone)]
pub struct SessionWriter {
    slot: Arc<Mutex<Option<PeerSlot>>>,
    io_timeout: Duration,
}

impl SessionWriter {
    pub fn new(io_timeout: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            io_timeout,
        }
    }

    /// Install the write half of a new connection. A previous connection is
    /// shut down first.
    pub async fn attach<W>(&self, stream: W)
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let mut slot = self.slot.lock().await;
        if let Some(previous) = slot.take() {
            self.close(previous).await;
        }
        *slot = Some(PeerSlot {
            stream: Box::new(stream),
            authenticated: false,
        });
    }

    /// Shut down and drop the current connection, if any
    pub async fn detach(&self) {
        let previous = self.slot.lock().await.take();
        if let Some(previous) = previous {
            self.close(previous).await;
        }
    }

    /// Allow host-originated sends to reach the current peer
    pub async fn mark_authenticated(&self) {
        if let Some(peer) = self.slot.lock().await.as_mut() {
            peer.authenticated = true;
        }
    }

    pub async fn is_attached(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.slot
            .lock()
            .await
            .as_ref()
            .map(|peer| peer.authenticated)
            .unwrap_or(false)
    }

    /// Send to the current peer whether or not it has paired yet
    pub async fn send(&self, message: &ServerMessage) -> Result<()> {
        self.send_inner(message, false).await
    }

    /// Send to the current peer only once it has paired
    pub async fn send_authenticated(&self, message: &ServerMessage) -> Result<()> {
        self.send_inner(message, true).await
    }

    async fn send_inner(&self, message: &ServerMessage, require_auth: bool) -> Result<()> {
        let frame = message.encode()?;

        let mut slot = self.slot.lock().await;
        let peer = match slot.as_mut() {
            Some(peer) if peer.authenticated || !require_auth => peer,
            _ => return Err(Error::NotConnected),
        };

        tokio::time::timeout(self.io_timeout, async {
            peer.stream.write_all(&frame).await?;
            // Flush to ensure data is sent
            peer.stream.flush().await?;
            Ok::<_, std::io::Error>(())
        })
        .await
        .map_err(|_| Error::Network("write timed out".to_string()))?
        .map_err(|e| Error::Network(e.to_string()))?;

        tracing::trace!("sent {:?} ({} bytes)", message.message_id(), frame.len());
        Ok(())
    }

    async fn close(&self, mut peer: PeerSlot) {
        let _ = tokio::time::timeout(self.io_timeout, peer.stream.shutdown()).await;
    }
}

/// Read half of the current session
pub struct ClientReader<R = OwnedReadHalf> {
    stream: R,
}

impl<R: AsyncRead + Unpin> ClientReader<R> {
    pub fn new(stream: R) -> Self {
        Self { stream }
    }

    /// Wait up to `wait` for the next message id, then read the rest of the
    /// message within `read_timeout`.
    ///
    /// Returns `Ok(None)` when nothing arrived. A closed connection, a body
    /// that does not arrive in time or a malformed body is an error; the
    /// stream is unusable afterwards.
    pub async fn poll(
        &mut self,
        wait: Duration,
        read_timeout: Duration,
    ) -> Result<Option<ClientMessage>> {
        // No bytes are consumed when the wait elapses
        let id = match tokio::time::timeout(wait, self.stream.read_u8()).await {
            Err(_) => return Ok(None),
            Ok(Ok(id)) => id,
            Ok(Err(e)) => return Err(Error::Network(e.to_string())),
        };

        let message = tokio::time::timeout(read_timeout, ClientMessage::read_body(id, &mut self.stream))
            .await
            .map_err(|_| Error::Network(format!("timed out reading body of message {}", id)))??;

        Ok(Some(message))
    }
}

/// The single peer relationship of a running service
pub struct Session {
    pub id: Uuid,
    pub peer_addr: SocketAddr,
    pub authenticated: bool,
    pub reader: ClientReader,
}

impl Session {
    pub fn new(peer_addr: SocketAddr, stream: OwnedReadHalf) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer_addr,
            authenticated: false,
            reader: ClientReader::new(stream),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ClientRequest;
    use tokio_test::io::Builder;

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_send_without_peer_fails() {
        let writer = SessionWriter::new(TIMEOUT);
        assert!(matches!(
            writer.send(&ServerMessage::Ping).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_authenticated_send_requires_pairing() {
        let writer = SessionWriter::new(TIMEOUT);
        writer
            .attach(Builder::new().write(&[0, 1]).write(&[100]).build())
            .await;

        assert!(matches!(
            writer.send_authenticated(&ServerMessage::Ping).await,
            Err(Error::NotConnected)
        ));

        writer
            .send(&ServerMessage::InitReply { accepted: true })
            .await
            .unwrap();
        writer.mark_authenticated().await;
        assert!(writer.is_authenticated().await);
        writer.send_authenticated(&ServerMessage::Ping).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_failure_is_network_error() {
        let writer = SessionWriter::new(TIMEOUT);
        writer
            .attach(
                Builder::new()
                    .write_error(std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe,
                        "broken pipe",
                    ))
                    .build(),
            )
            .await;

        let err = writer.send(&ServerMessage::Ping).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
        assert!(err.is_disconnect());
    }

    #[tokio::test]
    async fn test_detach_forgets_peer() {
        let writer = SessionWriter::new(TIMEOUT);
        writer.attach(Builder::new().build()).await;
        assert!(writer.is_attached().await);

        writer.detach().await;
        assert!(!writer.is_attached().await);
        assert!(!writer.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_attach_resets_authentication() {
        let writer = SessionWriter::new(TIMEOUT);
        writer.attach(Builder::new().build()).await;
        writer.mark_authenticated().await;

        writer.attach(Builder::new().build()).await;
        assert!(!writer.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_poll_reads_one_message() {
        let mut reader = ClientReader::new(Builder::new().read(&[3]).build());

        let message = reader.poll(TIMEOUT, TIMEOUT).await.unwrap();
        assert_eq!(message, Some(ClientMessage::Request(ClientRequest::NextSlide)));
    }

    #[tokio::test]
    async fn test_poll_returns_none_when_idle() {
        let mut reader = ClientReader::new(
            Builder::new()
                .wait(Duration::from_millis(200))
                .read(&[4])
                .build(),
        );

        assert_eq!(reader.poll(Duration::from_millis(20), TIMEOUT).await.unwrap(), None);
        assert_eq!(
            reader.poll(TIMEOUT, TIMEOUT).await.unwrap(),
            Some(ClientMessage::Request(ClientRequest::PreviousSlide))
        );
    }

    #[tokio::test]
    async fn test_poll_times_out_on_stalled_body() {
        // Init id and half a length prefix, then nothing
        let mut reader = ClientReader::new(
            Builder::new()
                .read(&[0, 0, 0])
                .wait(Duration::from_secs(5))
                .build(),
        );

        let result = reader.poll(TIMEOUT, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_poll_reports_closed_stream() {
        let mut reader = ClientReader::new(Builder::new().build());
        assert!(reader.poll(TIMEOUT, TIMEOUT).await.is_err());
    }
}
