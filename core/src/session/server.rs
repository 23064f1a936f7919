//! The session loop: announce while idle, accept one peer, pair it, relay
//! its commands and detect when it goes away
//!
//! One task runs the whole loop and owns the listener, the announcer and
//! the read half of the connection. Each iteration is short: an idle
//! iteration announces and waits at most the idle backoff for a connection,
//! a connected iteration pings a paired peer and waits at most the idle
//! backoff for input. Shutdown is observed between and during iterations.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::{mpsc, watch};
use tracing::Instrument;

use crate::discovery::Announcer;
use crate::protocol::constants::LISTEN_BACKLOG;
use crate::protocol::{ClientMessage, ClientRequest, PairingCode, ServerMessage};
use crate::service::ServiceState;
use crate::session::connection::{Session, SessionWriter};
use crate::{Config, Error, Result};

/// Event from the session loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A peer connection was accepted
    ClientConnected { peer_addr: SocketAddr },
    /// The peer sent the correct pairing code
    ClientAuthenticated { peer_addr: SocketAddr },
    /// The peer went away or was closed
    ClientDisconnected { peer_addr: SocketAddr },
    /// Playback command from a paired peer
    Request(ClientRequest),
}

/// Bind the control listener with a single-slot backlog
pub fn bind(config: &Config) -> Result<TcpListener> {
    let addr = config.listen_addr();
    let bind_err = |source| Error::Bind { addr, source };

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(bind_err)?;

    #[cfg(unix)]
    socket.set_reuseaddr(true).map_err(bind_err)?;

    socket.bind(addr).map_err(bind_err)?;
    socket.listen(LISTEN_BACKLOG).map_err(bind_err)
}

/// State owned by the session loop
pub struct SessionServer {
    listener: TcpListener,
    announcer: Announcer,
    pairing_code: PairingCode,
    writer: SessionWriter,
    events: mpsc::UnboundedSender<SessionEvent>,
    state: Arc<watch::Sender<ServiceState>>,
    idle_backoff: Duration,
    read_timeout: Duration,
    session: Option<Session>,
}

impl SessionServer {
    pub fn new(
        listener: TcpListener,
        announcer: Announcer,
        pairing_code: PairingCode,
        writer: SessionWriter,
        config: &Config,
        events: mpsc::UnboundedSender<SessionEvent>,
        state: Arc<watch::Sender<ServiceState>>,
    ) -> Self {
        Self {
            listener,
            announcer,
            pairing_code,
            writer,
            events,
            state,
            idle_backoff: config.idle_backoff(),
            read_timeout: config.read_timeout(),
            session: None,
        }
    }

    /// Run until `shutdown` flips to true or its sender is dropped.
    ///
    /// Every exit path closes the client connection before returning; the
    /// listener and announcer sockets close when `self` is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let span = match self.listener.local_addr() {
            Ok(addr) => tracing::info_span!("session_loop", %addr),
            Err(_) => tracing::info_span!("session_loop"),
        };

        async move {
            tracing::info!("session loop running, announcing to {}", self.announcer.target());

            while !*shutdown.borrow() {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = self.step() => {}
                }
            }

            self.teardown("service stopped").await;
            tracing::info!("session loop stopped");
        }
        .instrument(span)
        .await
    }

    async fn step(&mut self) {
        if self.session.is_some() {
            self.serve().await;
        } else {
            self.listen().await;
        }
    }

    /// No peer: announce, then wait briefly for a connection
    async fn listen(&mut self) {
        if let Err(e) = self.announcer.announce().await {
            tracing::warn!("{}", e);
        }

        let accepted = tokio::select! {
            accepted = self.listener.accept() => Some(accepted),
            _ = tokio::time::sleep(self.idle_backoff) => None,
        };

        match accepted {
            Some(Ok((stream, peer_addr))) => self.attach(stream, peer_addr).await,
            Some(Err(e)) => {
                tracing::error!("accept error: {}", e);
                tokio::time::sleep(self.idle_backoff).await;
            }
            None => {}
        }
    }

    async fn attach(&mut self, stream: TcpStream, peer_addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("failed to set TCP_NODELAY for {}: {}", peer_addr, e);
        }

        let (read_half, write_half) = stream.into_split();
        self.writer.attach(write_half).await;

        let session = Session::new(peer_addr, read_half);
        tracing::info!(session = %session.id, "client connected from {}", peer_addr);
        self.session = Some(session);

        self.state
            .send_replace(ServiceState::Connected { authenticated: false });
        self.emit(SessionEvent::ClientConnected { peer_addr });
    }

    /// Peer present: ping if paired, then wait briefly for one message
    async fn serve(&mut self) {
        let authenticated = match &self.session {
            Some(session) => session.authenticated,
            None => return,
        };

        if authenticated {
            if let Err(e) = self.writer.send(&ServerMessage::Ping).await {
                self.teardown(&format!("ping failed: {}", e)).await;
                return;
            }
        }

        let (wait, read_timeout) = (self.idle_backoff, self.read_timeout);
        let polled = match self.session.as_mut() {
            Some(session) => session.reader.poll(wait, read_timeout).await,
            None => return,
        };

        match polled {
            Ok(Some(message)) => self.dispatch(message).await,
            Ok(None) => {}
            Err(e) if e.is_disconnect() => self.teardown(&e.to_string()).await,
            Err(e) => tracing::warn!("ignoring unreadable message: {}", e),
        }
    }

    async fn dispatch(&mut self, message: ClientMessage) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        tracing::debug!(session = %session.id, "received {:?}", message);

        match message {
            ClientMessage::Init { code } => {
                let accepted = self.pairing_code.matches(&code);
                let newly_paired = accepted && !session.authenticated;
                let peer_addr = session.peer_addr;

                if newly_paired {
                    session.authenticated = true;
                    self.writer.mark_authenticated().await;
                }

                if accepted {
                    tracing::info!("client {} paired", peer_addr);
                } else {
                    tracing::warn!("client {} sent a wrong pairing code", peer_addr);
                }

                if let Err(e) = self
                    .writer
                    .send(&ServerMessage::InitReply { accepted })
                    .await
                {
                    self.teardown(&format!("pairing reply failed: {}", e)).await;
                    return;
                }

                if newly_paired {
                    self.state
                        .send_replace(ServiceState::Connected { authenticated: true });
                    self.emit(SessionEvent::ClientAuthenticated { peer_addr });
                }
            }
            ClientMessage::Request(request) => {
                if session.authenticated {
                    self.emit(SessionEvent::Request(request));
                } else {
                    tracing::debug!("ignoring {:?} from unpaired client", request);
                }
            }
            ClientMessage::Unknown(id) => {
                tracing::debug!("ignoring unknown message id {}", id);
            }
        }
    }

    /// Close the current session, if any, and go back to listening
    async fn teardown(&mut self, reason: &str) {
        let Some(session) = self.session.take() else {
            return;
        };

        self.writer.detach().await;
        drop(session.reader);

        tracing::info!(session = %session.id, "client {} disconnected: {}", session.peer_addr, reason);
        self.state.send_replace(ServiceState::Listening);
        self.emit(SessionEvent::ClientDisconnected {
            peer_addr: session.peer_addr,
        });
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("session event dropped, no receiver");
        }
    }
}
