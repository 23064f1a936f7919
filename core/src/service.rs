//! High-level control service that coordinates all components

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::discovery::Announcer;
use crate::host::{self, PresentationHost};
use crate::protocol::{ClientRequest, PairingCode, ServerMessage};
use crate::session::{self, SessionEvent, SessionServer, SessionWriter};
use crate::{Config, Result};

/// Events emitted by the control service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    /// The service is listening; show this code to the user
    Started { pairing_code: String },
    /// The service stopped and released its sockets
    Stopped,
    /// A remote connected or went away
    ClientStatusChanged { connected: bool },
    /// Command from the paired remote
    ClientRequest(ClientRequest),
}

/// Lifecycle state of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Starting,
    Listening,
    Connected { authenticated: bool },
}

/// Resources of a running service
struct Running {
    pairing_code: PairingCode,
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    session_task: JoinHandle<()>,
    pump_task: JoinHandle<()>,
}

/// Remote-control service embedded in a presentation host.
///
/// The host owns one instance and hands references to whatever UI needs
/// it. `start` and `stop` are idempotent.
pub struct ControlService {
    config: Config,
    host: Option<Arc<dyn PresentationHost>>,
    events: mpsc::UnboundedSender<ServiceEvent>,
    writer: SessionWriter,
    state: Arc<watch::Sender<ServiceState>>,
    running: Option<Running>,
}

impl ControlService {
    /// Create the service and the channel its events are delivered on
    pub fn new(config: Config) -> (Self, mpsc::UnboundedReceiver<ServiceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ServiceState::Stopped);
        let service = Self {
            writer: SessionWriter::new(config.read_timeout()),
            config,
            host: None,
            events: tx,
            state: Arc::new(state),
            running: None,
        };
        (service, rx)
    }

    /// Let the service drive the given host when the remote sends commands
    pub fn with_host(mut self, host: Arc<dyn PresentationHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> ServiceState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<ServiceState> {
        self.state.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Code of the current run, if running
    pub fn pairing_code(&self) -> Option<&PairingCode> {
        self.running.as_ref().map(|r| &r.pairing_code)
    }

    /// Address the control listener is bound to, if running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Generate a pairing code, bind the control port and start announcing
    /// `presentation_name`.
    ///
    /// Does nothing if already running. An invalid config or a bind failure
    /// is returned and leaves the service stopped.
    pub async fn start(&mut self, presentation_name: &str) -> Result<()> {
        if let Some(running) = &self.running {
            if !running.session_task.is_finished() {
                tracing::debug!("start ignored, already running");
                return Ok(());
            }
            tracing::warn!("session loop ended unexpectedly, restarting");
            self.stop().await;
        }

        self.config.validate()?;

        self.state.send_replace(ServiceState::Starting);
        match self.launch(presentation_name).await {
            Ok(running) => {
                tracing::info!(
                    "control service started on {} for \"{}\"",
                    running.local_addr,
                    presentation_name
                );
                self.running = Some(running);
                Ok(())
            }
            Err(e) => {
                self.state.send_replace(ServiceState::Stopped);
                Err(e)
            }
        }
    }

    async fn launch(&self, presentation_name: &str) -> Result<Running> {
        let pairing_code = PairingCode::generate(self.config.pairing_code_length);

        let listener = session::bind(&self.config)?;
        let local_addr = listener.local_addr()?;

        let announcer = Announcer::bind(
            self.config.announce_target(),
            self.config.announce_interval(),
            &self.config.product_name,
            presentation_name,
        )
        .await?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let (session_tx, session_rx) = mpsc::unbounded_channel();

        let server = SessionServer::new(
            listener,
            announcer,
            pairing_code.clone(),
            self.writer.clone(),
            &self.config,
            session_tx,
            self.state.clone(),
        );

        // Started goes out before anything the loop can report
        let _ = self.events.send(ServiceEvent::Started {
            pairing_code: pairing_code.to_string(),
        });
        self.state.send_replace(ServiceState::Listening);

        let session_task = tokio::spawn(server.run(shutdown_rx));
        let pump_task = tokio::spawn(pump_events(
            session_rx,
            self.events.clone(),
            self.host.clone(),
            self.writer.clone(),
        ));

        Ok(Running {
            pairing_code,
            local_addr,
            shutdown,
            session_task,
            pump_task,
        })
    }

    /// Stop the session loop and close all sockets.
    ///
    /// Waits at most the configured stop timeout for the loop to finish on
    /// its own, then aborts it. Does nothing if not running.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        let deadline = tokio::time::Instant::now() + self.config.stop_timeout();
        let _ = running.shutdown.send(true);

        let mut session_task = running.session_task;
        match tokio::time::timeout_at(deadline, &mut session_task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("session loop failed: {}", e),
            Err(_) => {
                tracing::warn!("session loop did not stop in time, aborting");
                session_task.abort();
                let _ = session_task.await;
            }
        }
        // Closes the client if the loop was aborted mid-flight
        self.writer.detach().await;

        let mut pump_task = running.pump_task;
        if tokio::time::timeout_at(deadline, &mut pump_task).await.is_err() {
            pump_task.abort();
        }

        self.state.send_replace(ServiceState::Stopped);
        let _ = self.events.send(ServiceEvent::Stopped);
        tracing::info!("control service stopped");
    }

    /// Tell the remote the presentation ended
    pub async fn send_stop(&self) -> Result<()> {
        self.writer.send_authenticated(&ServerMessage::Stop).await
    }

    /// Send the current slide's notes; line endings are normalized
    pub async fn send_slide_notes(&self, text: &str) -> Result<()> {
        self.writer
            .send_authenticated(&ServerMessage::notes(text))
            .await
    }

    /// Send the current slide as encoded image bytes
    pub async fn send_slide_image_data(&self, data: Vec<u8>) -> Result<()> {
        self.writer
            .send_authenticated(&ServerMessage::Image(data))
            .await
    }
}

impl Drop for ControlService {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown.send(true);
            running.session_task.abort();
            running.pump_task.abort();
        }
    }
}

/// Translate session events for the host and, when a presentation host is
/// attached, carry out the remote's commands
async fn pump_events(
    mut session_rx: mpsc::UnboundedReceiver<SessionEvent>,
    events: mpsc::UnboundedSender<ServiceEvent>,
    host: Option<Arc<dyn PresentationHost>>,
    writer: SessionWriter,
) {
    while let Some(event) = session_rx.recv().await {
        let service_event = match event {
            SessionEvent::ClientConnected { .. } => ServiceEvent::ClientStatusChanged { connected: true },
            SessionEvent::ClientDisconnected { .. } => {
                ServiceEvent::ClientStatusChanged { connected: false }
            }
            SessionEvent::ClientAuthenticated { .. } => continue,
            SessionEvent::Request(request) => ServiceEvent::ClientRequest(request),
        };

        let request = match service_event {
            ServiceEvent::ClientRequest(request) => Some(request),
            _ => None,
        };

        if events.send(service_event).is_err() {
            tracing::trace!("service event dropped, no receiver");
        }

        if let (Some(host), Some(request)) = (&host, request) {
            if let Err(e) = host::apply_request(host.as_ref(), request, &writer).await {
                tracing::warn!("failed to apply {:?} to presentation host: {}", request, e);
            }
        }
    }
}
