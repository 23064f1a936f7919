//! Deckremote Core - remote control for presentation hosts
//!
//! A host application embeds one [`ControlService`]. The service announces
//! the presentation over UDP broadcast, accepts a single TCP peer that pairs
//! with a short code, turns the peer's commands into [`ServiceEvent`]s and
//! lets the host push slide notes and images back.

pub mod discovery;
pub mod host;
pub mod protocol;
pub mod service;
pub mod session;

mod error;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use error::{Error, Result};

/// Configuration for the control service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the TCP control listener binds to
    pub bind_address: IpAddr,
    /// TCP port peers connect to
    pub port: u16,
    /// Target address of discovery announcements
    pub broadcast_address: IpAddr,
    /// UDP port announcements are sent to, `None` means the TCP port
    pub announce_port: Option<u16>,
    /// Minimum time between two announcements, in milliseconds
    pub announce_interval_ms: u64,
    /// Number of characters in a pairing code
    pub pairing_code_length: usize,
    /// Prefix of the announcement payload
    pub product_name: String,
    /// Idle sleep of the session loop, in milliseconds
    pub idle_backoff_ms: u64,
    /// Upper bound for reading the rest of a message once its id arrived
    pub read_timeout_ms: u64,
    /// How long `stop` waits for the loop before force-closing it
    pub stop_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: protocol::constants::DEFAULT_PORT,
            broadcast_address: IpAddr::V4(Ipv4Addr::BROADCAST),
            announce_port: None,
            announce_interval_ms: protocol::constants::ANNOUNCE_INTERVAL_MS,
            pairing_code_length: protocol::constants::PAIRING_CODE_LENGTH,
            product_name: protocol::constants::PRODUCT_NAME.to_string(),
            idle_backoff_ms: protocol::constants::IDLE_BACKOFF_MS,
            read_timeout_ms: protocol::constants::READ_TIMEOUT_MS,
            stop_timeout_ms: protocol::constants::STOP_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.pairing_code_length == 0 {
            return Err(Error::Config("pairing_code_length must be at least 1".to_string()));
        }
        if self.idle_backoff_ms == 0 {
            return Err(Error::Config("idle_backoff_ms must be at least 1".to_string()));
        }
        if self.read_timeout_ms == 0 {
            return Err(Error::Config("read_timeout_ms must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Socket address of the TCP control listener
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Destination of discovery announcements
    pub fn announce_target(&self) -> SocketAddr {
        SocketAddr::new(
            self.broadcast_address,
            self.announce_port.unwrap_or(self.port),
        )
    }

    pub fn announce_interval(&self) -> Duration {
        Duration::from_millis(self.announce_interval_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

// Re-export key types for convenience
pub use host::PresentationHost;
pub use protocol::{ClientMessage, ClientRequest, PairingCode, ServerMessage};
pub use service::{ControlService, ServiceEvent, ServiceState};
