//! UDP announcements that let remotes find the host on the local network
//!
//! The announcer sends a single text datagram, `"<product>-<presentation>"`,
//! to a broadcast (or any configured) address. Peers take the sender's IP and
//! connect to the control port. Sending is best-effort: nothing is
//! acknowledged and a failed send is not retried early.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::Instant;

use crate::{Error, Result};

/// Rate-limited discovery broadcaster
pub struct Announcer {
    socket: UdpSocket,
    target: SocketAddr,
    payload: Vec<u8>,
    interval: Duration,
    last_sent: Option<Instant>,
}

impl Announcer {
    /// Bind an ephemeral UDP socket able to reach `target`.
    ///
    /// The payload is encoded once here; build a new announcer when the
    /// presentation name changes.
    pub async fn bind(
        target: SocketAddr,
        interval: Duration,
        product_name: &str,
        presentation_name: &str,
    ) -> Result<Self> {
        let local: SocketAddr = match target.ip() {
            IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| Error::Bind { addr: local, source })?;
        socket.set_broadcast(true)?;

        let text = announcement_text(product_name, presentation_name);
        tracing::debug!("announcing \"{}\" to {}", text, target);

        Ok(Self {
            socket,
            target,
            payload: text.into_bytes(),
            interval,
            last_sent: None,
        })
    }

    /// Send the announcement unless the previous one went out less than
    /// one interval ago.
    ///
    /// Returns whether a datagram was sent. The first call always sends.
    /// A failed send still counts as an attempt for rate limiting.
    pub async fn announce(&mut self) -> Result<bool> {
        if let Some(last) = self.last_sent {
            if last.elapsed() < self.interval {
                return Ok(false);
            }
        }

        self.last_sent = Some(Instant::now());
        self.socket
            .send_to(&self.payload, self.target)
            .await
            .map_err(|e| Error::Network(format!("announce to {} failed: {}", self.target, e)))?;

        tracing::trace!("sent announcement to {}", self.target);
        Ok(true)
    }

    /// Bytes of the announcement datagram
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

/// Text carried by an announcement
pub fn announcement_text(product_name: &str, presentation_name: &str) -> String {
    format!("{}-{}", product_name, presentation_name)
}

/// Get local IP addresses (non-loopback)
pub fn local_ips() -> Vec<IpAddr> {
    let mut ips = Vec::new();

    if let Ok(interfaces) = get_if_addrs::get_if_addrs() {
        for iface in interfaces {
            if !iface.is_loopback() {
                ips.push(iface.ip());
            }
        }
    }

    ips
}
