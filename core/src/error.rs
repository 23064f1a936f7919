use std::net::SocketAddr;

use thiserror::Error;

/// Deckremote error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("No authenticated client connected")]
    NotConnected,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Presentation host error: {0}")]
    Host(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error means the peer is gone or out of sync, so the
    /// session has to be torn down.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Error::Network(_) | Error::InvalidMessage(_) | Error::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
