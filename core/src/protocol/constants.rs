//! Centralized protocol constants
//!
//! Defaults for [`crate::Config`] and the fixed limits of the wire format.

/// Default TCP port for the control channel; announcements use it too
pub const DEFAULT_PORT: u16 = 34012;

/// Name put in front of the presentation name in announcements
pub const PRODUCT_NAME: &str = "Deck Remote";

/// Default minimum interval between two announcements, in milliseconds
pub const ANNOUNCE_INTERVAL_MS: u64 = 3000;

/// Default pairing code length
pub const PAIRING_CODE_LENGTH: usize = 6;

/// Session loop sleep when there is nothing to do, in milliseconds
pub const IDLE_BACKOFF_MS: u64 = 500;

/// Upper bound for reading a message body once its id arrived, in milliseconds
pub const READ_TIMEOUT_MS: u64 = 5000;

/// How long `stop` waits for the session loop before aborting it, in milliseconds
pub const STOP_TIMEOUT_MS: u64 = 1000;

/// Pending connections the listener keeps while a client is being served
pub const LISTEN_BACKLOG: u32 = 1;

/// Largest string or byte payload accepted in either direction (16 MiB)
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Image format hosts are expected to export slides in
pub const EXPORT_FORMAT: &str = "PNG";

/// Width of exported slide images
pub const EXPORT_WIDTH: u32 = 1024;

/// Height of exported slide images
pub const EXPORT_HEIGHT: u32 = 768;
