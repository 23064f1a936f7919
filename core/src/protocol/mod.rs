//! Wire protocol: message ids, field framing and pairing codes

pub mod constants;
pub mod framing;
mod messages;
mod pairing;

pub use messages::{normalize_newlines, ClientMessage, ClientRequest, MessageId, ServerMessage};
pub use pairing::{PairingCode, ALPHABET};
