//! TCP control channel: the single peer session and the loop that drives it

pub mod connection;
pub mod server;

pub use connection::{ClientReader, Session, SessionWriter};
pub use server::{bind, SessionEvent, SessionServer};
