//! Pairing code generation
//!
//! A pairing code is a short string the user reads off the host and types
//! into the remote. One code is generated per service start.

use std::fmt;

use rand::Rng;

/// Symbols a pairing code is drawn from
pub const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Shared secret for one run of the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingCode(String);

impl PairingCode {
    /// Generate a code of `length` characters from the thread-local RNG,
    /// which is seeded from the OS.
    pub fn generate(length: usize) -> Self {
        Self::generate_with(&mut rand::thread_rng(), length)
    }

    /// Generate a code from the given random source
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, length: usize) -> Self {
        let code = (0..length)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Exact, case-sensitive comparison with a code sent by a peer
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PairingCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}
