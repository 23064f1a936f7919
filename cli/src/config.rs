//! Config file loading.
//!
//! The file is TOML with the same keys as [`Config`]; every key is optional:
//!
//! ```toml
//! port = 34012
//! broadcast_address = "192.168.1.255"
//! announce_interval_ms = 3000
//! ```

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use deckremote_core::Config;

/// `~/.deckremote/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".deckremote").join("config.toml"))
}

/// Load the config from `path`, or from the default location if it exists.
///
/// An explicitly given file must exist. Without one, a missing default file
/// means built-in defaults.
pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => read(path),
        None => match default_path() {
            Some(path) if path.exists() => read(&path),
            _ => Ok(Config::default()),
        },
    }
}

fn read(path: &Path) -> anyhow::Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = toml::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    tracing::debug!("loaded config from {}", path.display());
    Ok(config)
}

/// Values given on the command line win over the file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub port: Option<u16>,
    pub broadcast: Option<IpAddr>,
}

impl Overrides {
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(broadcast) = self.broadcast {
            config.broadcast_address = broadcast;
        }
        config
    }
}
