//! Info command implementation.

use std::path::Path;

use deckremote_core::protocol::constants::{EXPORT_FORMAT, EXPORT_HEIGHT, EXPORT_WIDTH};
use deckremote_core::{discovery, Config};

use crate::config::{self, Overrides};

/// Display the effective configuration and where a remote can reach us.
pub fn show_info(config_path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<()> {
    let config = overrides.apply(config::load(config_path)?);
    print_config(&config, config_path);

    println!("\n\x1b[1mLocal IPs:\x1b[0m");
    for ip in discovery::local_ips() {
        println!("  • {}:{}", ip, config.port);
    }
    println!();
    Ok(())
}

fn print_config(config: &Config, config_path: Option<&Path>) {
    let source = match config_path {
        Some(path) => path.display().to_string(),
        None => config::default_path()
            .filter(|p| p.exists())
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in defaults".to_string()),
    };

    println!("\n\x1b[1m{} Info\x1b[0m", config.product_name);
    println!("═══════════════════════════════════════");
    println!("\x1b[1mConfig:\x1b[0m       {}", source);
    println!("\x1b[1mListen:\x1b[0m       {}", config.listen_addr());
    println!("\x1b[1mAnnounce to:\x1b[0m  {}", config.announce_target());
    println!("\x1b[1mEvery:\x1b[0m        {} ms", config.announce_interval_ms);
    println!("\x1b[1mCode length:\x1b[0m  {}", config.pairing_code_length);
    println!(
        "\x1b[1mSlides:\x1b[0m       {} at {}x{}",
        EXPORT_FORMAT, EXPORT_WIDTH, EXPORT_HEIGHT
    );
}
