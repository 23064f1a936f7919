//! Deck Remote CLI - control a slide show from a paired remote.

mod commands;
mod config;
mod host;
mod ui;

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::RunOptions;
use config::Overrides;

#[derive(Parser)]
#[command(name = "deckremote")]
#[command(about = "Presentation remote control host", long_about = None)]
struct Cli {
    /// Presentation name to announce
    #[arg(short, long, global = true)]
    name: Option<String>,

    /// Folder of exported slide images to present
    #[arg(short, long, global = true)]
    slides: Option<PathBuf>,

    /// TCP port to listen on
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Address discovery announcements are sent to
    #[arg(short, long, global = true)]
    broadcast: Option<IpAddr>,

    /// Config file (default: ~/.deckremote/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the remote control service (default)
    Run,
    /// Show configuration and local addresses
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("deckremote=info".parse()?)
                .add_directive("deckremote_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let overrides = Overrides {
        port: cli.port,
        broadcast: cli.broadcast,
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            commands::run_service(RunOptions {
                name: cli.name,
                slides: cli.slides,
                config: cli.config,
                overrides,
            })
            .await?
        }
        Commands::Info => commands::show_info(cli.config.as_deref(), &overrides)?,
    }

    Ok(())
}
