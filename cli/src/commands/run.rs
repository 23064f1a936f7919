//! Run command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use deckremote_core::{discovery, ClientRequest, ControlService, ServiceEvent};

use crate::config::{self, Overrides};
use crate::host::SlideFolder;
use crate::ui::{print_banner, print_pairing_code};

/// Options of the `run` command
#[derive(Debug, Default)]
pub struct RunOptions {
    pub name: Option<String>,
    pub slides: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub overrides: Overrides,
}

/// Run the control service until Ctrl+C.
pub async fn run_service(options: RunOptions) -> anyhow::Result<()> {
    let config = options
        .overrides
        .apply(config::load(options.config.as_deref())?);
    let name = presentation_name(&options);

    print_banner();

    let (service, mut events) = ControlService::new(config);
    let mut service = match &options.slides {
        Some(dir) => {
            let folder = SlideFolder::open(dir)?;
            println!("\x1b[1mSlides:\x1b[0m       {} ({} images)", dir.display(), folder.len());
            service.with_host(Arc::new(folder))
        }
        None => service,
    };

    println!("\x1b[1mPresentation:\x1b[0m {}", name);

    service.start(&name).await?;

    if let Some(addr) = service.local_addr() {
        println!("\x1b[1mListening:\x1b[0m    port {}", addr.port());
        for ip in discovery::local_ips() {
            println!("              {}:{}", ip, addr.port());
        }
    }
    println!("\x1b[2mPress Ctrl+C to stop.\x1b[0m");

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);
    ctrlc::set_handler(move || {
        let _ = tx.blocking_send(());
    })?;

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                handle_event(event);
            }
            _ = rx.recv() => {
                println!("\n\x1b[1;33mShutting down...\x1b[0m");
                break;
            }
        }
    }

    service.stop().await;
    Ok(())
}

/// Explicit name, else the slides folder's name, else this machine's name
fn presentation_name(options: &RunOptions) -> String {
    if let Some(name) = &options.name {
        return name.clone();
    }

    options
        .slides
        .as_deref()
        .and_then(|dir| dir.canonicalize().ok())
        .and_then(|dir| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
        .or_else(|| {
            hostname::get()
                .ok()
                .map(|h| h.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| deckremote_core::protocol::constants::PRODUCT_NAME.to_string())
}

/// Print a service event.
fn handle_event(event: ServiceEvent) {
    match event {
        ServiceEvent::Started { pairing_code } => print_pairing_code(&pairing_code),
        ServiceEvent::Stopped => println!("\x1b[1;31m⬤\x1b[0m Service stopped"),
        ServiceEvent::ClientStatusChanged { connected: true } => {
            println!("\x1b[1;32m⬤\x1b[0m Remote connected");
        }
        ServiceEvent::ClientStatusChanged { connected: false } => {
            println!("\x1b[1;31m⬤\x1b[0m Remote disconnected");
        }
        ServiceEvent::ClientRequest(request) => {
            println!("\x1b[1;34m▶\x1b[0m {}", describe(request));
        }
    }
}

fn describe(request: ClientRequest) -> &'static str {
    match request {
        ClientRequest::StartPresentation => "Start presentation",
        ClientRequest::StopPresentation => "Stop presentation",
        ClientRequest::NextSlide => "Next slide",
        ClientRequest::PreviousSlide => "Previous slide",
    }
}
