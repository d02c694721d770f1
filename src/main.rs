//! radio-relay server binary.
//!
//! ```text
//!   Client ──GET /proxy/radio?url=──▶ http ──▶ relay ──HEAD/GET──▶ Upstream
//!   Client ◀── icy-* + audio bytes ── http ◀── relay ◀── body ───── Upstream
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use radio_relay::config::watcher::ConfigWatcher;
use radio_relay::lifecycle::{signals, startup, Shutdown};
use radio_relay::observability::{logging, metrics};
use radio_relay::HttpServer;

#[derive(Parser)]
#[command(name = "radio-relay")]
#[command(about = "Relay internet radio streams through this server", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Watched for changes.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = startup::load_or_default(args.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!("radio-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        connect_timeout_secs = config.upstream.connect_timeout_secs,
        read_timeout_secs = config.upstream.read_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (config_updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
