//! ip-deny-gate server.
//!
//! ```text
//!     Client Request        ┌──────────────────────────────────────────────┐
//!     ──────────────────────┼─▶ request id ─▶ deny list ─▶ forward handler ─┼──▶ Upstream
//!                           │                    │                         │
//!     403 Forbidden         │                    ▼                         │
//!     ◀─────────────────────┼───────────── candidate in deny set           │
//!                           │                                              │
//!                           │   config watcher ─▶ policy swap (arc-swap)   │
//!                           └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use ip_deny_gate::config::{load_config, watcher::ConfigWatcher};
use ip_deny_gate::observability::{init_logging, metrics};
use ip_deny_gate::{GateServer, Shutdown};

#[derive(Parser)]
#[command(name = "ip-deny-gate")]
#[command(about = "HTTP gate that rejects requests from denied client addresses", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "deny-gate.toml")]
    config: PathBuf,

    /// Do not watch the configuration file for changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    init_logging(&config.observability);

    tracing::info!(
        config = %args.config.display(),
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        request_timeout_secs = config.timeouts.request_secs,
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
    let (_watcher, config_updates) = if config.reload.watch && !args.no_watch {
        let (watcher, updates) = ConfigWatcher::new(
            &args.config,
            Duration::from_secs(config.reload.poll_interval_secs),
        );
        (Some(watcher.run()?), updates)
    } else {
        let (_, updates) = mpsc::unbounded_channel();
        (None, updates)
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = GateServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
