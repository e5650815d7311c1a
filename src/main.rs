//! SOCKS5 relay (v1)
//!
//! A reverse proxy that forwards REST API calls through a SOCKS5 tunnel.
//!
//! # Architecture Overview
//!
//! ```text
//!                              ┌──────────────────────────────────────────────┐
//!                              │                 SOCKS RELAY                  │
//!     Client Request           │  ┌─────────┐    ┌─────────┐    ┌──────────┐  │
//!     ─────────────────────────┼─▶│  http   │───▶│ routes  │───▶│ headers  │  │
//!                              │  │ server  │    │  /v1/*  │    │ sanitize │  │
//!                              │  └─────────┘    └─────────┘    └────┬─────┘  │
//!                              │                                     ▼        │
//!                              │                              ┌────────────┐  │
//!                              │                              │ dispatcher │  │
//!                              │                              └─────┬──────┘  │
//!                              │                                    ▼         │    SOCKS5    Upstream
//!     Client Response          │  ┌──────────┐              ┌────────────┐    │   ┌──────┐   ┌─────┐
//!     ◀────────────────────────┼──│ response │◀─────────────│   tunnel   │────┼──▶│ h    │──▶│ API │
//!                              │  │ emitter  │              │ transport  │    │   └──────┘   └─────┘
//!                              │  └──────────┘              └────────────┘    │
//!                              └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use socks_relay::config::load_config;
use socks_relay::lifecycle::{signals, startup};
use socks_relay::observability::{logging, metrics};
use socks_relay::Shutdown;

#[derive(Parser)]
#[command(name = "socks-relay")]
#[command(about = "Reverse proxy that tunnels REST API calls through SOCKS5", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Missing SOCKS5 host/port fails here, before anything is bound.
    let config = load_config(cli.config.as_deref())?;

    logging::init_logging(&config);

    tracing::info!("socks-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        upstream = %config.upstream.base_url,
        proxy = %config.socks5.redacted_url().unwrap_or_default(),
        bind_address = %config.listener.bind_address(),
        debug = config.debug,
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

    let (server, listener) = startup::prepare(config).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_on_signal(&shutdown).await;
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
