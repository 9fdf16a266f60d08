//! watchlog-edge server.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                    WATCHLOG EDGE                      │
//!                      │                                                       │
//!   GET /api/proxy-    │  ┌────────┐   ┌──────────┐   ┌────────────┐          │
//!   image?url=...  ────┼─▶│ http   │──▶│ security │──▶│   image    │──────────┼──▶ CDN / storage
//!                      │  │ server │   │url_policy│   │  fetcher   │          │    (https only)
//!                      │  └────────┘   └──────────┘   └─────┬──────┘          │
//!                      │       ▲                            │ limits/headers  │
//!   image bytes  ◀─────┼───────┴────────────────────────────┘                 │
//!                      │                                                       │
//!                      │  ┌─────────────────────────────────────────────────┐ │
//!                      │  │  config (+ reload) · observability · lifecycle  │ │
//!                      │  └─────────────────────────────────────────────────┘ │
//!                      └──────────────────────────────────────────────────────┘
//! ```
//!
//! The fetch layer (`watchlog_edge::fetch`) is a library surface; see
//! `edge-cli fetch` for a command-line consumer.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use watchlog_edge::config::loader::config_from_env;
use watchlog_edge::config::load_config;
use watchlog_edge::config::watcher::ConfigWatcher;
use watchlog_edge::http::HttpServer;
use watchlog_edge::lifecycle::Shutdown;
use watchlog_edge::net::tls::load_tls_config;
use watchlog_edge::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "watchlog-edge", version, about = "Image proxy and fetch edge for watchlog")]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the URL policy when the configuration file changes.
    #[arg(long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => config_from_env()?,
    };

    logging::init_logging(&config.observability);
    tracing::info!("watchlog-edge v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        storage_url = ?config.image_proxy.storage_url,
        max_retries = config.retries.max_retries,
        retry_delay_ms = config.retries.retry_delay_ms,
        rate_limit = config.rate_limit.enabled,
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

    // Keep the watcher alive for the life of the server.
    let (_watcher, config_updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();
    let server_shutdown = shutdown.subscribe();

    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    match tls {
        Some(tls) => {
            let addr: SocketAddr = bind_address.parse()?;
            let tls_config = load_tls_config(&tls).await?;
            server
                .run_tls(addr, tls_config, config_updates, server_shutdown)
                .await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, config_updates, server_shutdown).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
