//! Purchases listener
//!
//! SOAP compatibility shim for the Crystals SetLoyalty purchases feed.
//!
//! # Architecture Overview
//!
//! ```text
//!     SOAP request ──▶ http::server ──▶ soap::extract ──▶ purchases::processor ──▶ storage
//!                                                                │                     │
//!     SOAP response ◀── http::response ◀── soap::response ◀──────┘   (dedup by digest) │
//!                                                                                      ▼
//!                                                                       PostgreSQL / memory
//! ```
//!
//! The endpoint always answers 200 with `<return>true</return>`; the client
//! resends anything else forever. Failures are visible in logs and metrics.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use purchases_listener::config::{load_config, CONFIG_PATH_ENV};
use purchases_listener::lifecycle::signals::trigger_on_signal;
use purchases_listener::observability::{logging, metrics};
use purchases_listener::storage::open_store;
use purchases_listener::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "purchases-listener", version, about = "SOAP listener for loyalty purchases packages")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    logging::init_logging(&config.observability);

    tracing::info!("purchases-listener v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        soap_path = %config.listener.soap_path,
        storage = ?config.storage.backend,
        fallback_namespace = %config.soap.fallback_namespace,
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

    let store = open_store(&config.storage).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(trigger_on_signal(shutdown.clone()));

    let server = HttpServer::new(config, store);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
