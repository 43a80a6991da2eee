//! Round-robin HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 LOAD BALANCER                │
//!     Client Request     │  ┌─────────┐    ┌────────────┐               │
//!     ───────────────────┼─▶│  http   │───▶│ dispatcher │               │
//!                        │  │ server  │    │ + cursor   │               │
//!                        │  └─────────┘    └─────┬──────┘               │
//!                        │                       │ round robin          │
//!                        │                       ▼                      │
//!     Client Response    │  ┌─────────┐    ┌────────────┐               │
//!     ◀──────────────────┼──│response │◀───│  backend   │◀──────────────┼──── Backend
//!                        │  │ relay   │    │  forward   │               │     Server
//!                        │  └─────────┘    └────────────┘               │
//!                        └──────────────────────────────────────────────┘
//! ```
//!
//! Configuration comes from an optional TOML file, overridden by CLI flags.
//! Any configuration error is fatal and exits with a non-zero status.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use rr_proxy::config::{resolve_config, ConfigError, LbConfig, Overrides};
use rr_proxy::lifecycle::{signals, Shutdown};
use rr_proxy::observability::{logging, metrics};
use rr_proxy::{Dispatcher, HttpServer};

#[derive(Debug, Parser)]
#[command(name = "rr-proxy", version, about = "Round-robin HTTP load balancer")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on.
    #[arg(short, long)]
    port: Option<u16>,

    /// Backend URL, in rotation order. Repeat for several; replaces configured backends.
    #[arg(short, long = "backend", value_name = "URL")]
    backends: Vec<String>,

    /// Log level used when RUST_LOG is unset.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Merge the config file (or defaults) with flags, then validate.
    fn load(&self) -> Result<LbConfig, ConfigError> {
        let overrides = Overrides {
            port: self.port,
            backends: self.backends.clone(),
            log_level: self.log_level.clone(),
        };
        resolve_config(self.config.as_deref(), &overrides)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match cli.load() {
        Ok(config) => config,
        Err(e) => {
            logging::init_logging(cli.log_level.as_deref().unwrap_or("info"));
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    logging::init_logging(&config.observability.log_level);

    tracing::info!("rr-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        port = config.listener.port,
        backends = ?config.backends,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let dispatcher = match Dispatcher::from_config(&config) {
        Ok(dispatcher) => Arc::new(dispatcher),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build backends");
            return Err(e.into());
        }
    };

    if let Err(e) = metrics::init_from_config(&config.observability) {
        tracing::error!(error = %e, "Failed to start metrics");
        return Err(e.into());
    }

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(dispatcher, &config.timeouts);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
