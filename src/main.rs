//! geobatch server binary.
//!
//! Starts the HTTP geometry service. Configuration comes from the
//! environment (`PORT`, `API_KEY`, `BUFFER_KM`) with command line
//! overrides.
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (port 10000, no auth)
//! geobatch
//!
//! # Specify port and host
//! geobatch --port 8080 --host 127.0.0.1
//! ```

use std::net::SocketAddr;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geobatch::config::Config;
use geobatch::web;

/// geobatch - HTTP service for GeoJSON buffering, overlay and reprojection
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides the PORT environment variable)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Environment first, flags override
    let mut config = Config::from_env()?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    config.validate()?;

    info!(
        "Buffer distance: {} km, auth {}",
        config.buffer_km,
        if config.api_key.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );

    // Build socket address
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    // Start the server
    web::run_server(config, addr).await
}
