//! api-middleware demo server
//!
//! Serves the demo user API behind the logging middleware.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request_logger ──▶ timeout / body limit ──▶ routes
//!                          │                                        │
//!                          │        Fault / panic / response        │
//!     ◀────────────────────┴────────────────────────────────────────┘
//!                          │
//!                          ▼
//!          app.log  error.log  requests.log  database.log
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use api_middleware::app::{self, AppState};
use api_middleware::config::{load_config, watcher::ConfigWatcher, MiddlewareConfig};
use api_middleware::lifecycle::{bootstrap, signals::wait_for_signal, Shutdown};
use api_middleware::HttpServer;

#[derive(Debug, Parser)]
#[command(name = "api-middleware", version, about = "Demo API behind the logging middleware")]
struct Cli {
    /// Path to the TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => MiddlewareConfig::default(),
    };

    let state = bootstrap(&config)?;

    tracing::info!(
        bind_address = %config.server.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        debug = config.debug,
        "Configuration loaded"
    );

    // The watcher must stay alive for the lifetime of the server.
    let (_watcher, updates) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), Some(updates))
        }
        None => (None, None),
    };

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signalled = shutdown.signalled();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    let routes = app::routes(AppState::new(state.clone()));
    let server = HttpServer::new(config, state, routes);
    server.run(listener, updates, signalled).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
