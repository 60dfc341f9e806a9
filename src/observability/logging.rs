//! Process-wide `tracing` subscriber.
//!
//! # Responsibilities
//! - Install the console subscriber used for operational messages
//! - Honour `RUST_LOG`, falling back to the configured level
//!
//! # Design Decisions
//! - Installation is idempotent; a second call (e.g. from tests) is a no-op
//! - Structured request records go through [`LogEmitter`](super::LogEmitter),
//!   not through this subscriber

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::observability::record::Level;

/// Map a record level onto an `EnvFilter` directive.
pub fn default_directive(level: Level) -> String {
    let level = match level {
        Level::Debug => "debug",
        Level::Info => "info",
        Level::Warning => "warn",
        Level::Error | Level::Critical => "error",
    };
    format!("api_middleware={level},tower_http={level}")
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
