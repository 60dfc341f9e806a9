//! Startup orchestration.
//!
//! Subsystems initialize in order, not concurrently: tracing first so
//! sink errors are visible, then the panic hook, then the sinks.

use std::sync::Arc;

use crate::config::MiddlewareConfig;
use crate::faults::panic::install_panic_hook;
use crate::http::middleware::MiddlewareState;
use crate::observability::logging::{default_directive, init_tracing};
use crate::observability::{EmitterOptions, Level, LogCategory, LogEmitter, LogRecord, SinkError};

/// Bring up logging and build the middleware state for `config`.
pub fn bootstrap(config: &MiddlewareConfig) -> Result<MiddlewareState, SinkError> {
    let options = EmitterOptions::from_config(config);

    init_tracing(&default_directive(options.min_level));
    install_panic_hook();

    let emitter = Arc::new(LogEmitter::open(&options)?);
    emitter.emit(
        LogCategory::General,
        &LogRecord::new(Level::Info, "Logging system initialized", crate::source_location!())
            .event("logging_initialized")
            .field("log_directory", options.directory.display().to_string())
            .field("log_level", options.min_level.as_str())
            .field("max_file_size_bytes", options.max_bytes)
            .field("backup_count", options.backup_count)
            .field("console", options.console),
    );

    let state = MiddlewareState::new(Arc::clone(&emitter), config);
    emitter.emit(
        LogCategory::General,
        &LogRecord::new(Level::Info, "Middleware initialized", crate::source_location!())
            .event("middleware_initialized")
            .field("debug", config.debug)
            .field("body_capture_limit", config.security.body_capture_limit)
            .field("redaction_mode", format!("{:?}", config.redaction.match_mode).to_lowercase()),
    );

    tracing::info!(
        log_directory = %options.directory.display(),
        level = %options.min_level,
        "Logging middleware ready"
    );
    Ok(state)
}
