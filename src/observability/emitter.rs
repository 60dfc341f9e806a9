//! Structured log emitter.
//!
//! Routes [`LogRecord`]s to the file sinks:
//!
//! ```text
//! General  → app.log
//! Request  → requests.log
//! Database → database.log
//! Error    → error.log
//!
//! level >= ERROR → error.log as well
//! console echo   → tracing (debug mode)
//! ```

use std::fmt::Display;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use crate::config::MiddlewareConfig;
use crate::http::request::RequestId;
use crate::observability::record::{Level, LogRecord, SourceLocation};
use crate::observability::sink::{RotatingFileSink, SinkError};

/// Which sink a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    General,
    Error,
    Request,
    Database,
}

impl LogCategory {
    pub const ALL: [LogCategory; 4] = [
        LogCategory::General,
        LogCategory::Error,
        LogCategory::Request,
        LogCategory::Database,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            LogCategory::General => "app.log",
            LogCategory::Error => "error.log",
            LogCategory::Request => "requests.log",
            LogCategory::Database => "database.log",
        }
    }
}

/// Settings for opening the sinks.
#[derive(Debug, Clone)]
pub struct EmitterOptions {
    pub directory: PathBuf,
    pub min_level: Level,
    pub max_bytes: u64,
    pub backup_count: u32,
    pub console: bool,
}

impl EmitterOptions {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            min_level: Level::Info,
            max_bytes: 10 * 1024 * 1024,
            backup_count: 5,
            console: false,
        }
    }

    pub fn from_config(config: &MiddlewareConfig) -> Self {
        Self {
            directory: PathBuf::from(&config.logging.directory),
            // Validated at load time; fall back to INFO for hand-built configs.
            min_level: config.logging.level.parse().unwrap_or(Level::Info),
            max_bytes: config.logging.max_file_size_bytes,
            backup_count: config.logging.backup_count,
            console: config.debug || config.logging.console,
        }
    }
}

/// Owns the four rotating sinks. Built once at startup and shared behind
/// an `Arc`.
#[derive(Debug)]
pub struct LogEmitter {
    directory: PathBuf,
    general: RotatingFileSink,
    error: RotatingFileSink,
    request: RotatingFileSink,
    database: RotatingFileSink,
    min_level: Level,
    console: bool,
}

impl LogEmitter {
    /// Create the log directory and open every sink.
    pub fn open(options: &EmitterOptions) -> Result<Self, SinkError> {
        let open = |category: LogCategory| {
            RotatingFileSink::open(
                options.directory.join(category.file_name()),
                options.max_bytes,
                options.backup_count,
            )
        };

        Ok(Self {
            directory: options.directory.clone(),
            general: open(LogCategory::General)?,
            error: open(LogCategory::Error)?,
            request: open(LogCategory::Request)?,
            database: open(LogCategory::Database)?,
            min_level: options.min_level,
            console: options.console,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn min_level(&self) -> Level {
        self.min_level
    }

    pub fn sink(&self, category: LogCategory) -> &RotatingFileSink {
        match category {
            LogCategory::General => &self.general,
            LogCategory::Error => &self.error,
            LogCategory::Request => &self.request,
            LogCategory::Database => &self.database,
        }
    }

    /// Serialize and write a record. Failures are reported through
    /// `tracing` and never reach the caller.
    pub fn emit(&self, category: LogCategory, record: &LogRecord) {
        let level = record.level();
        if level < self.min_level {
            return;
        }

        let line = match record.to_json_line() {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, record = record.message(), "Failed to serialize log record");
                return;
            }
        };

        // error.log only holds ERROR and above.
        let category = if category == LogCategory::Error && level < Level::Error {
            LogCategory::General
        } else {
            category
        };

        self.write(category, &line);
        if level >= Level::Error && category != LogCategory::Error {
            self.write(LogCategory::Error, &line);
        }

        if self.console {
            echo(record);
        }
    }

    fn write(&self, category: LogCategory, line: &str) {
        let sink = self.sink(category);
        if let Err(e) = sink.write_line(line) {
            tracing::warn!(sink = %sink.path().display(), error = %e, "Failed to write log record");
        }
    }

    /// Flush every sink; called on shutdown.
    pub fn flush(&self) {
        for category in LogCategory::ALL {
            let sink = self.sink(category);
            if let Err(e) = sink.flush() {
                tracing::warn!(sink = %sink.path().display(), error = %e, "Failed to flush log sink");
            }
        }
    }

    /// Record a database query in `database.log`.
    pub fn database_query(
        &self,
        request_id: Option<&RequestId>,
        location: SourceLocation,
        query: &str,
        params: Value,
        duration: Duration,
    ) {
        let record = LogRecord::new(Level::Info, "Database query executed", location)
            .maybe_request_id(request_id)
            .event("database_query")
            .field("query", query)
            .field("params", params)
            .field("duration_ms", duration.as_secs_f64() * 1000.0);
        self.emit(LogCategory::Database, &record);
    }

    /// Record a named measurement in `app.log`.
    pub fn performance_metric(
        &self,
        request_id: Option<&RequestId>,
        location: SourceLocation,
        metric_name: &str,
        value: f64,
        unit: &str,
    ) {
        let record = LogRecord::new(
            Level::Info,
            format!("Performance metric: {metric_name} = {value}{unit}"),
            location,
        )
        .maybe_request_id(request_id)
        .event("performance_metric")
        .field("metric_name", metric_name)
        .field("value", value)
        .field("unit", unit);
        self.emit(LogCategory::General, &record);
    }

    /// Time a fallible operation, logging entry, exit and failure.
    ///
    /// Entry and exit are DEBUG records; a failure is an ERROR record
    /// carrying the error message and type.
    pub async fn instrument<F, T, E>(
        &self,
        request_id: Option<&RequestId>,
        location: SourceLocation,
        function: &str,
        operation: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        let start = Instant::now();
        self.emit(
            LogCategory::General,
            &LogRecord::new(Level::Debug, format!("Function called: {function}"), location)
                .maybe_request_id(request_id)
                .event("function_entry")
                .field("function", function),
        );

        let result = operation.await;
        let execution_time = start.elapsed().as_secs_f64();

        let record = match &result {
            Ok(_) => LogRecord::new(
                Level::Debug,
                format!("Function completed: {function} in {execution_time:.3}s"),
                location,
            )
            .event("function_exit")
            .field("status", "success"),
            Err(e) => LogRecord::new(
                Level::Error,
                format!("Function failed: {function} after {execution_time:.3}s"),
                location,
            )
            .event("function_error")
            .field("error", e.to_string())
            .field("error_type", std::any::type_name::<E>()),
        };
        self.emit(
            LogCategory::General,
            &record
                .maybe_request_id(request_id)
                .field("function", function)
                .field("execution_time", json!(execution_time)),
        );

        result
    }
}

fn echo(record: &LogRecord) {
    let request_id = record.correlation_id().map(|id| id.to_string());
    let request_id = request_id.as_deref();
    let event = record.event_name();
    let logger = record.logger_name();
    let message = record.message();

    match record.level() {
        Level::Debug => tracing::debug!(logger, request_id, event, "{message}"),
        Level::Info => tracing::info!(logger, request_id, event, "{message}"),
        Level::Warning => tracing::warn!(logger, request_id, event, "{message}"),
        Level::Error | Level::Critical => tracing::error!(logger, request_id, event, "{message}"),
    }
}
