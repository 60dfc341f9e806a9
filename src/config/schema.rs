//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the middleware.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the middleware and the demo server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MiddlewareConfig {
    /// Development mode: stack traces in error bodies, console echo,
    /// response bodies captured for every request.
    pub debug: bool,

    /// Server settings (bind address).
    pub server: ServerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits and body capture.
    pub security: SecurityConfig,

    /// Structured log sinks.
    pub logging: LoggingConfig,

    /// Sensitive data redaction.
    pub redaction: RedactionConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum accepted request body size in bytes.
    pub max_body_size: usize,

    /// Largest request/response body (in bytes) buffered for logging.
    /// Larger or streaming bodies are logged as omitted.
    pub body_capture_limit: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
            body_capture_limit: 64 * 1024,
        }
    }
}

/// Structured log sink configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory holding app.log, error.log, requests.log and database.log.
    pub directory: String,

    /// Minimum level written to the sinks (debug, info, warning, error, critical).
    pub level: String,

    /// Size in bytes at which a sink file is rotated.
    pub max_file_size_bytes: u64,

    /// Number of rotated files kept per sink.
    pub backup_count: u32,

    /// Echo records to the console even when `debug` is off.
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            level: "info".to_string(),
            max_file_size_bytes: 10 * 1024 * 1024, // 10MB
            backup_count: 5,
            console: false,
        }
    }
}

/// How sensitive key names are compared against payload keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Case-insensitive exact key match.
    #[default]
    Exact,
    /// Case-insensitive match when the key contains a sensitive name.
    Substring,
}

/// Redaction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedactionConfig {
    /// Key names whose values are masked in bodies, query strings and headers.
    pub sensitive_keys: Vec<String>,

    /// Header names that are always masked (exact match).
    pub sensitive_headers: Vec<String>,

    /// Replacement value for masked fields.
    pub mask: String,

    /// Key comparison strategy for `sensitive_keys`.
    pub match_mode: MatchMode,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        let keys = [
            "password",
            "token",
            "secret",
            "key",
            "authorization",
            "auth",
            "credential",
            "api_key",
            "access_token",
            "refresh_token",
            "jwt",
            "session",
            "cookie",
        ];
        let headers = [
            "authorization",
            "cookie",
            "set-cookie",
            "x-api-key",
            "x-auth-token",
            "x-access-token",
            "x-refresh-token",
        ];
        Self {
            sensitive_keys: keys.iter().map(|k| k.to_string()).collect(),
            sensitive_headers: headers.iter().map(|h| h.to_string()).collect(),
            mask: "***REDACTED***".to_string(),
            match_mode: MatchMode::Exact,
        }
    }
}
