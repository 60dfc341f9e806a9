//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. All errors are
//! collected so a bad file is reported in one pass.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::MiddlewareConfig;
use crate::observability::record::Level;

/// A single semantic problem in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration, returning every error found.
pub fn validate_config(config: &MiddlewareConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than zero",
        ));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new(
            "security.max_body_size",
            "must be greater than zero",
        ));
    }

    if config.logging.directory.trim().is_empty() {
        errors.push(ValidationError::new("logging.directory", "must not be empty"));
    }

    if config.logging.level.parse::<Level>().is_err() {
        errors.push(ValidationError::new(
            "logging.level",
            format!("unknown level '{}'", config.logging.level),
        ));
    }

    if config.redaction.mask.is_empty() {
        errors.push(ValidationError::new("redaction.mask", "must not be empty"));
    }

    if config
        .redaction
        .sensitive_keys
        .iter()
        .chain(config.redaction.sensitive_headers.iter())
        .any(|k| k.trim().is_empty())
    {
        errors.push(ValidationError::new(
            "redaction",
            "sensitive key names must not be blank",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
