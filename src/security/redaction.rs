//! Sensitive data redaction.
//!
//! # Responsibilities
//! - Mask values of sensitive keys in arbitrarily nested JSON
//! - Mask sensitive request/response headers
//!
//! # Design Decisions
//! - Key comparison is case-insensitive; exact match unless configured
//!   for substring matching
//! - Redaction returns a new value; the input is never touched
//! - Non-object leaves pass through unchanged

use std::collections::HashSet;

use axum::http::HeaderMap;
use serde_json::{Map, Value};

use crate::config::{MatchMode, RedactionConfig};

/// Mask used when none is configured.
pub const DEFAULT_MASK: &str = "***REDACTED***";

/// Masks sensitive fields before data reaches a log sink.
#[derive(Debug, Clone)]
pub struct Redactor {
    keys: HashSet<String>,
    header_keys: HashSet<String>,
    mode: MatchMode,
    mask: String,
}

impl Redactor {
    /// Create a redactor for the given key names.
    pub fn new<I, S>(keys: I, mode: MatchMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keys: normalize(keys),
            header_keys: HashSet::new(),
            mode,
            mask: DEFAULT_MASK.to_string(),
        }
    }

    pub fn from_config(config: &RedactionConfig) -> Self {
        Self::new(&config.sensitive_keys, config.match_mode)
            .with_header_keys(&config.sensitive_headers)
            .with_mask(config.mask.clone())
    }

    /// Header names masked on exact (case-insensitive) match, in addition
    /// to the key set.
    pub fn with_header_keys<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.header_keys = normalize(headers);
        self
    }

    pub fn with_mask(mut self, mask: impl Into<String>) -> Self {
        self.mask = mask.into();
        self
    }

    pub fn mask(&self) -> &str {
        &self.mask
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Returns true if values stored under `key` must be masked.
    pub fn is_sensitive(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        match self.mode {
            MatchMode::Exact => self.keys.contains(&key),
            MatchMode::Substring => self.keys.iter().any(|k| key.contains(k.as_str())),
        }
    }

    fn is_sensitive_header(&self, name: &str) -> bool {
        self.header_keys.contains(&name.to_lowercase()) || self.is_sensitive(name)
    }

    /// Return a copy of `value` with every sensitive entry masked.
    pub fn redact(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| {
                        let value = if self.is_sensitive(key) {
                            Value::String(self.mask.clone())
                        } else {
                            self.redact(value)
                        };
                        (key.clone(), value)
                    })
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.redact(v)).collect()),
            other => other.clone(),
        }
    }

    /// Render a header map as a JSON object with sensitive headers masked.
    ///
    /// Repeated headers are joined with ", "; non-UTF-8 values are shown
    /// as `<binary>`.
    pub fn redact_headers(&self, headers: &HeaderMap) -> Value {
        let mut out = Map::new();
        for name in headers.keys() {
            let rendered = if self.is_sensitive_header(name.as_str()) {
                self.mask.clone()
            } else {
                headers
                    .get_all(name)
                    .iter()
                    .map(|v| v.to_str().unwrap_or("<binary>"))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            out.insert(name.as_str().to_string(), Value::String(rendered));
        }
        Value::Object(out)
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::from_config(&RedactionConfig::default())
    }
}

fn normalize<I, S>(keys: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    keys.into_iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}
