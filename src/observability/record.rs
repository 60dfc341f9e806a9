//! Structured log records.
//!
//! A [`LogRecord`] is built once at a call site and serialized to a single
//! JSON line:
//!
//! ```text
//! {"timestamp":"2025-01-01T12:00:00.000Z","level":"INFO","logger":"api_middleware::http::middleware::request_logger",
//!  "message":"Request Started - ID: …","module":"…","function":"request_logger","line":42,
//!  "request_id":"…","event":"request_started","request_data":{…}}
//! ```
//!
//! Event-specific payload keys are flattened into the top-level object.

use std::fmt;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::http::request::RequestId;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    /// Severity for a response with the given status code.
    pub fn for_status(status: u16) -> Self {
        match status {
            500.. => Level::Error,
            400..=499 => Level::Warning,
            _ => Level::Info,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown log level '{0}'")]
pub struct ParseLevelError(String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            "critical" => Ok(Level::Critical),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Where a record was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub module: &'static str,
    pub function: &'static str,
    pub line: u32,
}

impl SourceLocation {
    pub const fn new(module: &'static str, function: &'static str, line: u32) -> Self {
        Self {
            module,
            function,
            line,
        }
    }
}

/// Capture the module, enclosing function and line of the call site.
#[macro_export]
macro_rules! source_location {
    () => {{
        fn __here() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let path = __type_name_of(__here);
        let path = path.strip_suffix("::__here").unwrap_or(path);
        let path = path.trim_end_matches("::{{closure}}");
        let function = path.rsplit("::").next().unwrap_or(path);
        $crate::observability::record::SourceLocation::new(module_path!(), function, line!())
    }};
}

/// Fixed top-level keys; payload fields may not shadow them.
const RESERVED_KEYS: [&str; 9] = [
    "timestamp",
    "level",
    "logger",
    "message",
    "module",
    "function",
    "line",
    "request_id",
    "event",
];

/// Current UTC time as an ISO-8601 string with millisecond precision.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// An immutable structured log event.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    timestamp: String,
    level: Level,
    logger: String,
    message: String,
    module: &'static str,
    function: &'static str,
    line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<String>,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl LogRecord {
    /// Start a record; the logger name defaults to the calling module.
    pub fn new(level: Level, message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            timestamp: timestamp_now(),
            level,
            logger: location.module.to_string(),
            message: message.into(),
            module: location.module,
            function: location.function,
            line: location.line,
            request_id: None,
            event: None,
            payload: Map::new(),
        }
    }

    pub fn logger(mut self, name: impl Into<String>) -> Self {
        self.logger = name.into();
        self
    }

    pub fn request_id(mut self, request_id: &RequestId) -> Self {
        self.request_id = Some(request_id.clone());
        self
    }

    pub fn maybe_request_id(self, request_id: Option<&RequestId>) -> Self {
        match request_id {
            Some(id) => self.request_id(id),
            None => self,
        }
    }

    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Attach a payload field. Keys that collide with the fixed fields are
    /// stored with a `data_` prefix.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let key = if RESERVED_KEYS.contains(&key.as_str()) {
            format!("data_{key}")
        } else {
            key
        };
        self.payload.insert(key, value.into());
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn logger_name(&self) -> &str {
        &self.logger
    }

    pub fn correlation_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn event_name(&self) -> Option<&str> {
        self.event.as_deref()
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Serialize to one line of JSON (no trailing newline).
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn helper_location() -> SourceLocation {
        crate::source_location!()
    }

    #[test]
    fn test_level_ordering_and_parsing() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Error < Level::Critical);
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!(" info ".parse::<Level>().unwrap(), Level::Info);
        assert!("loud".parse::<Level>().is_err());
    }

    #[test]
    fn test_level_for_status() {
        assert_eq!(Level::for_status(200), Level::Info);
        assert_eq!(Level::for_status(302), Level::Info);
        assert_eq!(Level::for_status(404), Level::Warning);
        assert_eq!(Level::for_status(503), Level::Error);
    }

    #[test]
    fn test_source_location_names_enclosing_function() {
        let location = helper_location();
        assert_eq!(location.function, "helper_location");
        assert_eq!(location.module, module_path!());
        assert!(location.line > 0);
    }

    #[test]
    fn test_record_serializes_to_single_line() {
        let id = RequestId::new();
        let record = LogRecord::new(Level::Info, "line one\nline two", helper_location())
            .request_id(&id)
            .event("request_started")
            .field("request_data", json!({"method": "GET", "path": "/x"}));

        let line = record.to_json_line().unwrap();
        assert!(!line.contains('\n'));

        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["level"], "INFO");
        assert_eq!(parsed["message"], "line one\nline two");
        assert_eq!(parsed["event"], "request_started");
        assert_eq!(parsed["request_id"], id.to_string());
        assert_eq!(parsed["request_data"]["path"], "/x");
        assert_eq!(parsed["function"], "helper_location");
        assert!(parsed["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let record = LogRecord::new(Level::Debug, "plain", helper_location());
        let parsed: Value = serde_json::from_str(&record.to_json_line().unwrap()).unwrap();
        assert!(parsed.get("request_id").is_none());
        assert!(parsed.get("event").is_none());
        assert_eq!(parsed["logger"], module_path!());
    }

    #[test]
    fn test_reserved_payload_keys_are_prefixed() {
        let record = LogRecord::new(Level::Info, "m", helper_location()).field("level", "shadow");
        let parsed: Value = serde_json::from_str(&record.to_json_line().unwrap()).unwrap();
        assert_eq!(parsed["level"], "INFO");
        assert_eq!(parsed["data_level"], "shadow");
    }
}
