//! Response handling.
//!
//! # Responsibilities
//! - Attach `X-Request-ID` and `X-Processing-Time` to every response
//! - Build the redacted `response_data` payload
//!
//! # Design Decisions
//! - Processing time is decimal seconds with millisecond precision
//! - Response bodies are logged only for error statuses or in debug mode,
//!   and only when small enough to buffer

use std::time::Duration;

use axum::{
    body::{Body, HttpBody},
    http::{header, HeaderMap, HeaderValue},
    response::Response,
};
use serde_json::{json, Map, Value};

use crate::http::request::{RequestId, X_PROCESSING_TIME, X_REQUEST_ID};
use crate::observability::record::timestamp_now;
use crate::security::Redactor;

/// Longest text body kept in a log record.
pub const MAX_LOGGED_TEXT_CHARS: usize = 1000;

/// Render an elapsed duration as decimal seconds, e.g. `0.012`.
pub fn format_processing_time(elapsed: Duration) -> String {
    format!("{:.3}", elapsed.as_secs_f64())
}

/// Set the correlation headers on an outgoing response.
pub fn attach_correlation_headers(headers: &mut HeaderMap, request_id: &RequestId, elapsed: Duration) {
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        headers.insert(X_REQUEST_ID, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format_processing_time(elapsed)) {
        headers.insert(X_PROCESSING_TIME, value);
    }
}

/// Buffer a response body for logging if it is small enough.
///
/// Returns the response (with an equivalent body) and the parsed body, if
/// it was captured.
pub async fn snapshot_response(response: Response, limit: usize) -> (Response, Option<Value>) {
    let (parts, body) = response.into_parts();

    match body.size_hint().upper() {
        Some(size) if size <= limit as u64 => {}
        _ => return (Response::from_parts(parts, body), None),
    }

    match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => {
            let is_json = parts
                .headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.starts_with("application/json"));

            let value = if is_json {
                serde_json::from_slice(&bytes)
                    .unwrap_or_else(|_| json!("Unable to parse response body"))
            } else {
                let text = String::from_utf8_lossy(&bytes);
                Value::String(text.chars().take(MAX_LOGGED_TEXT_CHARS).collect())
            };
            (Response::from_parts(parts, Body::from(bytes)), Some(value))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to buffer response body for logging");
            (Response::from_parts(parts, Body::empty()), Some(json!("Unable to parse response body")))
        }
    }
}

/// Build the redacted `response_data` payload.
pub fn capture_response(response: &Response, body: Option<Value>, redactor: &Redactor) -> Value {
    let status = response.status();
    let headers = response.headers();

    let mut data = Map::new();
    data.insert("status_code".into(), json!(status.as_u16()));
    data.insert(
        "status".into(),
        json!(format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        )),
    );
    data.insert(
        "content_type".into(),
        json!(headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())),
    );
    data.insert(
        "content_length".into(),
        json!(headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .or_else(|| response.body().size_hint().exact())),
    );
    data.insert("timestamp".into(), json!(timestamp_now()));
    data.insert("headers".into(), redactor.redact_headers(headers));
    if let Some(body) = body {
        data.insert("body".into(), redactor.redact(&body));
    }
    Value::Object(data)
}
