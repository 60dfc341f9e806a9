//! The JSON error body returned for every fault.
//!
//! ```json
//! {"error": {"type": "Validation Error", "message": "Validation failed", "status_code": 400,
//!            "timestamp": "…", "path": "/api/users", "method": "POST", "request_id": "…",
//!            "validation_errors": {"email": ["Invalid email format"]}}}
//! ```

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::faults::fault::{Fault, FieldErrors};
use crate::faults::kind::FaultKind;
use crate::http::request::RequestContext;
use crate::observability::record::timestamp_now;

/// Served when the envelope itself cannot be serialized.
const FALLBACK_BODY: &str = r#"{"error":{"type":"Internal Server Error","message":"An unexpected error occurred","status_code":500}}"#;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
    pub status_code: u16,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

impl ErrorEnvelope {
    /// Full envelope for a fault raised while serving `context`.
    pub fn for_request(fault: &Fault, context: &RequestContext, debug: bool) -> Self {
        let mut envelope = Self::standalone(fault);
        envelope.error.path = Some(context.path().to_string());
        envelope.error.method = Some(context.method().to_string());
        envelope.error.request_id = Some(context.request_id().to_string());
        if debug {
            envelope.error.traceback = fault.backtrace().map(String::from);
        }
        envelope
    }

    /// Envelope without request details.
    pub fn standalone(fault: &Fault) -> Self {
        let kind = fault.kind();
        Self {
            error: ErrorBody {
                kind: kind.type_name(),
                message: fault.client_message().to_string(),
                status_code: kind.status().as_u16(),
                timestamp: timestamp_now(),
                path: None,
                method: None,
                request_id: None,
                validation_errors: match kind {
                    FaultKind::Validation => fault.validation_errors().cloned(),
                    _ => None,
                },
                traceback: None,
            },
        }
    }

    pub fn body(&self) -> &ErrorBody {
        &self.error
    }

    /// Serialize into a response with the given status, falling back to a
    /// fixed 500 body if serialization fails.
    pub fn into_response(self, status: StatusCode) -> Response {
        match serde_json::to_vec(&self) {
            Ok(bytes) => json_response(status, bytes),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize error envelope");
                fallback_response()
            }
        }
    }
}

/// Minimal internal-error response.
pub fn fallback_response() -> Response {
    json_response(StatusCode::INTERNAL_SERVER_ERROR, FALLBACK_BODY.as_bytes().to_vec())
}

fn json_response(status: StatusCode, bytes: Vec<u8>) -> Response {
    let mut response = (status, bytes).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faults::fault::GENERIC_SERVER_MESSAGE;
    use axum::http::Request;
    use serde_json::Value;

    fn context() -> RequestContext {
        let (parts, _) = Request::builder()
            .method("POST")
            .uri("/api/users?x=1")
            .body(())
            .unwrap()
            .into_parts();
        RequestContext::from_parts(&parts)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_envelope() {
        let mut errors = FieldErrors::new();
        errors.insert("email".into(), vec!["Invalid email format".into()]);
        let fault = Fault::validation(errors);
        let ctx = context();

        let response = ErrorEnvelope::for_request(&fault, &ctx, false).into_response(StatusCode::BAD_REQUEST);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let body = body_json(response).await;
        let error = &body["error"];
        assert_eq!(error["type"], "Validation Error");
        assert_eq!(error["status_code"], 400);
        assert_eq!(error["path"], "/api/users");
        assert_eq!(error["method"], "POST");
        assert_eq!(error["request_id"], ctx.request_id().to_string());
        assert_eq!(error["validation_errors"]["email"][0], "Invalid email format");
        assert!(error.get("traceback").is_none());
    }

    #[test]
    fn test_traceback_only_in_debug() {
        let fault = Fault::internal("db down");
        let ctx = context();

        let quiet = ErrorEnvelope::for_request(&fault, &ctx, false);
        assert!(quiet.body().traceback.is_none());
        assert_eq!(quiet.body().message, GENERIC_SERVER_MESSAGE);

        let verbose = ErrorEnvelope::for_request(&fault, &ctx, true);
        assert!(verbose.body().traceback.is_some());
        assert_eq!(verbose.body().message, GENERIC_SERVER_MESSAGE);
    }

    #[tokio::test]
    async fn test_fallback_body_is_valid_json() {
        let response = fallback_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["status_code"], 500);
    }
}
