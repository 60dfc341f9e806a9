//! Request handling.
//!
//! # Responsibilities
//! - Mint the per-request correlation identifier
//! - Carry request-scoped state (identifier, start time) in extensions
//! - Snapshot the request body for logging without consuming it
//! - Build the redacted `request_data` payload
//!
//! # Design Decisions
//! - Request ID added as early as possible so every record carries it
//! - Bodies are buffered only when their size is known and small; streaming
//!   or oversized bodies are forwarded untouched and logged as omitted
//! - Original request is forwarded byte-for-byte

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{ConnectInfo, FromRequestParts, MatchedPath},
    http::{header, request::Parts, HeaderMap, Method},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::faults::Fault;
use crate::observability::record::timestamp_now;
use crate::security::Redactor;

/// Response header carrying the correlation identifier.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Response header carrying the processing time in decimal seconds.
pub const X_PROCESSING_TIME: &str = "x-processing-time";

/// Correlation identifier minted once per inbound request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a new random identifier (UUID v4).
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request-scoped state shared by the interceptors and handlers.
///
/// Inserted into the request extensions before dispatch; handlers can
/// extract it directly.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    started_at: Instant,
    method: Method,
    url: String,
    path: String,
    endpoint: Option<String>,
    remote_addr: Option<SocketAddr>,
    user_agent: Option<String>,
    content_type: Option<String>,
    content_length: Option<u64>,
}

impl RequestContext {
    /// Mint a fresh identifier and start the clock for this request.
    pub fn from_parts(parts: &Parts) -> Self {
        let host = header_str(&parts.headers, header::HOST).unwrap_or("localhost");
        let url = match parts.uri.scheme_str() {
            Some(_) => parts.uri.to_string(),
            None => format!("http://{}{}", host, parts.uri),
        };

        Self {
            request_id: RequestId::new(),
            started_at: Instant::now(),
            method: parts.method.clone(),
            url,
            path: parts.uri.path().to_string(),
            endpoint: parts
                .extensions
                .get::<MatchedPath>()
                .map(|p| p.as_str().to_string()),
            remote_addr: parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
            user_agent: header_str(&parts.headers, header::USER_AGENT).map(String::from),
            content_type: header_str(&parts.headers, header::CONTENT_TYPE).map(String::from),
            content_length: header_str(&parts.headers, header::CONTENT_LENGTH)
                .and_then(|v| v.parse().ok()),
        }
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Time since the request entered the middleware.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Compact description of the request for ad-hoc log records.
    pub fn summary(&self) -> Value {
        json!({
            "method": self.method.as_str(),
            "url": self.url,
            "path": self.path,
            "endpoint": self.endpoint,
            "remote_addr": self.remote_addr.map(|a| a.to_string()),
            "user_agent": self.user_agent,
            "content_type": self.content_type,
            "content_length": self.content_length,
            "request_id": self.request_id.to_string(),
        })
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Fault;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| Fault::internal("request logging middleware is not installed"))
    }
}

/// Extension trait for reading the request context off a request.
pub trait RequestContextExt {
    fn request_context(&self) -> Option<&RequestContext>;
}

impl<B> RequestContextExt for axum::http::Request<B> {
    fn request_context(&self) -> Option<&RequestContext> {
        self.extensions().get::<RequestContext>()
    }
}

impl RequestContextExt for Parts {
    fn request_context(&self) -> Option<&RequestContext> {
        self.extensions.get::<RequestContext>()
    }
}

/// What the logger saw of a request body.
#[derive(Debug, Clone, PartialEq)]
pub enum BodySnapshot {
    /// No body, or a body in a format that is not logged.
    Empty,
    Json(Value),
    /// Body claimed to be JSON but did not parse.
    InvalidJson,
    Form(Value),
    /// Body was not buffered (unknown size or larger than the capture limit).
    Omitted,
}

/// Buffer a JSON or form body of known size up to `limit` bytes.
///
/// Always hands back a body to forward; a read failure yields an empty
/// body and [`BodySnapshot::Omitted`].
pub async fn snapshot_body(headers: &HeaderMap, body: Body, limit: usize) -> (Body, BodySnapshot) {
    let kind = match BodyKind::from_headers(headers) {
        Some(kind) => kind,
        None => return (body, BodySnapshot::Empty),
    };

    match body.size_hint().upper() {
        Some(0) => return (body, BodySnapshot::Empty),
        Some(size) if size <= limit as u64 => {}
        _ => return (body, BodySnapshot::Omitted),
    }

    match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => {
            let snapshot = kind.parse(&bytes);
            (Body::from(bytes), snapshot)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to buffer request body for logging");
            (Body::empty(), BodySnapshot::Omitted)
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum BodyKind {
    Json,
    Form,
}

impl BodyKind {
    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let content_type = header_str(headers, header::CONTENT_TYPE)?;
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if mime == "application/json" || mime.ends_with("+json") {
            Some(BodyKind::Json)
        } else if mime == "application/x-www-form-urlencoded" {
            Some(BodyKind::Form)
        } else {
            None
        }
    }

    fn parse(self, bytes: &Bytes) -> BodySnapshot {
        if bytes.is_empty() {
            return BodySnapshot::Empty;
        }
        match self {
            BodyKind::Json => serde_json::from_slice(bytes)
                .map(BodySnapshot::Json)
                .unwrap_or(BodySnapshot::InvalidJson),
            BodyKind::Form => BodySnapshot::Form(parse_pairs(bytes)),
        }
    }
}

/// Decode `application/x-www-form-urlencoded` pairs into a JSON object.
/// Repeated keys keep the last value.
pub fn parse_pairs(input: &[u8]) -> Value {
    let map: Map<String, Value> = url::form_urlencoded::parse(input)
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect();
    Value::Object(map)
}

/// Build the redacted `request_data` payload for a request.
pub fn capture_request(
    parts: &Parts,
    context: &RequestContext,
    body: &BodySnapshot,
    redactor: &Redactor,
) -> Value {
    let mut data = Map::new();
    data.insert("method".into(), json!(context.method.as_str()));
    data.insert("url".into(), json!(redacted_url(&context.url, redactor)));
    data.insert("path".into(), json!(context.path));
    data.insert("endpoint".into(), json!(context.endpoint));
    data.insert(
        "remote_addr".into(),
        json!(context.remote_addr.map(|a| a.ip().to_string())),
    );
    data.insert("user_agent".into(), json!(context.user_agent));
    data.insert("timestamp".into(), json!(timestamp_now()));

    if let Some(query) = parts.uri.query().filter(|q| !q.is_empty()) {
        data.insert(
            "query_params".into(),
            redactor.redact(&parse_pairs(query.as_bytes())),
        );
    }

    match body {
        BodySnapshot::Json(value) => {
            data.insert("body".into(), redactor.redact(value));
        }
        BodySnapshot::InvalidJson => {
            data.insert("body".into(), json!("Invalid JSON"));
        }
        BodySnapshot::Form(value) => {
            data.insert("form_data".into(), redactor.redact(value));
        }
        BodySnapshot::Omitted => {
            data.insert("body".into(), json!("<omitted>"));
        }
        BodySnapshot::Empty => {}
    }

    data.insert("headers".into(), redactor.redact_headers(&parts.headers));
    Value::Object(data)
}

/// `url` with the values of sensitive query parameters masked.
fn redacted_url(url: &str, redactor: &Redactor) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if redactor.is_sensitive(&key) {
            serializer.append_pair(&key, redactor.mask());
        } else {
            serializer.append_pair(&key, &value);
        }
    }
    format!("{base}?{}", serializer.finish())
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_for(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);
        assert!(!a.to_string().is_empty());
        assert_eq!(a.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn test_request_id_serializes_as_plain_string() {
        let id = RequestId::new();
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json, Value::String(id.to_string()));
    }

    #[test]
    fn test_context_from_parts() {
        let parts = parts_for(
            Request::builder()
                .method("POST")
                .uri("/api/users?page=2")
                .header("host", "api.example.com")
                .header("user-agent", "test-agent")
                .header("content-type", "application/json")
                .header("content-length", "17"),
        );

        let ctx = RequestContext::from_parts(&parts);
        assert_eq!(*ctx.method(), Method::POST);
        assert_eq!(ctx.path(), "/api/users");
        assert_eq!(ctx.url(), "http://api.example.com/api/users?page=2");

        let summary = ctx.summary();
        assert_eq!(summary["user_agent"], "test-agent");
        assert_eq!(summary["content_length"], 17);
        assert_eq!(summary["request_id"], ctx.request_id().to_string());
    }

    #[tokio::test]
    async fn test_snapshot_json_body_is_forwarded_intact() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        let raw = r#"{"email":"a@b.c","password":"x"}"#;

        let (body, snapshot) = snapshot_body(&headers, Body::from(raw), 1024).await;
        assert_eq!(
            snapshot,
            BodySnapshot::Json(json!({"email": "a@b.c", "password": "x"}))
        );

        let forwarded = axum::body::to_bytes(body, 1024).await.unwrap();
        assert_eq!(forwarded, raw.as_bytes());
    }

    #[tokio::test]
    async fn test_snapshot_invalid_json_and_oversized() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            "application/json; charset=utf-8".parse().unwrap(),
        );

        let (_, snapshot) = snapshot_body(&headers, Body::from("{not json"), 1024).await;
        assert_eq!(snapshot, BodySnapshot::InvalidJson);

        let (body, snapshot) = snapshot_body(&headers, Body::from("x".repeat(64)), 16).await;
        assert_eq!(snapshot, BodySnapshot::Omitted);
        let forwarded = axum::body::to_bytes(body, 1024).await.unwrap();
        assert_eq!(forwarded.len(), 64);
    }

    #[tokio::test]
    async fn test_snapshot_ignores_other_content_types() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        let (_, snapshot) = snapshot_body(&headers, Body::from("hello"), 1024).await;
        assert_eq!(snapshot, BodySnapshot::Empty);
    }

    #[test]
    fn test_capture_request_redacts_everything() {
        let parts = parts_for(
            Request::builder()
                .method("POST")
                .uri("/login?token=abc&page=1")
                .header("authorization", "Bearer abc")
                .header("x-trace", "keep"),
        );
        let ctx = RequestContext::from_parts(&parts);
        let redactor = Redactor::default();
        let body = BodySnapshot::Form(parse_pairs(b"username=bob&password=secret123"));

        let data = capture_request(&parts, &ctx, &body, &redactor);
        assert_eq!(data["method"], "POST");
        assert_eq!(data["query_params"]["token"], redactor.mask());
        assert_eq!(data["query_params"]["page"], "1");
        assert_eq!(data["form_data"]["password"], redactor.mask());
        assert_eq!(data["form_data"]["username"], "bob");
        assert_eq!(data["headers"]["authorization"], redactor.mask());
        assert_eq!(data["headers"]["x-trace"], "keep");
        assert_eq!(
            data["url"],
            "http://localhost/login?token=***REDACTED***&page=1"
        );
        assert!(!data.to_string().contains("secret123"));
        assert!(!data.to_string().contains("abc"));
    }
}
