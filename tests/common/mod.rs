//! Shared harness for the integration tests.
#![allow(dead_code)]

use std::path::Path;

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use api_middleware::app::{self, AppState};
use api_middleware::{bootstrap, HttpServer, MiddlewareConfig, MiddlewareState};

/// The demo app wired through the middleware, logging into a temp dir.
pub struct TestApp {
    pub router: Router,
    pub state: MiddlewareState,
    pub config: MiddlewareConfig,
    // Keeps the log directory alive.
    pub dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(configure: impl FnOnce(&mut MiddlewareConfig)) -> Self {
        Self::with_routes(configure, |state| app::routes(AppState::new(state)))
    }

    /// Custom routes behind the same middleware stack.
    pub fn with_routes(
        configure: impl FnOnce(&mut MiddlewareConfig),
        routes: impl FnOnce(MiddlewareState) -> Router,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = MiddlewareConfig::default();
        config.logging.directory = dir.path().display().to_string();
        configure(&mut config);

        let state = bootstrap(&config).unwrap();
        let routes = routes(state.clone());
        let router = HttpServer::new(config.clone(), state.clone(), routes).router();

        Self {
            router,
            state,
            config,
            dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Parsed records of one log file (e.g. `"requests.log"`).
    pub fn records(&self, file: &str) -> Vec<Value> {
        read_records(&self.dir.path().join(file))
    }

    /// Raw text of one log file.
    pub fn raw(&self, file: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(file)).unwrap_or_default()
    }

    /// Records in `requests.log` for one request ID.
    pub fn request_records(&self, request_id: &str) -> Vec<Value> {
        self.records("requests.log")
            .into_iter()
            .filter(|r| r["request_id"] == request_id)
            .collect()
    }
}

pub fn read_records(path: &Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

pub fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).unwrap().to_str().unwrap()
}

pub fn events(records: &[Value]) -> Vec<&str> {
    records.iter().filter_map(|r| r["event"].as_str()).collect()
}
