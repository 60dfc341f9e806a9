//! Request/response logging middleware.
//!
//! # Data Flow
//! ```text
//! Request
//!     → request_logger: mint RequestId, capture + redact, emit request_started
//!     → [timeout, body limit, routes, fallbacks]
//!     → request_logger: panic? fault? → translate → request_failed
//!                       otherwise     → request_completed
//!     → X-Request-ID / X-Processing-Time on the way out
//! ```
//!
//! # Design Decisions
//! - Policy (redaction, debug, capture limit) is swapped atomically on
//!   config reload; a request keeps the policy it started with
//! - The emitter is built once and shared; it is not reloadable

pub mod request_logger;

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    http::{Method, Uri},
    middleware::from_fn_with_state,
    Router,
};

use crate::config::MiddlewareConfig;
use crate::faults::Fault;
use crate::observability::LogEmitter;
use crate::security::Redactor;

pub use request_logger::request_logger;

/// Per-request behaviour that can change on config reload.
#[derive(Debug, Clone)]
pub struct RequestPolicy {
    pub redactor: Redactor,
    pub debug: bool,
    pub body_capture_limit: usize,
}

impl RequestPolicy {
    pub fn from_config(config: &MiddlewareConfig) -> Self {
        Self {
            redactor: Redactor::from_config(&config.redaction),
            debug: config.debug,
            body_capture_limit: config.security.body_capture_limit,
        }
    }
}

/// Shared state of the logging middleware.
#[derive(Clone)]
pub struct MiddlewareState {
    emitter: Arc<LogEmitter>,
    policy: Arc<ArcSwap<RequestPolicy>>,
}

impl MiddlewareState {
    pub fn new(emitter: Arc<LogEmitter>, config: &MiddlewareConfig) -> Self {
        Self {
            emitter,
            policy: Arc::new(ArcSwap::from_pointee(RequestPolicy::from_config(config))),
        }
    }

    pub fn emitter(&self) -> &Arc<LogEmitter> {
        &self.emitter
    }

    /// Snapshot of the current policy.
    pub fn policy(&self) -> Arc<RequestPolicy> {
        self.policy.load_full()
    }

    /// Apply the reloadable parts of a new configuration.
    pub fn reload(&self, config: &MiddlewareConfig) {
        self.policy.store(Arc::new(RequestPolicy::from_config(config)));
        tracing::info!(debug = config.debug, "Request policy reloaded");
    }

    /// Install the fallbacks and the request logger on `router`.
    ///
    /// Call this last so the logger wraps every other layer.
    pub fn apply<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router
            .fallback(route_not_found)
            .method_not_allowed_fallback(method_not_allowed)
            .layer(from_fn_with_state(self.clone(), request_logger))
    }
}

async fn route_not_found(uri: Uri) -> Fault {
    Fault::not_found(format!(
        "The requested URL {} was not found on the server",
        uri.path()
    ))
}

async fn method_not_allowed(method: Method, uri: Uri) -> Fault {
    Fault::new(
        crate::faults::FaultKind::MethodNotAllowed,
        format!("The method {method} is not allowed for the requested URL {}", uri.path()),
    )
}
