//! Request/response logging and error-handling middleware for Axum.

pub mod app;
pub mod config;
pub mod faults;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::MiddlewareConfig;
pub use faults::{ApiResult, Fault, FaultKind, IntoFault};
pub use http::{HttpServer, MiddlewareState, RequestContext, RequestId};
pub use lifecycle::{bootstrap, Shutdown};
pub use observability::{LogEmitter, LogRecord};
