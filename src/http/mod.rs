//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, timeout and body limit)
//!     → middleware/ (request logger, fallbacks)
//!     → request.rs (RequestId, RequestContext, request capture)
//!     → application routes
//!     → response.rs (correlation headers, response capture)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::{MiddlewareState, RequestPolicy};
pub use request::{RequestContext, RequestContextExt, RequestId, X_PROCESSING_TIME, X_REQUEST_ID};
pub use server::HttpServer;
