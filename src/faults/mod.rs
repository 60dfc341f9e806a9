//! Fault classification and translation.
//!
//! # Data Flow
//! ```text
//! Handler returns Err(Fault) / extractor rejects / panic / no route
//!     → Fault::into_response (fault.rs) tags the response with RaisedFault
//!     → request logger picks it up
//!     → translator.rs logs request_failed and builds the envelope (envelope.rs)
//! ```
//!
//! # Design Decisions
//! - Categories are a closed enum (kind.rs) with a fixed status mapping
//! - Domain errors opt in by implementing `IntoFault`
//! - 5xx faults never show their real message to the client

pub mod envelope;
pub mod fault;
pub mod kind;
pub mod panic;
pub mod translator;

pub use envelope::ErrorEnvelope;
pub use fault::{ApiResult, Fault, FieldErrors, IntoFault, JsonBody, RaisedFault};
pub use kind::FaultKind;
pub use translator::translate;
