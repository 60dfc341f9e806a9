//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Captured request/response metadata:
//!     → redaction.rs (mask sensitive keys and headers)
//!     → observability emitter
//! ```
//!
//! # Design Decisions
//! - Nothing captured from a request reaches a sink without passing
//!   through the redactor first
//! - The sensitive-key set changes only through configuration reload

pub mod redaction;

pub use redaction::{Redactor, DEFAULT_MASK};
