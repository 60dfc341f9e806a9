//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Call sites build a LogRecord (record.rs)
//!     → LogEmitter::emit (emitter.rs) picks the sink by category and level
//!     → RotatingFileSink (sink.rs) appends one JSON line, rotating by size
//!     → optional console echo through tracing (logging.rs)
//! ```
//!
//! # Design Decisions
//! - One JSON object per line, never split across files
//! - The request ID flows from the middleware into every record it produces
//! - Sink failures are reported, never propagated into request handling

pub mod emitter;
pub mod logging;
pub mod record;
pub mod sink;

pub use emitter::{EmitterOptions, LogCategory, LogEmitter};
pub use logging::init_tracing;
pub use record::{Level, LogRecord, SourceLocation};
pub use sink::{RotatingFileSink, SinkError};
