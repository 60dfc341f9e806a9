//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MiddlewareConfig (validated, immutable)
//!     → bootstrap builds the emitter and request policy from it
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps the request policy (redaction, debug flag)
//! ```
//!
//! # Design Decisions
//! - Sink layout (directory, rotation) is fixed at startup; only the
//!   request policy is hot-reloaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    LoggingConfig, MatchMode, MiddlewareConfig, RedactionConfig, SecurityConfig, ServerConfig,
    TimeoutConfig,
};
