//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty formatting on stderr
//! - Optional rolling log files
//! - Secret scrubbing

pub mod config;
pub mod logger;
pub mod secrets;

pub use config::{LogConfig, LogFormat, RotationPolicy};
pub use logger::LoggerImpl;
pub use secrets::{redact_key, scrub_secrets};
