//! Infrastructure layer module
//!
//! Implementations of the domain ports plus process-level plumbing:
//! - Anthropic Messages judge client with retry/backoff
//! - Shell command runner
//! - Configuration management
//! - Logging infrastructure
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod judge;
pub mod logging;
pub mod process;
