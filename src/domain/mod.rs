//! Domain layer for the Arbiter evaluation engine
//!
//! Models, ports and error types. Nothing here performs I/O.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{EvalError, JudgeApiError, JudgeError};
