//! CLI command implementations.

pub mod evaluate;
