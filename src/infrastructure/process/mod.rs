//! Subprocess execution for externally configured commands

pub mod shell;

pub use shell::ShellCommandRunner;
