//! Ports: the traits the engine depends on for its two external collaborators,
//! the LLM judge and the shell.

pub mod command_runner;
pub mod judge_client;

pub use command_runner::{CommandOutput, CommandRunner};
pub use judge_client::{JudgeClient, JudgeRequest, JudgeResponse};
