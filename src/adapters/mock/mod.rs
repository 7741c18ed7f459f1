//! In-memory doubles for the judge and shell ports.

pub mod command_runner;
pub mod judge;

pub use command_runner::ScriptedCommandRunner;
pub use judge::MockJudgeClient;
