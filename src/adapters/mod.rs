//! Adapters for the domain ports that do not talk to the outside world.

pub mod mock;

pub use mock::{MockJudgeClient, ScriptedCommandRunner};
