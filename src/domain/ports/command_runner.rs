use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::domain::errors::EvalError;

/// What a finished (or abandoned) command left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// stdout followed by stderr
    pub combined: String,
    /// None when the process was killed by a signal or timed out
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn completed(combined: impl Into<String>, exit_code: i32) -> Self {
        Self {
            combined: combined.into(),
            exit_code: Some(exit_code),
            timed_out: false,
            duration: Duration::ZERO,
        }
    }

    pub fn timed_out(combined: impl Into<String>, duration: Duration) -> Self {
        Self {
            combined: combined.into(),
            exit_code: None,
            timed_out: true,
            duration,
        }
    }

    /// Exit code 0 and no timeout
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Port trait for running externally configured shell commands
///
/// Only a failure to start the process is an error. Non-zero exits and
/// timeouts are ordinary outcomes that evaluators score.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput, EvalError>;
}
