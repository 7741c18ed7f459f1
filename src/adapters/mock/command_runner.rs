//! Scripted command runner for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::domain::errors::EvalError;
use crate::domain::ports::{CommandOutput, CommandRunner};

#[derive(Debug, Clone)]
enum Scripted {
    Output(CommandOutput),
    SpawnFailure,
}

/// Runner that answers configured command lines with canned output.
///
/// Unscripted commands fail to spawn, like a binary missing from PATH.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCommandRunner {
    script: HashMap<String, Scripted>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `command` with `combined` output and the given exit code.
    #[must_use]
    pub fn with_output(
        mut self,
        command: impl Into<String>,
        combined: impl Into<String>,
        exit_code: i32,
    ) -> Self {
        self.script.insert(
            command.into(),
            Scripted::Output(CommandOutput::completed(combined, exit_code)),
        );
        self
    }

    /// Make `command` time out.
    #[must_use]
    pub fn with_timeout(mut self, command: impl Into<String>) -> Self {
        self.script.insert(
            command.into(),
            Scripted::Output(CommandOutput::timed_out("", Duration::from_secs(300))),
        );
        self
    }

    #[must_use]
    pub fn with_spawn_failure(mut self, command: impl Into<String>) -> Self {
        self.script.insert(command.into(), Scripted::SpawnFailure);
        self
    }

    /// Command lines run so far, in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedCommandRunner {
    async fn run(
        &self,
        command: &str,
        _cwd: &Path,
        _timeout: Duration,
    ) -> Result<CommandOutput, EvalError> {
        self.calls.lock().await.push(command.to_string());
        match self.script.get(command) {
            Some(Scripted::Output(output)) => Ok(output.clone()),
            Some(Scripted::SpawnFailure) | None => Err(EvalError::CommandSpawn {
                command: command.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "command not scripted"),
            }),
        }
    }
}
