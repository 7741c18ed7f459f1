use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::errors::EvalError;
use crate::domain::ports::{CommandOutput, CommandRunner};
use crate::infrastructure::logging::scrub_secrets;

/// Runs command lines through `sh -c` inside the workspace.
///
/// The child is killed when the timeout elapses. Only a spawn failure is an
/// error; a non-zero exit or a timeout is reported in the [`CommandOutput`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellCommandRunner;

impl ShellCommandRunner {
    pub const fn new() -> Self {
        Self
    }
}

/// Join stdout and stderr the way a terminal would show them.
fn combine_streams(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    match (stdout.is_empty(), stderr.is_empty()) {
        (_, true) => stdout.into_owned(),
        (true, false) => stderr.into_owned(),
        (false, false) => format!("{stdout}\n{stderr}"),
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput, EvalError> {
        debug!(
            command = %command,
            cwd = %cwd.display(),
            timeout_secs = timeout.as_secs(),
            "Running command"
        );

        let started = Instant::now();
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EvalError::CommandSpawn {
                command: command.to_string(),
                source,
            })?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let combined = combine_streams(&output.stdout, &output.stderr);
                let exit_code = output.status.code();
                debug!(
                    command = %command,
                    exit_code = ?exit_code,
                    duration_ms = started.elapsed().as_millis() as u64,
                    output = %scrub_secrets(&combined),
                    "Command finished"
                );
                Ok(CommandOutput {
                    combined,
                    exit_code,
                    timed_out: false,
                    duration: started.elapsed(),
                })
            }
            Ok(Err(source)) => Err(EvalError::CommandSpawn {
                command: command.to_string(),
                source,
            }),
            Err(_) => {
                warn!(command = %command, timeout_secs = timeout.as_secs(), "Command timed out");
                Ok(CommandOutput::timed_out(String::new(), started.elapsed()))
            }
        }
    }
}
