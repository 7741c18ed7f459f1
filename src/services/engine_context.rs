//! Process-wide collaborators shared by every evaluation.

use std::sync::Arc;
use tracing::warn;

use crate::domain::errors::JudgeError;
use crate::domain::models::JudgeConfig;
use crate::domain::ports::{CommandRunner, JudgeClient};
use crate::infrastructure::judge::{AnthropicJudgeClient, JudgeClientConfig, UnavailableJudgeClient};
use crate::infrastructure::process::ShellCommandRunner;

/// The judge and the shell, built once per process and passed down.
#[derive(Clone)]
pub struct EngineContext {
    pub judge: Arc<dyn JudgeClient>,
    pub runner: Arc<dyn CommandRunner>,
}

impl EngineContext {
    pub fn new(judge: Arc<dyn JudgeClient>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { judge, runner }
    }

    /// Production wiring: HTTP judge and `sh -c` runner.
    ///
    /// A missing API key is not fatal here; judged metrics report it when they run.
    pub fn from_config(judge: &JudgeConfig) -> Result<Self, JudgeError> {
        let judge_client: Arc<dyn JudgeClient> = match JudgeClientConfig::from_judge_config(judge) {
            Ok(config) => Arc::new(AnthropicJudgeClient::new(config)?),
            Err(JudgeError::MissingApiKey(var)) => {
                warn!(env_var = %var, "Judge API key not set; judged metrics will fail");
                Arc::new(UnavailableJudgeClient::new(var))
            }
            Err(e) => return Err(e),
        };
        Ok(Self::new(judge_client, Arc::new(ShellCommandRunner::new())))
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext").finish_non_exhaustive()
    }
}
