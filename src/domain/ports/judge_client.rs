use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::JudgeError;

/// A system/user prompt pair sent to the judge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub max_tokens: u32,
}

/// Concatenated text output of the judge plus token accounting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeResponse {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Port trait for the LLM judge
///
/// Implementations own their retry policy: by the time `query` returns an
/// error, transient failures have already been retried and the error is final.
/// Callers never see a partially retried state.
///
/// Implementations must be `Send + Sync` so one client can be shared by every
/// evaluator of a run.
#[async_trait]
pub trait JudgeClient: Send + Sync {
    /// Send one prompt pair and wait for the complete response
    async fn query(&self, request: JudgeRequest) -> Result<JudgeResponse, JudgeError>;
}
