use async_trait::async_trait;

use crate::domain::errors::JudgeError;
use crate::domain::ports::{JudgeClient, JudgeRequest, JudgeResponse};

/// Stand-in used when no API key is available.
///
/// Deterministic metrics still run; every judged metric fails with
/// [`JudgeError::MissingApiKey`] and its hint.
#[derive(Debug, Clone)]
pub struct UnavailableJudgeClient {
    api_key_env: String,
}

impl UnavailableJudgeClient {
    pub fn new(api_key_env: impl Into<String>) -> Self {
        Self {
            api_key_env: api_key_env.into(),
        }
    }
}

#[async_trait]
impl JudgeClient for UnavailableJudgeClient {
    async fn query(&self, _request: JudgeRequest) -> Result<JudgeResponse, JudgeError> {
        Err(JudgeError::MissingApiKey(self.api_key_env.clone()))
    }
}
