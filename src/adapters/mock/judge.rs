//! Mock judge client for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::errors::JudgeError;
use crate::domain::ports::{JudgeClient, JudgeRequest, JudgeResponse};

/// Judge double that replays scripted replies in call order.
///
/// When the script runs dry every further call gets the fallback reply, which
/// defaults to an empty JSON array. Every request is recorded.
pub struct MockJudgeClient {
    script: Arc<Mutex<VecDeque<Result<JudgeResponse, JudgeError>>>>,
    fallback: String,
    requests: Arc<Mutex<Vec<JudgeRequest>>>,
}

impl MockJudgeClient {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback: "[]".to_string(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue replies with the given text, each reporting 100 input and 20 output tokens.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let script = responses
            .into_iter()
            .map(|content| Ok(Self::reply(content)))
            .collect();
        Self {
            script: Arc::new(Mutex::new(script)),
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_fallback(mut self, content: impl Into<String>) -> Self {
        self.fallback = content.into();
        self
    }

    /// Queue an error as the next reply.
    pub async fn push_error(&self, error: JudgeError) {
        self.script.lock().await.push_back(Err(error));
    }

    /// Queue a text reply.
    pub async fn push_response(&self, content: impl Into<String>) {
        self.script.lock().await.push_back(Ok(Self::reply(content)));
    }

    /// Requests received so far, in call order.
    pub async fn requests(&self) -> Vec<JudgeRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    fn reply(content: impl Into<String>) -> JudgeResponse {
        JudgeResponse {
            content: content.into(),
            input_tokens: 100,
            output_tokens: 20,
        }
    }
}

impl Default for MockJudgeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JudgeClient for MockJudgeClient {
    async fn query(&self, request: JudgeRequest) -> Result<JudgeResponse, JudgeError> {
        self.requests.lock().await.push(request);
        match self.script.lock().await.pop_front() {
            Some(reply) => reply,
            None => Ok(Self::reply(self.fallback.clone())),
        }
    }
}
