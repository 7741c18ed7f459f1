use async_trait::async_trait;
use reqwest::{header, Client as ReqwestClient, Response};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use super::retry::RetryPolicy;
use super::types::{MessageRequest, MessageResponse};
use crate::domain::errors::{JudgeApiError, JudgeError};
use crate::domain::models::JudgeConfig;
use crate::domain::ports::{JudgeClient, JudgeRequest, JudgeResponse};
use crate::infrastructure::logging::redact_key;

/// Configuration for the HTTP judge client
#[derive(Debug, Clone)]
pub struct JudgeClientConfig {
    /// API key sent as `x-api-key`
    pub api_key: String,

    /// Base URL; requests go to `{endpoint}/v1/messages`
    pub endpoint: String,

    /// Retries after the first attempt for transient errors
    pub max_retries: u32,

    /// Backoff before the first retry in milliseconds
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    pub max_backoff_ms: u64,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl JudgeClientConfig {
    /// Resolve the client configuration, reading the API key from the
    /// environment variable named in `judge.api_key_env`
    pub fn from_judge_config(judge: &JudgeConfig) -> Result<Self, JudgeError> {
        let api_key = std::env::var(&judge.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| JudgeError::MissingApiKey(judge.api_key_env.clone()))?;

        Ok(Self {
            api_key,
            endpoint: judge.endpoint.trim_end_matches('/').to_string(),
            max_retries: judge.max_retries,
            initial_backoff_ms: judge.initial_backoff_ms,
            max_backoff_ms: judge.max_backoff_ms,
            timeout_secs: judge.timeout_secs,
        })
    }
}

/// HTTP judge client for Messages-compatible endpoints
///
/// Provides:
/// - Connection pooling and reuse
/// - Exponential backoff retry for transient errors
/// - Classification of failures into transient and permanent
pub struct AnthropicJudgeClient {
    http_client: ReqwestClient,
    endpoint: String,
    retry_policy: RetryPolicy,
}

impl AnthropicJudgeClient {
    /// Create a new judge client
    ///
    /// # Example
    /// ```no_run
    /// use arbiter::infrastructure::judge::{AnthropicJudgeClient, JudgeClientConfig};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = AnthropicJudgeClient::new(JudgeClientConfig {
    ///     api_key: "sk-ant-test".to_string(),
    ///     endpoint: "https://api.anthropic.com".to_string(),
    ///     max_retries: 3,
    ///     initial_backoff_ms: 1_000,
    ///     max_backoff_ms: 30_000,
    ///     timeout_secs: 120,
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: JudgeClientConfig) -> Result<Self, JudgeError> {
        info!(
            "Initializing judge client: endpoint={}, timeout={}s, max_retries={}, api_key={}",
            config.endpoint,
            config.timeout_secs,
            config.max_retries,
            redact_key(&config.api_key)
        );

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            header::HeaderValue::from_str(&config.api_key)
                .map_err(|e| JudgeError::ClientInit(format!("Invalid API key header: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            header::HeaderValue::from_static("2023-06-01"),
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let http_client = ReqwestClient::builder()
            .pool_max_idle_per_host(4)
            .timeout(Duration::from_secs(config.timeout_secs))
            .tcp_nodelay(true)
            .default_headers(headers)
            .build()
            .map_err(|e| JudgeError::ClientInit(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint,
            retry_policy: RetryPolicy::new(
                config.max_retries,
                config.initial_backoff_ms,
                config.max_backoff_ms,
            ),
        })
    }

    /// Execute a single request (called by retry logic)
    async fn execute_message_request(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, JudgeApiError> {
        let url = format!("{}/v1/messages", self.endpoint);
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        Self::handle_response(response).await
    }

    async fn handle_response(response: Response) -> Result<MessageResponse, JudgeApiError> {
        let status = response.status();
        debug!("Response status: {}", status);

        let body = response.text().await.map_err(classify_transport_error)?;

        if !status.is_success() {
            warn!("Judge API error ({}): {}", status, body);
            return Err(JudgeApiError::from_status(status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(|e| JudgeApiError::MalformedResponse(e.to_string()))
    }
}

/// Map a reqwest failure onto the retry taxonomy
fn classify_transport_error(err: reqwest::Error) -> JudgeApiError {
    if err.is_timeout() {
        JudgeApiError::Timeout
    } else if err.is_decode() {
        JudgeApiError::MalformedResponse(err.to_string())
    } else {
        // connect refused, reset, or the body stream dropping mid-read
        JudgeApiError::Connection(err.to_string())
    }
}

#[async_trait]
impl JudgeClient for AnthropicJudgeClient {
    #[instrument(
        skip(self, request),
        fields(model = %request.model, max_tokens = request.max_tokens)
    )]
    async fn query(&self, request: JudgeRequest) -> Result<JudgeResponse, JudgeError> {
        let wire = MessageRequest::with_system(
            request.model,
            request.system_prompt,
            request.user_prompt,
            request.max_tokens,
        );

        let result = self
            .retry_policy
            .execute(|| self.execute_message_request(&wire))
            .await;

        match result {
            Ok(response) => {
                info!(
                    "Judge request succeeded: input_tokens={}, output_tokens={}",
                    response.usage.input_tokens, response.usage.output_tokens
                );
                Ok(JudgeResponse {
                    content: response.text(),
                    input_tokens: response.usage.input_tokens,
                    output_tokens: response.usage.output_tokens,
                })
            }
            Err(err) => {
                error!("Judge request failed: {}", err);
                Err(err)
            }
        }
    }
}
