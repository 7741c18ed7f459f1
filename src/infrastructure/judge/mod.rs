//! LLM judge client infrastructure

pub mod client;
pub mod retry;
pub mod types;
pub mod unavailable;

pub use client::{AnthropicJudgeClient, JudgeClientConfig};
pub use retry::RetryPolicy;
pub use types::{ContentBlock, Message, MessageRequest, MessageResponse, Usage};
pub use unavailable::UnavailableJudgeClient;
