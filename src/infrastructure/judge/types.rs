/// Request and response types for the Messages wire format
use serde::{Deserialize, Serialize};

/// Message request sent to the judge endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    /// Model identifier (e.g., "claude-sonnet-4-5-20250929")
    pub model: String,

    /// System prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Conversation; the judge always receives a single user turn
    pub messages: Vec<Message>,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl MessageRequest {
    /// Build a single-turn request with a system prompt
    pub fn with_system(model: String, system: String, user: String, max_tokens: u32) -> Self {
        Self {
            model,
            system: Some(system),
            messages: vec![Message {
                role: "user".to_string(),
                content: user,
            }],
            max_tokens,
        }
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// Response from the Messages endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub id: String,

    /// Content blocks; only `text` blocks carry judge output
    #[serde(default)]
    pub content: Vec<ContentBlock>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,

    #[serde(default)]
    pub usage: Usage,
}

impl MessageResponse {
    /// Concatenate every text block, in order
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect()
    }
}

/// A block of content in the response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}
