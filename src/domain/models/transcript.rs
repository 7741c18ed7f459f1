//! Session transcript domain models
//!
//! A transcript is the ordered record of one agent session: every message the
//! user, assistant or system produced, plus the tool invocations attached to
//! assistant turns. Transcripts are recorded once and only ever read by the
//! evaluation engine.

use serde::{Deserialize, Serialize};

/// Author of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single tool call made during a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    /// Name of the tool (e.g. "Edit", "Bash", "mcp__github__create_pr")
    pub tool_name: String,

    /// Arguments the agent passed to the tool
    #[serde(default)]
    pub input: serde_json::Value,

    /// Captured tool output, when the recorder kept it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
}

impl ToolInvocation {
    pub fn new(tool_name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            input,
            output: None,
        }
    }

    #[must_use]
    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = Some(output);
        self
    }

    /// File path this invocation operated on, if its input names one.
    pub fn touched_path(&self) -> Option<&str> {
        const PATH_KEYS: [&str; 4] = ["file_path", "path", "filePath", "notebook_path"];
        let input = self.input.as_object()?;
        PATH_KEYS
            .iter()
            .find_map(|key| input.get(*key).and_then(serde_json::Value::as_str))
            .filter(|p| !p.is_empty())
    }
}

/// One turn of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptMessage {
    pub role: Role,

    /// Text content of the turn
    #[serde(default)]
    pub content: String,

    /// Tool invocations in call order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,
}

impl TranscriptMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    #[must_use]
    pub fn with_tool_call(mut self, call: ToolInvocation) -> Self {
        self.tool_calls.push(call);
        self
    }
}

/// Aggregate statistics recorded alongside the transcript
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionMetadata {
    /// Total session cost in USD
    pub cost_usd: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub turn_count: u32,
    pub duration_ms: u64,
    /// Number of tool or runtime errors the agent hit
    pub error_count: u32,
}

impl SessionMetadata {
    pub const fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// The full record of one agent session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTranscript {
    #[serde(default)]
    pub messages: Vec<TranscriptMessage>,
    #[serde(default)]
    pub metadata: SessionMetadata,
}

impl SessionTranscript {
    pub fn new(messages: Vec<TranscriptMessage>, metadata: SessionMetadata) -> Self {
        Self { messages, metadata }
    }

    /// Every file path the agent's tool calls touched, deduplicated, in first-seen order.
    pub fn touched_paths(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.messages
            .iter()
            .flat_map(|m| m.tool_calls.iter())
            .filter_map(ToolInvocation::touched_path)
            .filter(|p| seen.insert(p.to_string()))
            .map(str::to_string)
            .collect()
    }
}
