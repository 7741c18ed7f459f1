//! Evaluation context
//!
//! Everything one evaluation run needs, resolved up front and handed to every
//! evaluator by reference.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::config::Config;
use super::transcript::SessionTranscript;

/// A skill, sub-agent or MCP server the agent could have invoked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolEntry {
    pub name: String,
    /// Short description of what the tool is for
    #[serde(default)]
    pub summary: String,
}

impl ToolEntry {
    pub fn new(name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: summary.into(),
        }
    }
}

/// A project rule the agent's output must comply with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEntry {
    pub name: String,
    #[serde(default)]
    pub summary: String,
    /// Path globs scoping the rule; empty means the rule always applies
    #[serde(default)]
    pub globs: Vec<String>,
}

impl RuleEntry {
    pub fn new(name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: summary.into(),
            globs: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_globs<I, S>(mut self, globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.globs = globs.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_scoped(&self) -> bool {
        !self.globs.is_empty()
    }
}

/// Tools and rules that were available to the agent during the session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsManifest {
    pub skills: Vec<ToolEntry>,
    pub rules: Vec<RuleEntry>,
    pub sub_agents: Vec<ToolEntry>,
    pub mcp_configs: Vec<ToolEntry>,
}

impl ToolsManifest {
    /// Everything the agent could have invoked (rules are complied with, not invoked).
    pub fn invocable(&self) -> impl Iterator<Item = (&'static str, &ToolEntry)> {
        self.skills
            .iter()
            .map(|t| ("skill", t))
            .chain(self.sub_agents.iter().map(|t| ("sub-agent", t)))
            .chain(self.mcp_configs.iter().map(|t| ("mcp", t)))
    }

    pub fn invocable_count(&self) -> usize {
        self.skills.len() + self.sub_agents.len() + self.mcp_configs.len()
    }
}

/// File contents captured before the agent ran, keyed by workspace-relative path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileSnapshot {
    pub files: BTreeMap<PathBuf, String>,
}

impl FileSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }
}

/// Read-only input for one evaluation run
#[derive(Debug, Clone)]
pub struct EvalContext {
    pub config: Config,
    pub transcript: SessionTranscript,
    pub workspace: PathBuf,
    pub tools: ToolsManifest,
    pub snapshot: Option<FileSnapshot>,
}

impl EvalContext {
    pub fn new(
        config: Config,
        transcript: SessionTranscript,
        workspace: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            transcript,
            workspace: workspace.into(),
            tools: ToolsManifest::default(),
            snapshot: None,
        }
    }

    #[must_use]
    pub fn with_tools(mut self, tools: ToolsManifest) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn with_snapshot(mut self, snapshot: FileSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }
}
