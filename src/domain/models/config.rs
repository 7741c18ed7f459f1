use serde::{Deserialize, Serialize};

use super::result::MetricKind;

/// Main configuration structure for Arbiter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// LLM judge endpoint and retry configuration
    #[serde(default)]
    pub judge: JudgeConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metric selection and per-metric settings
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// LLM judge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JudgeConfig {
    /// Base URL of a Messages-compatible endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Judge model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens the judge may generate per call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Context window of the judge model, in tokens
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,

    /// Retries after the first attempt for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff before the first retry, doubled on each subsequent retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for a single backoff sleep
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Client-side timeout for one HTTP call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

const fn default_max_tokens() -> u32 {
    4096
}

const fn default_context_limit() -> usize {
    200_000
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

const fn default_timeout_secs() -> u64 {
    120
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            context_limit: default_context_limit(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            timeout_secs: default_timeout_secs(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}

/// Metric selection and settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetricsConfig {
    /// Metrics to run, in report order
    #[serde(default = "default_enabled_metrics")]
    pub enabled: Vec<MetricKind>,

    #[serde(default)]
    pub efficiency: EfficiencyConfig,

    #[serde(default)]
    pub code_quality: CodeQualityConfig,

    #[serde(default)]
    pub functional: FunctionalConfig,

    #[serde(default)]
    pub complexity: ComplexityConfig,

    #[serde(default)]
    pub fulfillment: FulfillmentConfig,
}

fn default_enabled_metrics() -> Vec<MetricKind> {
    MetricKind::ALL.to_vec()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_metrics(),
            efficiency: EfficiencyConfig::default(),
            code_quality: CodeQualityConfig::default(),
            functional: FunctionalConfig::default(),
            complexity: ComplexityConfig::default(),
            fulfillment: FulfillmentConfig::default(),
        }
    }
}

/// An externally configured shell command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CommandSpec {
    /// Display name (defaults to the command itself)
    #[serde(default)]
    pub name: String,

    /// Shell command line, run through `sh -c` in the workspace
    pub command: String,

    #[serde(default = "default_command_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_command_timeout_secs() -> u64 {
    300
}

impl CommandSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            command: command.into(),
            timeout_secs: default_command_timeout_secs(),
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.command
        } else {
            &self.name
        }
    }

    pub const fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

/// Efficiency penalty thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct EfficiencyConfig {
    pub tokens_per_turn_threshold: f64,
    /// Points deducted per 1,000 tokens per turn above the threshold
    pub token_penalty_per_thousand: f64,
    pub max_token_penalty: f64,
    pub error_penalty: f64,
    pub max_error_penalty: f64,
    pub turn_threshold: u32,
    pub turn_penalty: f64,
    pub max_turn_penalty: f64,
}

impl Default for EfficiencyConfig {
    fn default() -> Self {
        Self {
            tokens_per_turn_threshold: 8_000.0,
            token_penalty_per_thousand: 2.0,
            max_token_penalty: 30.0,
            error_penalty: 5.0,
            max_error_penalty: 30.0,
            turn_threshold: 30,
            turn_penalty: 1.0,
            max_turn_penalty: 20.0,
        }
    }
}

/// Static-analysis commands
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct CodeQualityConfig {
    pub commands: Vec<CommandSpec>,
}

/// Build, test and coverage commands
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct FunctionalConfig {
    pub build: Option<CommandSpec>,
    pub test: Option<CommandSpec>,
    pub coverage: Option<CommandSpec>,
}

/// Complexity density settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ComplexityConfig {
    /// Density at or beyond which the score is 0
    pub threshold: f64,
    /// Timeout for the git probes used to detect touched files
    pub git_timeout_secs: u64,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            threshold: 5.0,
            git_timeout_secs: 10,
        }
    }
}

/// Requirement fulfillment settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct FulfillmentConfig {
    /// Task statement given to the agent, shown to the judge for context
    pub task: Option<String>,
    /// Acceptance criteria, each judged pass/fail
    pub criteria: Vec<String>,
}
