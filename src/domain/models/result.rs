//! Evaluation result models
//!
//! Each metric produces one [`EvalResult`]. Metric-specific payloads live in the
//! closed [`MetricDetails`] union, so consumers match on the variant instead of
//! inspecting an untyped blob.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Metrics the engine knows how to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Efficiency,
    CodeQuality,
    FunctionalCorrectness,
    Complexity,
    Fulfillment,
    ToolUsage,
}

impl MetricKind {
    pub const ALL: [Self; 6] = [
        Self::Efficiency,
        Self::CodeQuality,
        Self::FunctionalCorrectness,
        Self::Complexity,
        Self::Fulfillment,
        Self::ToolUsage,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Efficiency => "efficiency",
            Self::CodeQuality => "code_quality",
            Self::FunctionalCorrectness => "functional_correctness",
            Self::Complexity => "complexity",
            Self::Fulfillment => "fulfillment",
            Self::ToolUsage => "tool_usage",
        }
    }

    /// Whether computing this metric requires calling the judge
    pub const fn is_judged(self) -> bool {
        matches!(self, Self::Fulfillment | Self::ToolUsage)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown metric '{s}'. Expected one of: {}",
                    Self::ALL.map(Self::as_str).join(", ")
                )
            })
    }
}

/// Score assigned when a metric has nothing configured to measure
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Clamp a raw score into the reportable range.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}

/// Outcome of evaluating one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    pub metric: MetricKind,
    /// Always within [0, 100]
    pub score: f64,
    pub details: MetricDetails,
    pub reasoning: String,
}

impl EvalResult {
    pub fn new(score: f64, details: MetricDetails, reasoning: impl Into<String>) -> Self {
        Self {
            metric: details.metric(),
            score: clamp_score(score),
            details,
            reasoning: reasoning.into(),
        }
    }
}

/// Metric-specific payload, tagged by metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metric", content = "data", rename_all = "snake_case")]
pub enum MetricDetails {
    Efficiency(EfficiencyDetails),
    CodeQuality(CodeQualityDetails),
    FunctionalCorrectness(FunctionalDetails),
    Complexity(ComplexityDetails),
    Fulfillment(FulfillmentDetails),
    ToolUsage(ToolUsageDetails),
}

impl MetricDetails {
    pub const fn metric(&self) -> MetricKind {
        match self {
            Self::Efficiency(_) => MetricKind::Efficiency,
            Self::CodeQuality(_) => MetricKind::CodeQuality,
            Self::FunctionalCorrectness(_) => MetricKind::FunctionalCorrectness,
            Self::Complexity(_) => MetricKind::Complexity,
            Self::Fulfillment(_) => MetricKind::Fulfillment,
            Self::ToolUsage(_) => MetricKind::ToolUsage,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyDetails {
    pub total_tokens: u64,
    pub tokens_per_turn: f64,
    pub turn_count: u32,
    pub error_count: u32,
    pub cost_usd: f64,
    pub duration_ms: u64,
    pub token_penalty: f64,
    pub error_penalty: f64,
    pub turn_penalty: f64,
}

/// Error and warning counts recovered from tool output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub errors: u32,
    pub warnings: u32,
}

/// Per-command static analysis outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandIssues {
    pub name: String,
    pub errors: u32,
    pub warnings: u32,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    /// Name of the pattern that produced the counts
    pub pattern: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeQualityDetails {
    pub commands: Vec<CommandIssues>,
    pub total_errors: u32,
    pub total_warnings: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutcome {
    pub passed: bool,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub passed: u32,
    pub failed: u32,
    pub pattern: String,
    pub score: f64,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageOutcome {
    /// None when no coverage figure could be recovered
    pub percent: Option<f64>,
    pub pattern: String,
}

/// Composite weights in percent; components that are not configured carry 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentWeights {
    pub build: u8,
    pub test: u8,
    pub coverage: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionalDetails {
    pub build: Option<BuildOutcome>,
    pub tests: Option<TestOutcome>,
    pub coverage: Option<CoverageOutcome>,
    pub weights: ComponentWeights,
}

/// Raw code-element counts for one file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementCounts {
    pub constants: u32,
    pub calls: u32,
    pub branches: u32,
    pub loops: u32,
    pub assignments: u32,
    /// Non-blank lines after comments are stripped
    pub lines: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileComplexity {
    pub path: String,
    pub before_density: Option<f64>,
    pub after_density: f64,
    pub elements: ElementCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexityDetails {
    pub files: Vec<FileComplexity>,
    pub average_density: f64,
    pub threshold: f64,
    /// How touched files were found: "git", "snapshot" or "none"
    pub detection: String,
}

/// Judge calls and tokens spent producing a judged result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeUsage {
    pub calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl JudgeUsage {
    pub const fn add(self, other: Self) -> Self {
        Self {
            calls: self.calls + other.calls,
            input_tokens: self.input_tokens + other.input_tokens,
            output_tokens: self.output_tokens + other.output_tokens,
        }
    }
}

/// Verdict for one configured acceptance criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionResult {
    /// The configured criterion text (never the judge's paraphrase)
    pub criterion: String,
    pub passed: bool,
    pub reasoning: String,
}

impl CriterionResult {
    pub fn new(criterion: impl Into<String>, passed: bool, reasoning: impl Into<String>) -> Self {
        Self {
            criterion: criterion.into(),
            passed,
            reasoning: reasoning.into(),
        }
    }

    pub fn failed(criterion: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self::new(criterion, false, reasoning)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentDetails {
    pub criteria: Vec<CriterionResult>,
    pub passed_count: usize,
    pub total_count: usize,
    pub chunks_evaluated: usize,
    pub judge: JudgeUsage,
}

impl FulfillmentDetails {
    pub fn from_criteria(criteria: Vec<CriterionResult>) -> Self {
        let passed_count = criteria.iter().filter(|c| c.passed).count();
        let total_count = criteria.len();
        Self {
            criteria,
            passed_count,
            total_count,
            chunks_evaluated: 1,
            judge: JudgeUsage::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUse {
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissedTool {
    pub name: String,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCompliance {
    pub name: String,
    pub compliant: bool,
    pub reasoning: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUsageDetails {
    pub used_tools: Vec<ToolUse>,
    pub missed_tools: Vec<MissedTool>,
    pub rule_compliance: Vec<RuleCompliance>,
    pub available_tool_count: usize,
    pub assessment: String,
    #[serde(default)]
    pub judge: JudgeUsage,
}
