pub mod chunk;
pub mod config;
pub mod context;
pub mod result;
pub mod transcript;

pub use chunk::TranscriptChunk;
pub use config::{
    CodeQualityConfig, CommandSpec, ComplexityConfig, Config, EfficiencyConfig, FulfillmentConfig,
    FunctionalConfig, JudgeConfig, LoggingConfig, MetricsConfig,
};
pub use context::{EvalContext, FileSnapshot, RuleEntry, ToolEntry, ToolsManifest};
pub use result::{
    clamp_score, BuildOutcome, CodeQualityDetails, CommandIssues, ComplexityDetails,
    ComponentWeights, CoverageOutcome, CriterionResult, EfficiencyDetails, ElementCounts,
    EvalResult, FileComplexity, FulfillmentDetails, FunctionalDetails, IssueCounts, JudgeUsage,
    MetricDetails, MetricKind, MissedTool, RuleCompliance, TestOutcome, ToolUsageDetails, ToolUse,
    NEUTRAL_SCORE,
};
pub use transcript::{Role, SessionMetadata, SessionTranscript, ToolInvocation, TranscriptMessage};
