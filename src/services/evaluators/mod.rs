//! Metric evaluators.
//!
//! Deterministic evaluators score from session metadata, command output or
//! source code. Judged evaluators consult the LLM judge, chunking the transcript
//! when it does not fit the judge's context.
//!
//! Evaluators only return `Err` for infrastructure failures (a command that
//! cannot be spawned, a judge that stays unreachable). Unparseable tool output
//! and malformed judge replies become fail-closed results.

pub mod code_quality;
pub mod complexity;
pub mod efficiency;
pub mod fulfillment;
pub mod functional;
pub mod tool_usage;

use async_trait::async_trait;

use crate::domain::errors::EvalError;
use crate::domain::models::{EvalContext, EvalResult, MetricKind};

pub use code_quality::CodeQualityEvaluator;
pub use complexity::{complexity_score, ComplexityEvaluator};
pub use efficiency::EfficiencyEvaluator;
pub use fulfillment::{fulfillment_score, parse_judge_response, FulfillmentEvaluator};
pub use functional::FunctionalEvaluator;
pub use tool_usage::{
    applicable_rules, parse_tool_usage_response, tool_usage_score, ToolUsageEvaluator,
};

/// One metric's scoring logic
#[async_trait]
pub trait Evaluator: Send + Sync {
    fn metric(&self) -> MetricKind;

    async fn evaluate(&self, ctx: &EvalContext) -> Result<EvalResult, EvalError>;
}

/// Round to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
