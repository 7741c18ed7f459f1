//! Session efficiency from recorded metadata alone.

use async_trait::async_trait;
use tracing::info;

use super::Evaluator;
use crate::domain::errors::EvalError;
use crate::domain::models::{
    EfficiencyConfig, EfficiencyDetails, EvalContext, EvalResult, MetricDetails, MetricKind,
    SessionMetadata,
};

/// Starts at 100 and subtracts capped penalties for token-heavy turns, errors
/// and turns beyond the threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct EfficiencyEvaluator;

impl EfficiencyEvaluator {
    pub const fn new() -> Self {
        Self
    }

    /// Pure scoring; shared by `evaluate` and property tests.
    pub fn score(
        metadata: &SessionMetadata,
        config: &EfficiencyConfig,
    ) -> (f64, EfficiencyDetails) {
        let turns = metadata.turn_count.max(1);
        let total_tokens = metadata.total_tokens();
        let tokens_per_turn = total_tokens as f64 / f64::from(turns);

        let excess_tokens = (tokens_per_turn - config.tokens_per_turn_threshold).max(0.0);
        let token_penalty = (excess_tokens / 1000.0 * config.token_penalty_per_thousand)
            .clamp(0.0, config.max_token_penalty.max(0.0));

        let error_penalty = (f64::from(metadata.error_count) * config.error_penalty)
            .clamp(0.0, config.max_error_penalty.max(0.0));

        let excess_turns = metadata.turn_count.saturating_sub(config.turn_threshold);
        let turn_penalty = (f64::from(excess_turns) * config.turn_penalty)
            .clamp(0.0, config.max_turn_penalty.max(0.0));

        let score = 100.0 - token_penalty - error_penalty - turn_penalty;
        let details = EfficiencyDetails {
            total_tokens,
            tokens_per_turn,
            turn_count: metadata.turn_count,
            error_count: metadata.error_count,
            cost_usd: metadata.cost_usd,
            duration_ms: metadata.duration_ms,
            token_penalty,
            error_penalty,
            turn_penalty,
        };
        (score, details)
    }
}

#[async_trait]
impl Evaluator for EfficiencyEvaluator {
    fn metric(&self) -> MetricKind {
        MetricKind::Efficiency
    }

    async fn evaluate(&self, ctx: &EvalContext) -> Result<EvalResult, EvalError> {
        let (score, details) =
            Self::score(&ctx.transcript.metadata, &ctx.config.metrics.efficiency);

        let reasoning = format!(
            "{} tokens over {} turns ({:.0} per turn), {} errors; penalties: tokens -{:.1}, errors -{:.1}, turns -{:.1}",
            details.total_tokens,
            details.turn_count,
            details.tokens_per_turn,
            details.error_count,
            details.token_penalty,
            details.error_penalty,
            details.turn_penalty,
        );

        let result = EvalResult::new(score, MetricDetails::Efficiency(details), reasoning);
        info!(metric = %result.metric, score = result.score, "Efficiency evaluated");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(input: u64, output: u64, turns: u32, errors: u32) -> SessionMetadata {
        SessionMetadata {
            input_tokens: input,
            output_tokens: output,
            turn_count: turns,
            error_count: errors,
            ..SessionMetadata::default()
        }
    }

    #[test]
    fn test_lean_session_scores_full() {
        let (score, details) = EfficiencyEvaluator::score(
            &metadata(20_000, 5_000, 10, 0),
            &EfficiencyConfig::default(),
        );
        assert!((score - 100.0).abs() < f64::EPSILON);
        assert!((details.tokens_per_turn - 2_500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_penalties() {
        // 12k tokens per turn: 4k over threshold = 8 points; 2 errors = 10; 35 turns = 5
        let (score, details) = EfficiencyEvaluator::score(
            &metadata(400_000, 20_000, 35, 2),
            &EfficiencyConfig::default(),
        );
        assert!((details.token_penalty - 8.0).abs() < 1e-9);
        assert!((details.error_penalty - 10.0).abs() < f64::EPSILON);
        assert!((details.turn_penalty - 5.0).abs() < f64::EPSILON);
        assert!((score - 77.0).abs() < 1e-9);
    }

    #[test]
    fn test_penalties_are_capped() {
        let (score, details) = EfficiencyEvaluator::score(
            &metadata(u64::MAX / 2, 0, 200, 1_000),
            &EfficiencyConfig::default(),
        );
        assert!((details.token_penalty - 30.0).abs() < f64::EPSILON);
        assert!((details.error_penalty - 30.0).abs() < f64::EPSILON);
        assert!((details.turn_penalty - 20.0).abs() < f64::EPSILON);
        assert!((score - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_turns_does_not_divide_by_zero() {
        let (score, details) =
            EfficiencyEvaluator::score(&metadata(100, 0, 0, 0), &EfficiencyConfig::default());
        assert!(score.is_finite());
        assert!((details.tokens_per_turn - 100.0).abs() < f64::EPSILON);
    }
}
