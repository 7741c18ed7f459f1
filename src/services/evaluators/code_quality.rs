//! Static-analysis quality from configured lint/type-check commands.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::Evaluator;
use crate::domain::errors::EvalError;
use crate::domain::models::{
    CodeQualityDetails, CommandIssues, CommandSpec, EvalContext, EvalResult, IssueCounts,
    MetricDetails, MetricKind, NEUTRAL_SCORE,
};
use crate::domain::ports::{CommandOutput, CommandRunner};
use crate::services::output_parsing::{first_match, ISSUE_PATTERNS};

const ERROR_WEIGHT: f64 = 10.0;
const WARNING_WEIGHT: f64 = 2.0;

/// Runs each configured command and scores `100 - 10*errors - 2*warnings`.
pub struct CodeQualityEvaluator {
    runner: Arc<dyn CommandRunner>,
}

impl CodeQualityEvaluator {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Counts for one command's output.
    ///
    /// A failed run with no recognizable errors still counts one error, since
    /// the tool itself signalled failure.
    pub fn analyze(spec: &CommandSpec, output: &CommandOutput) -> CommandIssues {
        let (pattern, mut counts) = first_match(ISSUE_PATTERNS, &output.combined)
            .unwrap_or(("none", IssueCounts::default()));

        let mut pattern = pattern.to_string();
        if !output.success() && counts.errors == 0 {
            counts.errors = 1;
            pattern = if output.timed_out { "timeout" } else { "exit-code" }.to_string();
        }

        CommandIssues {
            name: spec.display_name().to_string(),
            errors: counts.errors,
            warnings: counts.warnings,
            exit_code: output.exit_code,
            timed_out: output.timed_out,
            pattern,
        }
    }

    pub fn score(total_errors: u32, total_warnings: u32) -> f64 {
        100.0
            - ERROR_WEIGHT * f64::from(total_errors)
            - WARNING_WEIGHT * f64::from(total_warnings)
    }
}

#[async_trait]
impl Evaluator for CodeQualityEvaluator {
    fn metric(&self) -> MetricKind {
        MetricKind::CodeQuality
    }

    async fn evaluate(&self, ctx: &EvalContext) -> Result<EvalResult, EvalError> {
        let commands = &ctx.config.metrics.code_quality.commands;
        if commands.is_empty() {
            return Ok(EvalResult::new(
                NEUTRAL_SCORE,
                MetricDetails::CodeQuality(CodeQualityDetails::default()),
                "No static analysis commands configured; neutral score",
            ));
        }

        let mut details = CodeQualityDetails::default();
        for spec in commands {
            let output = self
                .runner
                .run(&spec.command, &ctx.workspace, spec.timeout())
                .await?;
            if output.timed_out {
                warn!(command = %spec.display_name(), "Static analysis command timed out");
            }

            let issues = Self::analyze(spec, &output);
            details.total_errors = details.total_errors.saturating_add(issues.errors);
            details.total_warnings = details.total_warnings.saturating_add(issues.warnings);
            details.commands.push(issues);
        }

        let reasoning = details
            .commands
            .iter()
            .map(|c| {
                format!(
                    "{}: {} errors, {} warnings ({})",
                    c.name, c.errors, c.warnings, c.pattern
                )
            })
            .collect::<Vec<_>>()
            .join("; ");

        let score = Self::score(details.total_errors, details.total_warnings);
        let result = EvalResult::new(score, MetricDetails::CodeQuality(details), reasoning);
        info!(metric = %result.metric, score = result.score, "Code quality evaluated");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::ScriptedCommandRunner;
    use crate::domain::models::{Config, SessionTranscript};

    fn context(commands: &[&str]) -> EvalContext {
        let mut config = Config::default();
        config.metrics.code_quality.commands =
            commands.iter().map(|c| CommandSpec::new(*c)).collect();
        EvalContext::new(config, SessionTranscript::default(), "/tmp/workspace")
    }

    #[tokio::test]
    async fn test_eslint_summary_scores() {
        let runner = ScriptedCommandRunner::new().with_output(
            "npx eslint .",
            "/src/a.js\n  1:1 error no-undef\n\n✖ 5 problems (3 errors, 2 warnings)",
            1,
        );
        let evaluator = CodeQualityEvaluator::new(Arc::new(runner));

        let result = evaluator.evaluate(&context(&["npx eslint ."])).await.unwrap();

        assert!((result.score - 66.0).abs() < f64::EPSILON);
        match result.details {
            MetricDetails::CodeQuality(details) => {
                assert_eq!(details.total_errors, 3);
                assert_eq!(details.total_warnings, 2);
                assert_eq!(details.commands[0].pattern, "eslint-summary");
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_exit_without_parsed_errors_counts_one() {
        let runner = ScriptedCommandRunner::new()
            .with_output("mylint", "something went sideways", 2)
            .with_output("clean", "All good", 0);
        let evaluator = CodeQualityEvaluator::new(Arc::new(runner));

        let result = evaluator.evaluate(&context(&["mylint", "clean"])).await.unwrap();

        assert!((result.score - 90.0).abs() < f64::EPSILON);
        assert!(result.reasoning.contains("mylint: 1 errors, 0 warnings (exit-code)"));
    }

    #[tokio::test]
    async fn test_timeout_counts_as_error() {
        let runner = ScriptedCommandRunner::new().with_timeout("slowlint");
        let evaluator = CodeQualityEvaluator::new(Arc::new(runner));

        let result = evaluator.evaluate(&context(&["slowlint"])).await.unwrap();

        assert!((result.score - 90.0).abs() < f64::EPSILON);
        assert!(result.reasoning.contains("(timeout)"));
    }

    #[tokio::test]
    async fn test_score_clamped_at_zero() {
        let runner =
            ScriptedCommandRunner::new().with_output("tsc", "Found 42 errors in 9 files.", 2);
        let evaluator = CodeQualityEvaluator::new(Arc::new(runner));

        let result = evaluator.evaluate(&context(&["tsc"])).await.unwrap();
        assert!(result.score.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_huge_counts_saturate_across_commands() {
        let runner = ScriptedCommandRunner::new()
            .with_output("lint-a", "Found 4294967295 errors in 1 file.", 1)
            .with_output("lint-b", "Found 7 errors in 2 files.", 1);
        let evaluator = CodeQualityEvaluator::new(Arc::new(runner));

        let result = evaluator.evaluate(&context(&["lint-a", "lint-b"])).await.unwrap();

        assert!(result.score.abs() < f64::EPSILON);
        match result.details {
            MetricDetails::CodeQuality(details) => assert_eq!(details.total_errors, u32::MAX),
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_is_neutral() {
        let evaluator = CodeQualityEvaluator::new(Arc::new(ScriptedCommandRunner::new()));
        let result = evaluator.evaluate(&context(&[])).await.unwrap();
        assert!((result.score - NEUTRAL_SCORE).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_spawn_failure_propagates() {
        let runner = ScriptedCommandRunner::new().with_spawn_failure("eslint");
        let evaluator = CodeQualityEvaluator::new(Arc::new(runner));

        let err = evaluator.evaluate(&context(&["eslint"])).await.unwrap_err();
        assert!(matches!(err, EvalError::CommandSpawn { .. }));
    }
}
