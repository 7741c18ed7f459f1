//! Functional correctness from configured build, test and coverage commands.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::Evaluator;
use crate::domain::errors::EvalError;
use crate::domain::models::{
    BuildOutcome, ComponentWeights, CoverageOutcome, EvalContext, EvalResult, FunctionalDetails,
    MetricDetails, MetricKind, TestOutcome, NEUTRAL_SCORE,
};
use crate::domain::ports::{CommandOutput, CommandRunner};
use crate::services::output_parsing::{
    first_match, TestCounts, COVERAGE_PATTERNS, EXIT_CODE_PATTERN, TEST_PATTERNS,
};

/// Composite weights for the configured subset of build, test and coverage.
pub const fn component_weights(build: bool, test: bool, coverage: bool) -> ComponentWeights {
    let (build_w, test_w, coverage_w) = match (build, test, coverage) {
        (true, true, true) => (30, 50, 20),
        (true, true, false) => (40, 60, 0),
        (false, true, true) => (0, 70, 30),
        (true, false, true) => (60, 0, 40),
        (true, false, false) => (100, 0, 0),
        (false, true, false) => (0, 100, 0),
        (false, false, true) => (0, 0, 100),
        (false, false, false) => (0, 0, 0),
    };
    ComponentWeights {
        build: build_w,
        test: test_w,
        coverage: coverage_w,
    }
}

/// Score a test run from its output, falling back to the exit code.
pub fn test_outcome(output: &CommandOutput) -> TestOutcome {
    let parsed = first_match(TEST_PATTERNS, &output.combined).filter(|(_, c)| c.total() > 0);
    let (pattern, counts) = parsed.unwrap_or_else(|| {
        let counts = if output.success() {
            TestCounts { passed: 1, failed: 0 }
        } else {
            TestCounts { passed: 0, failed: 1 }
        };
        (EXIT_CODE_PATTERN, counts)
    });

    TestOutcome {
        passed: counts.passed,
        failed: counts.failed,
        pattern: pattern.to_string(),
        score: f64::from(counts.passed) / (f64::from(counts.passed) + f64::from(counts.failed))
            * 100.0,
        exit_code: output.exit_code,
        timed_out: output.timed_out,
    }
}

pub fn coverage_outcome(output: &CommandOutput) -> CoverageOutcome {
    match first_match(COVERAGE_PATTERNS, &output.combined) {
        Some((pattern, percent)) => CoverageOutcome {
            percent: Some(percent),
            pattern: pattern.to_string(),
        },
        None => CoverageOutcome {
            percent: None,
            pattern: "none".to_string(),
        },
    }
}

/// Weighted composite, rounded to an integer.
pub fn composite_score(details: &FunctionalDetails) -> f64 {
    let build = details
        .build
        .as_ref()
        .map_or(0.0, |b| if b.passed { 100.0 } else { 0.0 });
    let test = details.tests.as_ref().map_or(0.0, |t| t.score);
    let coverage = details
        .coverage
        .as_ref()
        .and_then(|c| c.percent)
        .unwrap_or(0.0);

    let weights = details.weights;
    let weighted = build * f64::from(weights.build)
        + test * f64::from(weights.test)
        + coverage * f64::from(weights.coverage);
    (weighted / 100.0).round()
}

/// Runs build, test and coverage commands and blends their results.
pub struct FunctionalEvaluator {
    runner: Arc<dyn CommandRunner>,
}

impl FunctionalEvaluator {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Evaluator for FunctionalEvaluator {
    fn metric(&self) -> MetricKind {
        MetricKind::FunctionalCorrectness
    }

    async fn evaluate(&self, ctx: &EvalContext) -> Result<EvalResult, EvalError> {
        let config = &ctx.config.metrics.functional;
        let weights = component_weights(
            config.build.is_some(),
            config.test.is_some(),
            config.coverage.is_some(),
        );
        if config.build.is_none() && config.test.is_none() && config.coverage.is_none() {
            return Ok(EvalResult::new(
                NEUTRAL_SCORE,
                MetricDetails::FunctionalCorrectness(FunctionalDetails::default()),
                "No build, test or coverage commands configured; neutral score",
            ));
        }

        let mut details = FunctionalDetails {
            weights,
            ..FunctionalDetails::default()
        };
        let mut notes = Vec::new();

        if let Some(spec) = &config.build {
            let output = self.runner.run(&spec.command, &ctx.workspace, spec.timeout()).await?;
            let passed = output.success();
            notes.push(match (passed, output.timed_out) {
                (true, _) => "build passed".to_string(),
                (false, true) => "build timed out".to_string(),
                (false, false) => format!("build failed (exit {:?})", output.exit_code),
            });
            details.build = Some(BuildOutcome {
                passed,
                exit_code: output.exit_code,
                timed_out: output.timed_out,
            });
        }

        if let Some(spec) = &config.test {
            let output = self.runner.run(&spec.command, &ctx.workspace, spec.timeout()).await?;
            let outcome = test_outcome(&output);
            notes.push(format!(
                "tests {} passed, {} failed via {}{}",
                outcome.passed,
                outcome.failed,
                outcome.pattern,
                if outcome.timed_out { " (timed out)" } else { "" }
            ));
            details.tests = Some(outcome);
        }

        if let Some(spec) = &config.coverage {
            let output = self.runner.run(&spec.command, &ctx.workspace, spec.timeout()).await?;
            let outcome = coverage_outcome(&output);
            notes.push(match outcome.percent {
                Some(percent) => format!("coverage {percent:.1}% via {}", outcome.pattern),
                None => "coverage not found in output; counted as 0%".to_string(),
            });
            details.coverage = Some(outcome);
        }

        let score = composite_score(&details);
        let reasoning = format!(
            "{} (weights build {}/test {}/coverage {})",
            notes.join("; "),
            weights.build,
            weights.test,
            weights.coverage
        );
        let result =
            EvalResult::new(score, MetricDetails::FunctionalCorrectness(details), reasoning);
        info!(metric = %result.metric, score = result.score, "Functional correctness evaluated");
        Ok(result)
    }
}
