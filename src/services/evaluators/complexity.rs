//! Complexity of the code a session touched, as weighted element density.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{round1, Evaluator};
use crate::domain::errors::EvalError;
use crate::domain::models::{
    ComplexityDetails, EvalContext, EvalResult, FileComplexity, MetricDetails, MetricKind,
};
use crate::domain::ports::CommandRunner;
use crate::services::code_elements::{count_elements, density, ElementWeights};
use crate::services::touched_files::detect_touched_files;

/// `clamp(100 * (1 - density / threshold), 0, 100)`
///
/// Non-increasing in density: 100 at 0, 0 at or beyond the threshold.
pub fn complexity_score(density: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 || threshold.is_nan() {
        return if density > 0.0 { 0.0 } else { 100.0 };
    }
    (100.0 * (1.0 - density.max(0.0) / threshold)).clamp(0.0, 100.0)
}

pub struct ComplexityEvaluator {
    runner: Arc<dyn CommandRunner>,
    weights: ElementWeights,
}

impl ComplexityEvaluator {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            weights: ElementWeights::default(),
        }
    }
}

#[async_trait]
impl Evaluator for ComplexityEvaluator {
    fn metric(&self) -> MetricKind {
        MetricKind::Complexity
    }

    async fn evaluate(&self, ctx: &EvalContext) -> Result<EvalResult, EvalError> {
        let config = &ctx.config.metrics.complexity;
        let (detection, touched) = detect_touched_files(
            self.runner.as_ref(),
            &ctx.workspace,
            ctx.snapshot.as_ref(),
            Duration::from_secs(config.git_timeout_secs),
        )
        .await?;

        let files: Vec<FileComplexity> = touched
            .iter()
            .map(|file| {
                let extension = file.extension();
                let elements = count_elements(&file.after, extension);
                FileComplexity {
                    path: file.path.clone(),
                    before_density: file
                        .before
                        .as_deref()
                        .map(|before| density(&count_elements(before, extension), &self.weights)),
                    after_density: density(&elements, &self.weights),
                    elements,
                }
            })
            .collect();

        if files.is_empty() {
            let details = ComplexityDetails {
                files,
                average_density: 0.0,
                threshold: config.threshold,
                detection: detection.as_str().to_string(),
            };
            return Ok(EvalResult::new(
                100.0,
                MetricDetails::Complexity(details),
                format!(
                    "No touched source files detected (via {}); nothing added complexity",
                    detection.as_str()
                ),
            ));
        }

        let average_density =
            files.iter().map(|f| f.after_density).sum::<f64>() / files.len() as f64;
        let score = round1(complexity_score(average_density, config.threshold));

        let grew = files
            .iter()
            .filter(|f| f.before_density.is_some_and(|b| f.after_density > b))
            .count();
        let reasoning = format!(
            "{} touched files (via {}), average density {:.2} against threshold {:.2}; {} became denser",
            files.len(),
            detection.as_str(),
            average_density,
            config.threshold,
            grew
        );

        let details = ComplexityDetails {
            files,
            average_density,
            threshold: config.threshold,
            detection: detection.as_str().to_string(),
        };
        let result = EvalResult::new(score, MetricDetails::Complexity(details), reasoning);
        info!(metric = %result.metric, score = result.score, "Complexity evaluated");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::ScriptedCommandRunner;
    use crate::domain::models::{Config, FileSnapshot, SessionTranscript};
    use tempfile::TempDir;

    #[test]
    fn test_score_endpoints() {
        assert!((complexity_score(0.0, 5.0) - 100.0).abs() < f64::EPSILON);
        assert!(complexity_score(5.0, 5.0).abs() < f64::EPSILON);
        assert!(complexity_score(9.0, 5.0).abs() < f64::EPSILON);
        assert!((complexity_score(2.5, 5.0) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_monotonic() {
        let mut previous = f64::INFINITY;
        for step in 0..100 {
            let score = complexity_score(f64::from(step) * 0.1, 5.0);
            assert!(score <= previous);
            previous = score;
        }
    }

    #[tokio::test]
    async fn test_no_touched_files_scores_full() {
        let dir = TempDir::new().unwrap();
        let evaluator = ComplexityEvaluator::new(Arc::new(ScriptedCommandRunner::new()));
        let ctx = EvalContext::new(Config::default(), SessionTranscript::default(), dir.path());

        let result = evaluator.evaluate(&ctx).await.unwrap();
        assert!((result.score - 100.0).abs() < f64::EPSILON);
        assert!(result.reasoning.contains("via none"));
    }

    #[tokio::test]
    async fn test_snapshot_detection_scores_density() {
        let dir = TempDir::new().unwrap();
        // 2 lines: x = 1 -> constant + assignment; y = f(x) -> call + assignment
        std::fs::write(dir.path().join("calc.py"), "x = 1\ny = f(x)\n").unwrap();

        let ctx = EvalContext::new(Config::default(), SessionTranscript::default(), dir.path())
            .with_snapshot(FileSnapshot::new().with_file("calc.py", "x = 1\n"));
        let evaluator = ComplexityEvaluator::new(Arc::new(ScriptedCommandRunner::new()));

        let result = evaluator.evaluate(&ctx).await.unwrap();

        // density (1 + 1 + 2 + 1) / 2 = 2.5 -> 50
        assert!((result.score - 50.0).abs() < f64::EPSILON);
        match result.details {
            MetricDetails::Complexity(details) => {
                assert_eq!(details.detection, "snapshot");
                assert_eq!(details.files.len(), 1);
                assert_eq!(details.files[0].before_density, Some(2.0));
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }
}
