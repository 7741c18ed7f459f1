//! Runs the selected evaluators against one context and collects the outcome.
//!
//! An infrastructure failure in one metric is recorded and the remaining
//! metrics still run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, Span};
use uuid::Uuid;

use crate::domain::models::{EvalContext, EvalResult, MetricKind};
use crate::services::engine_context::EngineContext;
use crate::services::evaluators::{
    CodeQualityEvaluator, ComplexityEvaluator, EfficiencyEvaluator, Evaluator,
    FulfillmentEvaluator, FunctionalEvaluator, ToolUsageEvaluator,
};

/// A metric that could not be computed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricFailure {
    pub metric: MetricKind,
    pub message: String,
    pub hint: String,
}

/// Everything one evaluation run produced
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: BTreeMap<MetricKind, EvalResult>,
    pub failures: Vec<MetricFailure>,
}

impl EvaluationReport {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            results: BTreeMap::new(),
            failures: Vec::new(),
        }
    }

    /// Mean of the successful scores, rounded to one decimal.
    pub fn overall_score(&self) -> Option<f64> {
        if self.results.is_empty() {
            return None;
        }
        let sum: f64 = self.results.values().map(|r| r.score).sum();
        Some((sum / self.results.len() as f64 * 10.0).round() / 10.0)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Default for EvaluationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EvaluationOrchestrator {
    engine: EngineContext,
}

impl EvaluationOrchestrator {
    pub fn new(engine: EngineContext) -> Self {
        Self { engine }
    }

    /// Build the evaluator for a metric, wired to the ports it needs.
    pub fn evaluator(&self, metric: MetricKind) -> Box<dyn Evaluator> {
        match metric {
            MetricKind::Efficiency => Box::new(EfficiencyEvaluator),
            MetricKind::CodeQuality => {
                Box::new(CodeQualityEvaluator::new(Arc::clone(&self.engine.runner)))
            }
            MetricKind::FunctionalCorrectness => {
                Box::new(FunctionalEvaluator::new(Arc::clone(&self.engine.runner)))
            }
            MetricKind::Complexity => {
                Box::new(ComplexityEvaluator::new(Arc::clone(&self.engine.runner)))
            }
            MetricKind::Fulfillment => {
                Box::new(FulfillmentEvaluator::new(Arc::clone(&self.engine.judge)))
            }
            MetricKind::ToolUsage => {
                Box::new(ToolUsageEvaluator::new(Arc::clone(&self.engine.judge)))
            }
        }
    }

    /// Evaluate `metrics` in order; an empty selection means the configured set.
    #[instrument(
        skip_all,
        fields(run_id = tracing::field::Empty, workspace = %ctx.workspace.display())
    )]
    pub async fn run(&self, ctx: &EvalContext, metrics: &[MetricKind]) -> EvaluationReport {
        let selected = if metrics.is_empty() {
            ctx.config.metrics.enabled.as_slice()
        } else {
            metrics
        };

        let mut report = EvaluationReport::new();
        Span::current().record("run_id", tracing::field::display(report.run_id));
        for &metric in selected {
            if report.results.contains_key(&metric)
                || report.failures.iter().any(|f| f.metric == metric)
            {
                continue;
            }

            let started = Instant::now();
            match self.evaluator(metric).evaluate(ctx).await {
                Ok(result) => {
                    info!(
                        metric = %metric,
                        score = result.score,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Metric complete"
                    );
                    report.results.insert(metric, result);
                }
                Err(e) => {
                    error!(metric = %metric, error = %e, "Metric failed");
                    report.failures.push(MetricFailure {
                        metric,
                        message: e.to_string(),
                        hint: e.hint().to_string(),
                    });
                }
            }
        }

        report.finished_at = Utc::now();
        info!(
            succeeded = report.results.len(),
            failed = report.failures.len(),
            overall = ?report.overall_score(),
            "Evaluation finished"
        );
        report
    }
}
