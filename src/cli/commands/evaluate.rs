//! Implementation of the `arbiter evaluate` command.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{
    Config, EvalContext, EvalResult, FileSnapshot, MetricKind, SessionTranscript, ToolsManifest,
};
use crate::services::{EngineContext, EvaluationOrchestrator, MetricFailure};

const REASONING_WIDTH: usize = 80;

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Recorded session transcript (JSON)
    #[arg(short, long)]
    pub session: PathBuf,

    /// Workspace the agent worked in
    #[arg(short, long, default_value = ".")]
    pub workspace: PathBuf,

    /// Tools manifest listing skills, rules, sub-agents and MCP servers (JSON)
    #[arg(short, long)]
    pub tools: Option<PathBuf>,

    /// Pre-change file snapshot, keyed by workspace-relative path (JSON)
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Metric to run; repeat for several. Defaults to metrics.enabled
    #[arg(short, long = "metric")]
    pub metrics: Vec<MetricKind>,
}

#[derive(Debug, serde::Serialize)]
pub struct EvaluateOutput {
    pub success: bool,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub overall_score: Option<f64>,
    pub results: Vec<EvalResult>,
    pub failures: Vec<MetricFailure>,
}

impl CommandOutput for EvaluateOutput {
    fn to_human(&self) -> String {
        let elapsed_ms = (self.finished_at - self.started_at).num_milliseconds();
        let mut lines = vec![format!("Run {} ({elapsed_ms} ms)\n", self.run_id)];

        if !self.results.is_empty() {
            let mut table = Table::new();
            table
                .load_preset(presets::NOTHING)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(["METRIC", "SCORE", "REASONING"].map(|h| {
                    Cell::new(h).set_alignment(CellAlignment::Left)
                }));
            for result in &self.results {
                table.add_row(vec![
                    Cell::new(result.metric),
                    Cell::new(format!("{:.1}", result.score)).set_alignment(CellAlignment::Right),
                    Cell::new(truncate(&result.reasoning, REASONING_WIDTH)),
                ]);
            }
            lines.push(table.to_string());
        }

        if !self.failures.is_empty() {
            lines.push(format!("\n{} metric(s) failed:", self.failures.len()));
            for failure in &self.failures {
                lines.push(format!("  - {}: {}", failure.metric, failure.message));
                lines.push(format!("    hint: {}", failure.hint));
            }
        }

        match self.overall_score {
            Some(score) => lines.push(format!("\nOverall: {score:.1}")),
            None => lines.push("\nNo metric produced a score.".to_string()),
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {what} from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {what} in {}", path.display()))
}

/// Resolve the inputs into an evaluation context.
pub async fn load_context(args: &EvaluateArgs, config: Config) -> Result<EvalContext> {
    let workspace = fs::canonicalize(&args.workspace)
        .await
        .with_context(|| format!("Workspace {} does not exist", args.workspace.display()))?;
    anyhow::ensure!(
        workspace.is_dir(),
        "Workspace {} is not a directory",
        workspace.display()
    );

    let transcript: SessionTranscript = read_json(&args.session, "session transcript").await?;
    let mut ctx = EvalContext::new(config, transcript, workspace);

    if let Some(path) = &args.tools {
        let tools: ToolsManifest = read_json(path, "tools manifest").await?;
        ctx = ctx.with_tools(tools);
    }
    if let Some(path) = &args.snapshot {
        let snapshot: FileSnapshot = read_json(path, "file snapshot").await?;
        ctx = ctx.with_snapshot(snapshot);
    }
    Ok(ctx)
}

pub async fn execute(
    args: EvaluateArgs,
    config: Config,
    engine: EngineContext,
    json_mode: bool,
) -> Result<()> {
    let ctx = load_context(&args, config).await?;
    info!(
        session = %args.session.display(),
        messages = ctx.transcript.messages.len(),
        "Evaluating session"
    );

    let report = EvaluationOrchestrator::new(engine).run(&ctx, &args.metrics).await;

    let output_data = EvaluateOutput {
        success: report.is_complete(),
        run_id: report.run_id,
        started_at: report.started_at,
        finished_at: report.finished_at,
        overall_score: report.overall_score(),
        results: report.results.into_values().collect(),
        failures: report.failures,
    };
    output(&output_data, json_mode);
    Ok(())
}
