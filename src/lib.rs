//! Arbiter - evaluation engine for recorded coding-agent sessions
//!
//! Arbiter turns a session transcript plus a metric configuration into 0-100
//! scores. Deterministic metrics run static analysis, tests and a code
//! complexity proxy; judged metrics ask an LLM, splitting transcripts that do
//! not fit its context and merging the partial verdicts conservatively.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, ports and errors
//! - **Service Layer** (`services`): Chunking, synthesis, parsing, evaluators, orchestration
//! - **Infrastructure Layer** (`infrastructure`): HTTP judge, shell runner, config, logging
//! - **Adapters** (`adapters`): In-memory doubles of the ports
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use arbiter::{ConfigLoader, EngineContext, EvaluationOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let engine = EngineContext::from_config(&config.judge)?;
//!     let report = EvaluationOrchestrator::new(engine).run(&ctx, &[]).await;
//!     println!("{:?}", report.overall_score());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{EvalError, JudgeApiError, JudgeError};
pub use domain::models::{
    Config, CriterionResult, EvalContext, EvalResult, FileSnapshot, MetricDetails, MetricKind,
    SessionTranscript, ToolUsageDetails, ToolsManifest, TranscriptChunk, TranscriptMessage,
};
pub use domain::ports::{CommandOutput, CommandRunner, JudgeClient, JudgeRequest, JudgeResponse};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{EngineContext, EvaluationOrchestrator, EvaluationReport};
