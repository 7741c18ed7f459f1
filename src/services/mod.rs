pub mod chunk_synthesizer;
pub mod code_elements;
pub mod engine_context;
pub mod evaluators;
pub mod judge_response;
pub mod orchestrator;
pub mod output_parsing;
pub mod prompts;
pub mod touched_files;
pub mod transcript_chunker;

pub use chunk_synthesizer::{merge_fulfillment, merge_tool_usage};
pub use engine_context::EngineContext;
pub use evaluators::Evaluator;
pub use orchestrator::{EvaluationOrchestrator, EvaluationReport, MetricFailure};
