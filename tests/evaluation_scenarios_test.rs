//! End-to-end evaluation scenarios
//!
//! Drives the orchestrator with scripted commands and a scripted judge, the
//! way the CLI does with the real shell and HTTP judge.

use std::sync::Arc;

use arbiter::adapters::mock::{MockJudgeClient, ScriptedCommandRunner};
use arbiter::domain::errors::{JudgeApiError, JudgeError};
use arbiter::domain::models::{
    CommandSpec, Config, EvalContext, FileSnapshot, MetricDetails, MetricKind, SessionMetadata,
    SessionTranscript, ToolInvocation, TranscriptMessage,
};
use arbiter::services::{EngineContext, EvaluationOrchestrator};
use serde_json::json;
use tempfile::TempDir;

fn transcript() -> SessionTranscript {
    SessionTranscript::new(
        vec![
            TranscriptMessage::user("Add a login page with email validation and tests"),
            TranscriptMessage::assistant("Creating the form").with_tool_call(ToolInvocation::new(
                "Write",
                json!({"file_path": "src/login.tsx", "content": "export const Login = () => null;"}),
            )),
        ],
        SessionMetadata {
            input_tokens: 12_000,
            output_tokens: 3_000,
            turn_count: 2,
            ..SessionMetadata::default()
        },
    )
}

fn config() -> Config {
    let mut config = Config::default();
    config.metrics.code_quality.commands = vec![CommandSpec::new("npx eslint .")];
    config.metrics.functional.build = Some(CommandSpec::new("npm run build"));
    config.metrics.functional.test = Some(CommandSpec::new("npm test"));
    config.metrics.fulfillment.criteria = vec![
        "Adds a login form".to_string(),
        "Validates the email field".to_string(),
        "Includes unit tests".to_string(),
    ];
    config
}

fn runner() -> ScriptedCommandRunner {
    ScriptedCommandRunner::new()
        .with_output(
            "npx eslint .",
            "/ws/src/login.tsx\n  3:1  error  Unexpected var  no-var\n\n✖ 5 problems (3 errors, 2 warnings)\n",
            1,
        )
        .with_output("npm run build", "Compiled successfully", 0)
        .with_output("npm test", "8 passed, 2 failed", 1)
}

fn fulfillment_reply() -> &'static str {
    r#"Here is my evaluation:
```json
[
  {"criterion": "Adds a login form", "passed": true, "reasoning": "src/login.tsx written"},
  {"criterion": "validates the email field", "passed": true, "reasoning": "regex check present"},
  {"criterion": "Includes unit tests", "passed": false, "reasoning": "no test files created"}
]
```"#
}

fn orchestrator(
    judge: Arc<MockJudgeClient>,
    runner: ScriptedCommandRunner,
) -> EvaluationOrchestrator {
    EvaluationOrchestrator::new(EngineContext::new(judge, Arc::new(runner)))
}

#[tokio::test]
async fn test_eslint_summary_scores_66() {
    let ctx = EvalContext::new(config(), transcript(), "/ws");
    let report = orchestrator(Arc::new(MockJudgeClient::new()), runner())
        .run(&ctx, &[MetricKind::CodeQuality])
        .await;

    let result = &report.results[&MetricKind::CodeQuality];
    assert!((result.score - 66.0).abs() < f64::EPSILON);
    match &result.details {
        MetricDetails::CodeQuality(details) => {
            assert_eq!(details.total_errors, 3);
            assert_eq!(details.total_warnings, 2);
            assert_eq!(details.commands[0].pattern, "eslint-summary");
        }
        other => panic!("unexpected details: {other:?}"),
    }
}

#[tokio::test]
async fn test_build_and_tests_score_88() {
    let ctx = EvalContext::new(config(), transcript(), "/ws");
    let report = orchestrator(Arc::new(MockJudgeClient::new()), runner())
        .run(&ctx, &[MetricKind::FunctionalCorrectness])
        .await;

    let result = &report.results[&MetricKind::FunctionalCorrectness];
    assert!((result.score - 88.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_two_of_three_criteria_scores_66_7() {
    let judge = Arc::new(MockJudgeClient::with_responses([fulfillment_reply()]));
    let ctx = EvalContext::new(config(), transcript(), "/ws");
    let report = orchestrator(Arc::clone(&judge), runner())
        .run(&ctx, &[MetricKind::Fulfillment])
        .await;

    let result = &report.results[&MetricKind::Fulfillment];
    assert!((result.score - 66.7).abs() < 1e-9);
    assert_eq!(judge.call_count().await, 1);
    match &result.details {
        MetricDetails::Fulfillment(details) => {
            assert_eq!(details.criteria[1].criterion, "Validates the email field");
            assert_eq!(details.judge.input_tokens, 100);
            assert_eq!(details.judge.output_tokens, 20);
        }
        other => panic!("unexpected details: {other:?}"),
    }
}

#[tokio::test]
async fn test_long_transcript_is_chunked_and_merged_conservatively() {
    let mut config = config();
    config.metrics.fulfillment.criteria = vec!["Adds a login form".to_string()];
    config.judge.context_limit = 1_000; // 3,200-char budget

    let messages: Vec<TranscriptMessage> = (0..4)
        .map(|i| TranscriptMessage::assistant(format!("step {i} {}", "x".repeat(1_500))))
        .collect();
    let ctx = EvalContext::new(
        config,
        SessionTranscript::new(messages, SessionMetadata::default()),
        "/ws",
    );

    let judge = Arc::new(MockJudgeClient::with_responses([
        r#"[{"criterion": "Adds a login form", "passed": true, "reasoning": "form added"}]"#,
        r#"[{"criterion": "Adds a login form", "passed": false, "reasoning": "form removed again"}]"#,
    ]));
    let report = orchestrator(Arc::clone(&judge), runner())
        .run(&ctx, &[MetricKind::Fulfillment])
        .await;

    assert_eq!(judge.call_count().await, 2);
    let result = &report.results[&MetricKind::Fulfillment];
    assert!(result.score.abs() < f64::EPSILON);
    match &result.details {
        MetricDetails::Fulfillment(details) => {
            assert_eq!(details.chunks_evaluated, 2);
            assert_eq!(details.criteria[0].reasoning, "form removed again");
            assert_eq!(details.judge.calls, 2);
        }
        other => panic!("unexpected details: {other:?}"),
    }
}

#[tokio::test]
async fn test_garbage_judge_reply_fails_every_criterion() {
    let judge = Arc::new(MockJudgeClient::with_responses(["Sorry, I cannot help with that."]));
    let ctx = EvalContext::new(config(), transcript(), "/ws");
    let report = orchestrator(judge, runner())
        .run(&ctx, &[MetricKind::Fulfillment])
        .await;

    let result = &report.results[&MetricKind::Fulfillment];
    assert!(result.score.abs() < f64::EPSILON);
    match &result.details {
        MetricDetails::Fulfillment(details) => {
            assert_eq!(details.total_count, 3);
            assert_eq!(details.passed_count, 0);
        }
        other => panic!("unexpected details: {other:?}"),
    }
}

#[tokio::test]
async fn test_judge_outage_fails_only_judged_metrics() {
    let judge = Arc::new(MockJudgeClient::new());
    judge
        .push_error(JudgeError::RetriesExhausted {
            attempts: 4,
            source: JudgeApiError::ServerError(529, "overloaded".to_string()),
        })
        .await;
    let ctx = EvalContext::new(config(), transcript(), "/ws");

    let report = orchestrator(judge, runner())
        .run(
            &ctx,
            &[
                MetricKind::Efficiency,
                MetricKind::CodeQuality,
                MetricKind::FunctionalCorrectness,
                MetricKind::Fulfillment,
            ],
        )
        .await;

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.metric, MetricKind::Fulfillment);
    assert!(failure.message.contains("4 attempt"));
    assert!(!failure.hint.is_empty());
}

#[tokio::test]
async fn test_complexity_from_snapshot_workspace() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("calc.py"), "x = 1\ny = f(x)\n").unwrap();
    std::fs::write(dir.path().join("notes.md"), "# not code\n").unwrap();

    let ctx = EvalContext::new(config(), transcript(), dir.path())
        .with_snapshot(FileSnapshot::new().with_file("calc.py", "x = 1\n"));
    let report = orchestrator(Arc::new(MockJudgeClient::new()), ScriptedCommandRunner::new())
        .run(&ctx, &[MetricKind::Complexity])
        .await;

    let result = &report.results[&MetricKind::Complexity];
    assert!((result.score - 50.0).abs() < 1e-9);
    match &result.details {
        MetricDetails::Complexity(details) => {
            assert_eq!(details.detection, "snapshot");
            assert_eq!(details.files.len(), 1);
            assert_eq!(details.files[0].before_density, Some(2.0));
        }
        other => panic!("unexpected details: {other:?}"),
    }
}
