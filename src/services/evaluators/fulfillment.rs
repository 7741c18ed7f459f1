//! Requirement fulfillment: the judge checks each acceptance criterion.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::Evaluator;
use crate::domain::errors::EvalError;
use crate::domain::models::{
    CriterionResult, EvalContext, EvalResult, FulfillmentDetails, JudgeUsage, MetricDetails,
    MetricKind, TranscriptChunk, NEUTRAL_SCORE,
};
use crate::domain::ports::{JudgeClient, JudgeRequest};
use crate::services::chunk_synthesizer::merge_fulfillment;
use crate::services::judge_response::{extract_json, normalize};
use crate::services::prompts::{chunk_preamble, render_transcript};
use crate::services::transcript_chunker;

const NOT_EVALUATED: &str = "Not evaluated by judge";

const SYSTEM_PROMPT: &str = "You are a strict reviewer judging whether an AI coding agent \
fulfilled a task. You will be given the task, a numbered list of acceptance criteria and the \
agent's session transcript.

For EVERY criterion decide whether the transcript shows it was met. Mark a criterion passed \
only when there is concrete evidence for it.

Respond with ONLY a JSON array, one object per criterion, in this exact shape:
[
  {\"criterion\": \"<criterion text exactly as given>\", \"passed\": true, \"reasoning\": \"<one or two sentences>\"}
]
No prose before or after the array.";

/// `round(passed / total * 1000) / 10`; 0 for no criteria.
pub fn fulfillment_score(results: &[CriterionResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let passed = results.iter().filter(|r| r.passed).count() as f64;
    (passed / results.len() as f64 * 1000.0).round() / 10.0
}

struct JudgedCriterion {
    text: String,
    passed: bool,
    reasoning: String,
}

/// Accept an entry only when it has the documented shape.
fn judged_criterion(entry: &Value) -> Option<JudgedCriterion> {
    let object = entry.as_object()?;
    Some(JudgedCriterion {
        text: object.get("criterion")?.as_str()?.to_string(),
        passed: object.get("passed")?.as_bool()?,
        reasoning: object
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

/// Reconcile a judge reply to the configured criteria.
///
/// Always returns exactly one result per configured criterion, in configured
/// order. Judge text is matched case- and whitespace-insensitively, then by
/// containment. Anything unparseable or unmatched fails.
pub fn parse_judge_response(content: &str, criteria: &[String]) -> Vec<CriterionResult> {
    let parsed: Result<Value, _> = serde_json::from_str(&extract_json(content));
    let entries = match parsed {
        Ok(Value::Array(entries)) => entries,
        Ok(other) => {
            let kind = match other {
                Value::Object(_) => "an object",
                Value::String(_) => "a string",
                _ => "not an array",
            };
            warn!(kind, "Judge fulfillment reply was not a JSON array");
            return criteria
                .iter()
                .map(|c| {
                    CriterionResult::failed(
                        c,
                        format!("Judge response was {kind}, expected a JSON array"),
                    )
                })
                .collect();
        }
        Err(e) => {
            warn!(error = %e, "Judge fulfillment reply was not valid JSON");
            return criteria
                .iter()
                .map(|c| {
                    CriterionResult::failed(c, format!("Judge response could not be parsed: {e}"))
                })
                .collect();
        }
    };

    let mut judged: Vec<Option<JudgedCriterion>> =
        entries.iter().map(judged_criterion).filter(Option::is_some).collect();
    let wanted: Vec<String> = criteria.iter().map(|c| normalize(c)).collect();

    // Exact matches claim their entries before any containment match runs.
    let mut found: Vec<Option<JudgedCriterion>> = wanted
        .iter()
        .map(|w| {
            if w.is_empty() {
                None
            } else {
                take_match(&mut judged, |text| text == w.as_str())
            }
        })
        .collect();
    for (slot, w) in found.iter_mut().zip(&wanted) {
        if slot.is_none() && !w.is_empty() {
            *slot = take_match(&mut judged, |text| {
                !text.is_empty() && (w.contains(text) || text.contains(w.as_str()))
            });
        }
    }

    criteria
        .iter()
        .zip(found)
        .map(|(criterion, found)| match found {
            Some(j) => CriterionResult::new(criterion, j.passed, j.reasoning),
            None => CriterionResult::failed(criterion, NOT_EVALUATED),
        })
        .collect()
}

/// Remove and return the first unused judge entry whose normalized text matches.
fn take_match(
    judged: &mut [Option<JudgedCriterion>],
    matches: impl Fn(&str) -> bool,
) -> Option<JudgedCriterion> {
    judged
        .iter_mut()
        .find(|slot| slot.as_ref().is_some_and(|j| matches(&normalize(&j.text))))
        .and_then(Option::take)
}

fn user_prompt(task: Option<&str>, criteria: &[String], chunk: &TranscriptChunk) -> String {
    let task = task.unwrap_or("(no task statement recorded)");
    let numbered = criteria
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {c}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{}TASK:\n{task}\n\nACCEPTANCE CRITERIA:\n{numbered}\n\nSESSION TRANSCRIPT:\n{}",
        chunk_preamble(chunk),
        render_transcript(&chunk.messages)
    )
}

/// Asks the judge to verify each configured acceptance criterion.
pub struct FulfillmentEvaluator {
    judge: Arc<dyn JudgeClient>,
}

impl FulfillmentEvaluator {
    pub fn new(judge: Arc<dyn JudgeClient>) -> Self {
        Self { judge }
    }
}

#[async_trait]
impl Evaluator for FulfillmentEvaluator {
    fn metric(&self) -> MetricKind {
        MetricKind::Fulfillment
    }

    async fn evaluate(&self, ctx: &EvalContext) -> Result<EvalResult, EvalError> {
        let config = &ctx.config.metrics.fulfillment;
        if config.criteria.is_empty() {
            return Ok(EvalResult::new(
                NEUTRAL_SCORE,
                MetricDetails::Fulfillment(FulfillmentDetails::default()),
                "No acceptance criteria configured; neutral score",
            ));
        }

        let judge_config = &ctx.config.judge;
        let chunks =
            transcript_chunker::chunk(&ctx.transcript.messages, judge_config.context_limit);
        let chunks_evaluated = chunks.len();

        let mut usage = JudgeUsage::default();
        let mut per_chunk = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let response = self
                .judge
                .query(JudgeRequest {
                    system_prompt: SYSTEM_PROMPT.to_string(),
                    user_prompt: user_prompt(config.task.as_deref(), &config.criteria, chunk),
                    model: judge_config.model.clone(),
                    max_tokens: judge_config.max_tokens,
                })
                .await?;
            debug!(
                chunk = chunk.chunk_index,
                tokens = response.output_tokens,
                "Fulfillment chunk judged"
            );

            usage = usage.add(JudgeUsage {
                calls: 1,
                input_tokens: response.input_tokens,
                output_tokens: response.output_tokens,
            });
            per_chunk.push(parse_judge_response(&response.content, &config.criteria));
        }

        let criteria = merge_fulfillment(per_chunk);
        let score = fulfillment_score(&criteria);
        let mut details = FulfillmentDetails::from_criteria(criteria);
        details.chunks_evaluated = chunks_evaluated;
        details.judge = usage;

        let failed: Vec<&str> = details
            .criteria
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.criterion.as_str())
            .collect();
        let mut reasoning = format!(
            "{}/{} criteria met",
            details.passed_count, details.total_count
        );
        if !failed.is_empty() {
            reasoning.push_str(&format!("; unmet: {}", failed.join(", ")));
        }
        if chunks_evaluated > 1 {
            reasoning.push_str(&format!(" (transcript judged in {chunks_evaluated} parts)"));
        }

        let result = EvalResult::new(score, MetricDetails::Fulfillment(details), reasoning);
        info!(
            metric = %result.metric,
            score = result.score,
            chunks = chunks_evaluated,
            "Fulfillment evaluated"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockJudgeClient;
    use crate::domain::errors::{JudgeApiError, JudgeError};
    use crate::domain::models::{Config, SessionMetadata, SessionTranscript, TranscriptMessage};

    fn criteria() -> Vec<String> {
        vec![
            "Adds a login form".to_string(),
            "Validates the email field".to_string(),
            "Includes unit tests".to_string(),
        ]
    }

    fn context(criteria: Vec<String>, messages: Vec<TranscriptMessage>) -> EvalContext {
        let mut config = Config::default();
        config.metrics.fulfillment.criteria = criteria;
        EvalContext::new(
            config,
            SessionTranscript::new(messages, SessionMetadata::default()),
            "/tmp/workspace",
        )
    }

    #[test]
    fn test_parse_fenced_array_with_paraphrase() {
        let reply = r#"```json
[
  {"criterion": "adds a LOGIN   form", "passed": true, "reasoning": "LoginForm.tsx created"},
  {"criterion": "Validates the email field", "passed": false, "reasoning": "no validation"}
]
```"#;
        let results = parse_judge_response(reply, &criteria());

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].criterion, "Adds a login form");
        assert!(results[0].passed);
        assert!(!results[1].passed);
        assert_eq!(results[2].reasoning, NOT_EVALUATED);
        assert!(!results[2].passed);
    }

    #[test]
    fn test_parse_containment_fallback() {
        let reply = r#"[{"criterion": "Includes unit tests for the form", "passed": true, "reasoning": "yes"}]"#;
        let results = parse_judge_response(reply, &criteria());
        assert!(results[2].passed);
    }

    #[test]
    fn test_parse_garbage_fails_every_criterion() {
        for reply in ["I'm sorry, I can't do that", r#"{"criterion": "x"}"#, "", "[1, 2"] {
            let results = parse_judge_response(reply, &criteria());
            assert_eq!(results.len(), 3, "reply: {reply}");
            assert!(results.iter().all(|r| !r.passed), "reply: {reply}");
        }
    }

    #[test]
    fn test_exact_match_is_not_claimed_by_shorter_criterion() {
        let criteria = vec!["Adds tests".to_string(), "Adds tests for the API".to_string()];
        let reply = r#"[{"criterion": "Adds tests for the API", "passed": true, "reasoning": "api tests"}]"#;
        let results = parse_judge_response(reply, &criteria);

        assert!(!results[0].passed);
        assert_eq!(results[0].reasoning, NOT_EVALUATED);
        assert!(results[1].passed);
        assert_eq!(results[1].reasoning, "api tests");
    }

    #[test]
    fn test_blank_criterion_never_matches() {
        let criteria = vec!["   ".to_string()];
        let reply = r#"[{"criterion": "Anything at all", "passed": true, "reasoning": "ok"}]"#;
        let results = parse_judge_response(reply, &criteria);
        assert!(!results[0].passed);
        assert_eq!(results[0].reasoning, NOT_EVALUATED);
    }

    #[test]
    fn test_parse_skips_malformed_entries() {
        let reply = r#"[{"criterion": "Adds a login form", "passed": "yes"}, {"criterion": "Adds a login form", "passed": true}]"#;
        let results = parse_judge_response(reply, &criteria());
        assert!(results[0].passed);
        assert_eq!(results[0].reasoning, "");
    }

    #[test]
    fn test_score_rounding() {
        let results = vec![
            CriterionResult::new("a", true, ""),
            CriterionResult::new("b", true, ""),
            CriterionResult::new("c", false, ""),
        ];
        assert!((fulfillment_score(&results) - 66.7).abs() < 1e-9);
        assert!(fulfillment_score(&[]).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_evaluate_single_call() {
        let judge = Arc::new(MockJudgeClient::with_responses([r#"[
            {"criterion": "Adds a login form", "passed": true, "reasoning": "done"},
            {"criterion": "Validates the email field", "passed": true, "reasoning": "regex added"},
            {"criterion": "Includes unit tests", "passed": false, "reasoning": "none written"}
        ]"#]));
        let evaluator = FulfillmentEvaluator::new(judge.clone());

        let result = evaluator
            .evaluate(&context(criteria(), vec![TranscriptMessage::user("Build a login page")]))
            .await
            .unwrap();

        assert!((result.score - 66.7).abs() < 1e-9);
        assert_eq!(judge.call_count().await, 1);
        let request = &judge.requests().await[0];
        assert!(request.user_prompt.contains("3. Includes unit tests"));
        assert!(request.user_prompt.contains("Build a login page"));
        match result.details {
            MetricDetails::Fulfillment(details) => {
                assert_eq!(details.judge.calls, 1);
                assert_eq!(details.chunks_evaluated, 1);
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_evaluate_chunked_worst_result_wins() {
        let judge = Arc::new(MockJudgeClient::with_responses([
            r#"[{"criterion": "Adds a login form", "passed": true, "reasoning": "form added"}]"#,
            r#"[{"criterion": "Adds a login form", "passed": false, "reasoning": "form deleted later"}]"#,
        ]));
        let evaluator = FulfillmentEvaluator::new(judge.clone());

        let mut ctx = context(
            vec!["Adds a login form".to_string()],
            vec![
                TranscriptMessage::user("x".repeat(300)),
                TranscriptMessage::assistant("y".repeat(300)),
            ],
        );
        // 320-char budget forces one message per chunk
        ctx.config.judge.context_limit = 100;

        let result = evaluator.evaluate(&ctx).await.unwrap();

        assert_eq!(judge.call_count().await, 2);
        assert!(result.score.abs() < f64::EPSILON);
        assert!(judge.requests().await[1].user_prompt.contains("part 2 of 2"));
        match result.details {
            MetricDetails::Fulfillment(details) => {
                assert_eq!(details.criteria[0].reasoning, "form deleted later");
                assert_eq!(details.chunks_evaluated, 2);
                assert_eq!(details.judge.calls, 2);
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_criteria_is_neutral_without_judge_call() {
        let judge = Arc::new(MockJudgeClient::new());
        let evaluator = FulfillmentEvaluator::new(judge.clone());

        let result = evaluator.evaluate(&context(vec![], vec![])).await.unwrap();

        assert!((result.score - NEUTRAL_SCORE).abs() < f64::EPSILON);
        assert_eq!(judge.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_judge_failure_propagates() {
        let judge = Arc::new(MockJudgeClient::new());
        judge
            .push_error(JudgeError::RetriesExhausted {
                attempts: 4,
                source: JudgeApiError::ServerError(503, "unavailable".to_string()),
            })
            .await;
        let evaluator = FulfillmentEvaluator::new(judge);

        let err = evaluator
            .evaluate(&context(criteria(), vec![TranscriptMessage::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::Judge(JudgeError::RetriesExhausted { .. })));
    }
}
