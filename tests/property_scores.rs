use arbiter::domain::models::{
    CriterionResult, EfficiencyConfig, MetricDetails, Role, SessionMetadata, TranscriptMessage,
};
use arbiter::domain::ports::CommandOutput;
use arbiter::services::evaluators::{
    complexity_score, fulfillment_score, parse_judge_response, CodeQualityEvaluator,
    EfficiencyEvaluator,
};
use arbiter::services::evaluators::functional::test_outcome;
use arbiter::services::transcript_chunker::{
    chunk, chunk_budget_chars, estimate_message_chars, needs_chunking,
};
use arbiter::EvalResult;
use proptest::prelude::*;

fn message_strategy() -> impl Strategy<Value = TranscriptMessage> {
    (
        prop_oneof![Just(Role::User), Just(Role::Assistant), Just(Role::System)],
        "[a-z ]{0,400}",
    )
        .prop_map(|(role, content)| TranscriptMessage::new(role, content))
}

proptest! {
    /// Property: efficiency stays within [0, 100] for any session metadata
    #[test]
    fn prop_efficiency_score_bounded(
        input_tokens in 0u64..10_000_000,
        output_tokens in 0u64..10_000_000,
        turn_count in 0u32..1_000,
        error_count in 0u32..1_000,
    ) {
        let metadata = SessionMetadata {
            input_tokens,
            output_tokens,
            turn_count,
            error_count,
            ..SessionMetadata::default()
        };
        let (score, details) = EfficiencyEvaluator::score(&metadata, &EfficiencyConfig::default());
        let result = EvalResult::new(score, MetricDetails::Efficiency(details), "");

        prop_assert!((0.0..=100.0).contains(&score));
        prop_assert!((score - result.score).abs() < f64::EPSILON);
    }

    /// Property: code quality is clamped into [0, 100] however many issues are found
    #[test]
    fn prop_code_quality_score_bounded(errors in 0u32..10_000, warnings in 0u32..10_000) {
        let raw = CodeQualityEvaluator::score(errors, warnings);
        let result = EvalResult::new(
            raw,
            MetricDetails::CodeQuality(Default::default()),
            "",
        );
        prop_assert!((0.0..=100.0).contains(&result.score));
        prop_assert!(raw <= 100.0);
    }

    /// Property: test scores derived from arbitrary output stay within [0, 100]
    #[test]
    fn prop_test_outcome_bounded(
        passed in any::<u32>(),
        failed in any::<u32>(),
        exit_code in -1i32..3,
    ) {
        let output =
            CommandOutput::completed(format!("{passed} passed, {failed} failed"), exit_code);
        let outcome = test_outcome(&output);
        prop_assert!((0.0..=100.0).contains(&outcome.score));
    }

    /// Property: complexity score is non-increasing in density
    #[test]
    fn prop_complexity_monotonic(
        a in 0.0f64..50.0,
        b in 0.0f64..50.0,
        threshold in 0.1f64..20.0,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(complexity_score(low, threshold) >= complexity_score(high, threshold));
        prop_assert!((complexity_score(0.0, threshold) - 100.0).abs() < 1e-9);
        prop_assert!(complexity_score(threshold, threshold).abs() < 1e-9);
        prop_assert!(complexity_score(threshold + high, threshold).abs() < 1e-9);
    }

    /// Property: chunking never splits or reorders messages
    ///
    /// Concatenating the chunks gives back the input exactly, and no chunk is
    /// empty.
    #[test]
    fn prop_chunks_are_turn_atomic(
        messages in prop::collection::vec(message_strategy(), 1..40),
        context_limit in 10usize..2_000,
    ) {
        let chunks = chunk(&messages, context_limit);

        let rejoined: Vec<TranscriptMessage> =
            chunks.iter().flat_map(|c| c.messages.clone()).collect();
        prop_assert_eq!(&rejoined, &messages);
        prop_assert!(chunks.iter().all(|c| !c.messages.is_empty()));
        prop_assert!(chunks
            .iter()
            .enumerate()
            .all(|(i, c)| c.chunk_index == i && c.total_chunks == chunks.len()));

        let budget = chunk_budget_chars(context_limit);
        for c in &chunks {
            let size: usize = c.messages.iter().map(estimate_message_chars).sum();
            prop_assert!(size <= budget || c.messages.len() == 1);
        }

        if !needs_chunking(&messages, context_limit) {
            prop_assert_eq!(chunks.len(), 1);
        }
    }

    /// Property: the judge reply is always reconciled to one entry per criterion
    #[test]
    fn prop_parse_judge_response_length(
        criteria in prop::collection::vec("[A-Za-z ]{1,30}", 0..8),
        reply in prop_oneof![
            ".*",
            Just("{\"criterion\": \"x\", \"passed\": true}".to_string()),
            Just("[{\"criterion\": \"a\", \"passed\": true, \"reasoning\": \"\"}]".to_string()),
            Just("```json\n[]\n```".to_string()),
        ],
    ) {
        let results = parse_judge_response(&reply, &criteria);

        prop_assert_eq!(results.len(), criteria.len());
        for (result, criterion) in results.iter().zip(&criteria) {
            prop_assert_eq!(&result.criterion, criterion);
        }
        let score = fulfillment_score(&results);
        prop_assert!((0.0..=100.0).contains(&score));
    }

    /// Property: fulfillment score is the pass ratio rounded to one decimal
    #[test]
    fn prop_fulfillment_score_ratio(passed in 0usize..50, failed in 0usize..50) {
        prop_assume!(passed + failed > 0);
        let results: Vec<CriterionResult> = (0..passed)
            .map(|i| CriterionResult::new(format!("p{i}"), true, ""))
            .chain((0..failed).map(|i| CriterionResult::failed(format!("f{i}"), "")))
            .collect();

        let expected = (passed as f64 / (passed + failed) as f64 * 1000.0).round() / 10.0;
        prop_assert!((fulfillment_score(&results) - expected).abs() < 1e-9);
    }
}
