//! Merging of per-chunk judge verdicts into one result.
//!
//! Both merges are conservative: a failure in any chunk wins over passes in
//! others, and positive evidence of tool use wins over an earlier "missed".
//! A single chunk is returned unchanged.

use std::collections::{BTreeMap, HashSet};

use crate::domain::models::{
    CriterionResult, JudgeUsage, MissedTool, RuleCompliance, ToolUsageDetails, ToolUse,
};
use crate::services::judge_response::normalize;

/// Merge per-chunk criterion verdicts, worst result wins.
///
/// Criteria are grouped by exact text, in first-seen order. The reasoning of
/// the first failing verdict is kept; a criterion that always passed keeps the
/// first passing reasoning.
pub fn merge_fulfillment(chunks: Vec<Vec<CriterionResult>>) -> Vec<CriterionResult> {
    if chunks.len() == 1 {
        return chunks.into_iter().flatten().collect();
    }

    let mut merged: Vec<CriterionResult> = Vec::new();
    for result in chunks.into_iter().flatten() {
        match merged.iter_mut().find(|m| m.criterion == result.criterion) {
            Some(existing) => {
                if existing.passed && !result.passed {
                    *existing = result;
                }
            }
            None => merged.push(result),
        }
    }
    merged
}

/// Merge per-chunk tool usage reports.
///
/// Tool and rule names are compared after normalization; the first spelling
/// seen is kept.
pub fn merge_tool_usage(chunks: Vec<ToolUsageDetails>) -> ToolUsageDetails {
    if chunks.len() == 1 {
        if let Some(only) = chunks.into_iter().next() {
            return only;
        }
        return ToolUsageDetails::default();
    }

    let mut used: BTreeMap<String, ToolUse> = BTreeMap::new();
    let mut missed: Vec<MissedTool> = Vec::new();
    let mut seen_missed: HashSet<String> = HashSet::new();
    let mut rules: Vec<RuleCompliance> = Vec::new();
    let mut available_tool_count = 0;
    let mut judge = JudgeUsage::default();
    let mut assessments = Vec::with_capacity(chunks.len());

    for (index, chunk) in chunks.into_iter().enumerate() {
        for tool in chunk.used_tools {
            let entry = used.entry(normalize(&tool.name)).or_insert(ToolUse {
                name: tool.name,
                count: 0,
            });
            entry.count = entry.count.saturating_add(tool.count);
        }

        for tool in chunk.missed_tools {
            if seen_missed.insert(normalize(&tool.name)) {
                missed.push(tool);
            }
        }

        for rule in chunk.rule_compliance {
            let key = normalize(&rule.name);
            match rules.iter_mut().find(|r| normalize(&r.name) == key) {
                Some(existing) => {
                    if existing.compliant && !rule.compliant {
                        *existing = rule;
                    }
                }
                None => rules.push(rule),
            }
        }

        available_tool_count = available_tool_count.max(chunk.available_tool_count);
        judge = judge.add(chunk.judge);

        let assessment = chunk.assessment.trim();
        if !assessment.is_empty() {
            assessments.push(format!("[chunk {}] {}", index + 1, assessment));
        }
    }

    missed.retain(|tool| !used.contains_key(&normalize(&tool.name)));

    ToolUsageDetails {
        used_tools: used.into_values().collect(),
        missed_tools: missed,
        rule_compliance: rules,
        available_tool_count,
        assessment: assessments.join("\n"),
        judge,
    }
}
