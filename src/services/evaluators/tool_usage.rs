//! Tool and rule usage: did the agent use what was available to it.
//!
//! Skills, sub-agents and MCP servers are *invoked*. Rules are *complied
//! with*, and only rules whose globs match a file the session touched are
//! judged at all.

use async_trait::async_trait;
use globset::{Glob, GlobSetBuilder};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{round1, Evaluator};
use crate::domain::errors::EvalError;
use crate::domain::models::{
    EvalContext, EvalResult, JudgeUsage, MetricDetails, MetricKind, MissedTool, RuleCompliance,
    RuleEntry, ToolUsageDetails, ToolUse, ToolsManifest, TranscriptChunk,
};
use crate::domain::ports::{JudgeClient, JudgeRequest};
use crate::services::chunk_synthesizer::merge_tool_usage;
use crate::services::judge_response::{extract_json, normalize};
use crate::services::prompts::{chunk_preamble, render_transcript};
use crate::services::transcript_chunker;

const NOT_EVALUATED: &str = "Not evaluated by judge";

const SYSTEM_PROMPT: &str = "You are auditing how an AI coding agent used the tools and \
project rules available to it during a session.

There are two kinds of items:
- TOOLS TO INVOKE (skills, sub-agents, MCP servers): report which ones the agent actually \
invoked and how often, and which ones it should have invoked for this task but did not.
- RULES TO COMPLY WITH: rules are never invoked. Judge whether the agent's OUTPUT (the code \
and files it produced) complies with each rule.

Respond with ONLY a JSON object in this exact shape:
{
  \"usedTools\": [{\"name\": \"<tool name>\", \"count\": 1}],
  \"missedTools\": [{\"name\": \"<tool name>\", \"reasoning\": \"<why it should have been used>\"}],
  \"ruleCompliance\": [{\"name\": \"<rule name>\", \"compliant\": true, \"reasoning\": \"<evidence>\"}],
  \"assessment\": \"<two or three sentences overall>\"
}
Use the exact names given. Report every listed rule. No prose outside the object.";

/// Rules that apply to this session.
///
/// Unscoped rules always apply. A scoped rule applies when any touched path
/// matches one of its globs, either as recorded or relative to the workspace.
/// A rule whose globs do not compile is kept rather than silently dropped.
pub fn applicable_rules<'a>(
    manifest: &'a ToolsManifest,
    touched: &[String],
    workspace: &Path,
) -> Vec<&'a RuleEntry> {
    let candidates: Vec<&Path> = touched
        .iter()
        .flat_map(|raw| {
            let path = Path::new(raw.as_str());
            let relative = path.strip_prefix(workspace).ok();
            std::iter::once(path).chain(relative)
        })
        .collect();

    manifest
        .rules
        .iter()
        .filter(|rule| {
            if !rule.is_scoped() {
                return true;
            }
            let mut builder = GlobSetBuilder::new();
            for pattern in &rule.globs {
                match Glob::new(pattern) {
                    Ok(glob) => {
                        builder.add(glob);
                    }
                    Err(e) => {
                        warn!(
                            rule = %rule.name,
                            pattern = %pattern,
                            error = %e,
                            "Invalid rule glob, treating rule as applicable"
                        );
                        return true;
                    }
                }
            }
            match builder.build() {
                Ok(set) => candidates.iter().any(|path| set.is_match(path)),
                Err(e) => {
                    warn!(
                        rule = %rule.name,
                        error = %e,
                        "Rule globs failed to compile, treating rule as applicable"
                    );
                    true
                }
            }
        })
        .collect()
}

fn string_field<'v>(object: &'v serde_json::Map<String, Value>, key: &str) -> Option<&'v str> {
    object.get(key).and_then(Value::as_str)
}

fn used_tool(entry: &Value) -> Option<ToolUse> {
    let object = entry.as_object()?;
    let count = match object.get("count") {
        None | Some(Value::Null) => 1,
        Some(value) => u32::try_from(value.as_u64()?).ok()?,
    };
    Some(ToolUse {
        name: string_field(object, "name")?.to_string(),
        count,
    })
}

fn missed_tool(entry: &Value) -> Option<MissedTool> {
    let object = entry.as_object()?;
    Some(MissedTool {
        name: string_field(object, "name")?.to_string(),
        reasoning: string_field(object, "reasoning").unwrap_or_default().to_string(),
    })
}

fn rule_compliance(entry: &Value) -> Option<RuleCompliance> {
    let object = entry.as_object()?;
    Some(RuleCompliance {
        name: string_field(object, "name")?.to_string(),
        compliant: object.get("compliant")?.as_bool()?,
        reasoning: string_field(object, "reasoning")?.to_string(),
    })
}

fn entries<T>(
    object: &serde_json::Map<String, Value>,
    key: &str,
    shape: fn(&Value) -> Option<T>,
) -> Vec<T> {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(shape).collect())
        .unwrap_or_default()
}

/// Parse a judge reply into usage details.
///
/// Returns `None` unless the reply is a JSON object. Entries with the wrong
/// shape are dropped; a used tool without a count counts once.
pub fn parse_tool_usage_response(content: &str) -> Option<ToolUsageDetails> {
    let value: Value = serde_json::from_str(&extract_json(content)).ok()?;
    let object = value.as_object()?;
    Some(ToolUsageDetails {
        used_tools: entries(object, "usedTools", used_tool),
        missed_tools: entries(object, "missedTools", missed_tool),
        rule_compliance: entries(object, "ruleCompliance", rule_compliance),
        available_tool_count: 0,
        assessment: string_field(object, "assessment").unwrap_or_default().to_string(),
        judge: JudgeUsage::default(),
    })
}

/// Every invocable tool missed and every rule failed.
fn fail_closed(manifest: &ToolsManifest, rules: &[&RuleEntry], reason: &str) -> ToolUsageDetails {
    ToolUsageDetails {
        used_tools: Vec::new(),
        missed_tools: manifest
            .invocable()
            .map(|(_, tool)| MissedTool {
                name: tool.name.clone(),
                reasoning: reason.to_string(),
            })
            .collect(),
        rule_compliance: rules
            .iter()
            .map(|rule| RuleCompliance {
                name: rule.name.clone(),
                compliant: false,
                reasoning: reason.to_string(),
            })
            .collect(),
        available_tool_count: manifest.invocable_count(),
        assessment: reason.to_string(),
        judge: JudgeUsage::default(),
    }
}

/// Restrict the merged report to known names.
///
/// Missed tools must name an invocable tool that was not also used, and take
/// the manifest spelling. Rule verdicts are mapped onto the applicable rules in
/// manifest order, and a rule the judge never reported fails.
fn reconcile(
    mut details: ToolUsageDetails,
    manifest: &ToolsManifest,
    rules: &[&RuleEntry],
) -> ToolUsageDetails {
    let invocable: HashMap<String, &str> = manifest
        .invocable()
        .map(|(_, tool)| (normalize(&tool.name), tool.name.as_str()))
        .collect();
    let used: HashSet<String> = details
        .used_tools
        .iter()
        .map(|tool| normalize(&tool.name))
        .collect();
    let mut seen = HashSet::new();
    let missed = std::mem::take(&mut details.missed_tools);
    details.missed_tools = missed
        .into_iter()
        .filter_map(|mut tool| {
            let key = normalize(&tool.name);
            let name = invocable.get(&key)?;
            if used.contains(&key) || !seen.insert(key) {
                return None;
            }
            tool.name = (*name).to_string();
            Some(tool)
        })
        .collect();

    let mut reported = std::mem::take(&mut details.rule_compliance);
    details.rule_compliance = rules
        .iter()
        .map(|rule| {
            let wanted = normalize(&rule.name);
            reported
                .iter()
                .position(|r| normalize(&r.name) == wanted)
                .map(|index| {
                    let mut verdict = reported.remove(index);
                    verdict.name.clone_from(&rule.name);
                    verdict
                })
                .unwrap_or_else(|| RuleCompliance {
                    name: rule.name.clone(),
                    compliant: false,
                    reasoning: NOT_EVALUATED.to_string(),
                })
        })
        .collect();
    details.available_tool_count = manifest.invocable_count();
    details
}

/// Blend of invocable-tool coverage and rule compliance, 50/50 when both exist.
pub fn tool_usage_score(details: &ToolUsageDetails) -> f64 {
    let tool_term = (details.available_tool_count > 0).then(|| {
        let missed = details.missed_tools.len().min(details.available_tool_count);
        100.0 - missed as f64 / details.available_tool_count as f64 * 100.0
    });
    let rule_term = (!details.rule_compliance.is_empty()).then(|| {
        let compliant = details.rule_compliance.iter().filter(|r| r.compliant).count();
        compliant as f64 / details.rule_compliance.len() as f64 * 100.0
    });

    let score = match (tool_term, rule_term) {
        (Some(tools), Some(rules)) => (tools + rules) / 2.0,
        (Some(tools), None) => tools,
        (None, Some(rules)) => rules,
        (None, None) => 100.0,
    };
    round1(score)
}

fn user_prompt(manifest: &ToolsManifest, rules: &[&RuleEntry], chunk: &TranscriptChunk) -> String {
    let mut out = chunk_preamble(chunk);
    out.push_str("TOOLS TO INVOKE:\n");
    if manifest.invocable_count() == 0 {
        out.push_str("(none)\n");
    }
    for (kind, tool) in manifest.invocable() {
        let _ = writeln!(out, "- [{kind}] {}: {}", tool.name, tool.summary);
    }

    out.push_str("\nRULES TO COMPLY WITH (judge the agent's output, not invocation):\n");
    if rules.is_empty() {
        out.push_str("(none)\n");
    }
    for rule in rules {
        let _ = writeln!(out, "- {}: {}", rule.name, rule.summary);
    }

    let _ = write!(out, "\nSESSION TRANSCRIPT:\n{}", render_transcript(&chunk.messages));
    out
}

/// Asks the judge which tools were used or missed and which rules were followed.
pub struct ToolUsageEvaluator {
    judge: Arc<dyn JudgeClient>,
}

impl ToolUsageEvaluator {
    pub fn new(judge: Arc<dyn JudgeClient>) -> Self {
        Self { judge }
    }
}

#[async_trait]
impl Evaluator for ToolUsageEvaluator {
    fn metric(&self) -> MetricKind {
        MetricKind::ToolUsage
    }

    async fn evaluate(&self, ctx: &EvalContext) -> Result<EvalResult, EvalError> {
        let manifest = &ctx.tools;
        let touched = ctx.transcript.touched_paths();
        let rules = applicable_rules(manifest, &touched, &ctx.workspace);
        debug!(
            invocable = manifest.invocable_count(),
            rules = rules.len(),
            skipped_rules = manifest.rules.len() - rules.len(),
            "Resolved tool usage manifest"
        );

        if manifest.invocable_count() == 0 && rules.is_empty() {
            return Ok(EvalResult::new(
                100.0,
                MetricDetails::ToolUsage(ToolUsageDetails::default()),
                "No tools or applicable rules were available; nothing to miss",
            ));
        }

        let judge_config = &ctx.config.judge;
        let chunks =
            transcript_chunker::chunk(&ctx.transcript.messages, judge_config.context_limit);
        let chunk_count = chunks.len();

        let mut per_chunk = Vec::with_capacity(chunk_count);
        for chunk in &chunks {
            let response = self
                .judge
                .query(JudgeRequest {
                    system_prompt: SYSTEM_PROMPT.to_string(),
                    user_prompt: user_prompt(manifest, &rules, chunk),
                    model: judge_config.model.clone(),
                    max_tokens: judge_config.max_tokens,
                })
                .await?;

            let mut details = parse_tool_usage_response(&response.content).unwrap_or_else(|| {
                warn!(chunk = chunk.chunk_index, "Judge tool usage reply was not a JSON object");
                fail_closed(
                    manifest,
                    &rules,
                    "Judge response could not be parsed as a JSON object",
                )
            });
            details.available_tool_count = manifest.invocable_count();
            details.judge = JudgeUsage {
                calls: 1,
                input_tokens: response.input_tokens,
                output_tokens: response.output_tokens,
            };
            per_chunk.push(details);
        }

        let details = reconcile(merge_tool_usage(per_chunk), manifest, &rules);
        let score = tool_usage_score(&details);

        let compliant = details.rule_compliance.iter().filter(|r| r.compliant).count();
        let mut reasoning = format!(
            "{} of {} tools used, {} missed; {}/{} applicable rules followed",
            details.used_tools.len(),
            details.available_tool_count,
            details.missed_tools.len(),
            compliant,
            details.rule_compliance.len()
        );
        if chunk_count > 1 {
            let _ = write!(reasoning, " (transcript judged in {chunk_count} parts)");
        }

        let result = EvalResult::new(score, MetricDetails::ToolUsage(details), reasoning);
        info!(
            metric = %result.metric,
            score = result.score,
            chunks = chunk_count,
            "Tool usage evaluated"
        );
        Ok(result)
    }
}
