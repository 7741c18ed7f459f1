//! Transcript chunking for judge context budgets.
//!
//! Splits a transcript into contiguous, turn-atomic chunks that each fit the
//! judge's usable context. Sizes use a 4 chars/token heuristic; the usable
//! budget is 80% of the context limit, leaving room for the prompt scaffold.

use crate::domain::models::{TranscriptChunk, TranscriptMessage};

/// Approximate characters per token (conservative heuristic).
pub const CHARS_PER_TOKEN: usize = 4;

/// Share of the context limit available to transcript content, in percent.
const USABLE_CONTEXT_PERCENT: usize = 80;

/// Estimated character size of one message including its tool calls.
pub fn estimate_message_chars(message: &TranscriptMessage) -> usize {
    let tool_chars: usize = message
        .tool_calls
        .iter()
        .map(|call| {
            call.tool_name.len()
                + call.input.to_string().len()
                + call.output.as_ref().map_or(0, |o| o.to_string().len())
        })
        .sum();
    message.role.as_str().len() + message.content.len() + tool_chars
}

/// Estimated token size of a message sequence.
pub fn estimate_tokens(messages: &[TranscriptMessage]) -> usize {
    messages.iter().map(estimate_message_chars).sum::<usize>() / CHARS_PER_TOKEN
}

/// Character budget for one chunk given the judge's context limit in tokens.
pub fn chunk_budget_chars(context_limit: usize) -> usize {
    context_limit.saturating_mul(USABLE_CONTEXT_PERCENT) / 100 * CHARS_PER_TOKEN
}

/// Whether the transcript exceeds the usable budget.
pub fn needs_chunking(messages: &[TranscriptMessage], context_limit: usize) -> bool {
    let total: usize = messages.iter().map(estimate_message_chars).sum();
    total > chunk_budget_chars(context_limit)
}

/// Split messages into budget-bounded chunks without ever splitting a message.
///
/// A transcript that fits comes back as a single chunk equal to the input. A
/// message larger than the whole budget gets a chunk to itself.
pub fn chunk(messages: &[TranscriptMessage], context_limit: usize) -> Vec<TranscriptChunk> {
    if !needs_chunking(messages, context_limit) {
        return vec![TranscriptChunk {
            messages: messages.to_vec(),
            chunk_index: 0,
            total_chunks: 1,
        }];
    }

    let budget = chunk_budget_chars(context_limit);
    let mut groups: Vec<Vec<TranscriptMessage>> = Vec::new();
    let mut current: Vec<TranscriptMessage> = Vec::new();
    let mut current_chars = 0usize;

    for message in messages {
        let size = estimate_message_chars(message);
        if !current.is_empty() && current_chars + size > budget {
            groups.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        current.push(message.clone());
        current_chars += size;
    }
    if !current.is_empty() {
        groups.push(current);
    }

    let total_chunks = groups.len();
    tracing::debug!(
        message_count = messages.len(),
        total_chunks,
        budget_chars = budget,
        "Chunked transcript for judge"
    );

    groups
        .into_iter()
        .enumerate()
        .map(|(chunk_index, messages)| TranscriptChunk {
            messages,
            chunk_index,
            total_chunks,
        })
        .collect()
}
