//! Rendering of transcripts and chunk preambles for judge prompts.

use std::fmt::Write as _;

use crate::domain::models::{TranscriptChunk, TranscriptMessage};

/// Longest tool input or output echoed into a prompt, in characters
const MAX_TOOL_PAYLOAD_CHARS: usize = 2_000;

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars).collect();
    format!("{kept}... [truncated]")
}

/// Render messages as a readable, turn-delimited transcript.
pub fn render_transcript(messages: &[TranscriptMessage]) -> String {
    let mut out = String::new();
    for (index, message) in messages.iter().enumerate() {
        let _ = writeln!(out, "--- turn {} [{}] ---", index + 1, message.role);
        if !message.content.is_empty() {
            let _ = writeln!(out, "{}", message.content);
        }
        for call in &message.tool_calls {
            let _ = writeln!(
                out,
                "[tool call] {} input={}",
                call.tool_name,
                truncate(&call.input.to_string(), MAX_TOOL_PAYLOAD_CHARS)
            );
            if let Some(output) = &call.output {
                let _ = writeln!(
                    out,
                    "[tool result] {}",
                    truncate(&output.to_string(), MAX_TOOL_PAYLOAD_CHARS)
                );
            }
        }
    }
    out
}

/// Framing for one segment of a split transcript; empty for a whole transcript.
pub fn chunk_preamble(chunk: &TranscriptChunk) -> String {
    if chunk.is_whole_transcript() {
        return String::new();
    }
    format!(
        "NOTE: The session transcript was too long for one review and has been split. \
         You are seeing {} only. Earlier or later parts are reviewed separately. \
         Judge only from evidence in this part: do not fail an item merely because it is \
         not visible here, fail it only when this part shows contrary evidence.\n\n",
        chunk.label()
    )
}
