use serde::{Deserialize, Serialize};

use super::transcript::TranscriptMessage;

/// A contiguous, turn-atomic slice of a transcript sized for one judge call
///
/// Chunks only exist for the duration of a judged evaluation and are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptChunk {
    pub messages: Vec<TranscriptMessage>,
    /// 0-based position of this chunk
    pub chunk_index: usize,
    /// Number of chunks the transcript was split into
    pub total_chunks: usize,
}

impl TranscriptChunk {
    pub fn is_whole_transcript(&self) -> bool {
        self.total_chunks == 1
    }

    /// Human-facing label, 1-based: "part 2 of 3"
    pub fn label(&self) -> String {
        format!("part {} of {}", self.chunk_index + 1, self.total_chunks)
    }
}
