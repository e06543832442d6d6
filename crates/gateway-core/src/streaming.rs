//! Server-sent-event chunk types for streaming completions.

use crate::response::{FinishReason, Usage};
use serde::{Deserialize, Serialize};

/// One SSE delta for a streaming chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChunk {
    /// Id shared across all chunks of one stream.
    pub id: String,
    /// Model that produced this chunk.
    pub model: String,
    /// The incremental choice delta.
    pub choices: Vec<ChunkChoice>,
    /// Present only on the final chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// One choice's delta within a `ChatChunk`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Index of the choice this delta belongs to.
    pub index: u32,
    /// The incremental content.
    pub delta: ChunkDelta,
    /// Set on the final chunk for this choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// Incremental content for one streaming chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Role, present only on the first chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Incremental text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}
