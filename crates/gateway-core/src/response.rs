//! Response types returned from a provider call and from the OpenAI-
//! compatible wire surface.

use crate::request::ChatMessage;
use crate::types::{ProviderId, RequestId};
use serde::{Deserialize, Serialize};

/// Why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model reached a natural stopping point or a stop sequence.
    Stop,
    /// `max_tokens` was reached.
    Length,
    /// The model emitted tool/function calls.
    ToolCalls,
    /// Content was filtered by the provider.
    ContentFilter,
    /// The provider reported an error mid-generation.
    Error,
}

/// Token usage for one completion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    pub completion_tokens: u32,
    /// Sum of prompt and completion tokens.
    pub total_tokens: u32,
}

impl Usage {
    /// Construct from prompt/completion counts, computing the total.
    #[must_use]
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A single provider's response to an `LLMRequest` (data model §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    /// Response identifier.
    pub id: RequestId,
    /// The request this responds to.
    pub request_id: RequestId,
    /// The provider that produced this response.
    pub provider_name: ProviderId,
    /// Generated content.
    pub content: String,
    /// Provider- or ensemble-reported confidence, in `[0, 1]`.
    pub confidence: f32,
    /// Wall-clock latency of the provider call.
    pub latency_ms: u64,
    /// Token usage.
    pub usage: Usage,
    /// Optional reasoning trace, when the provider supplies one.
    pub reasoning: Option<String>,
    /// Why generation stopped.
    pub finish_reason: FinishReason,
}

/// Default confidence an adapter reports when the vendor API does not
/// supply one. Fixed per the open question in the design notes — never
/// inferred from other response fields.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

impl LLMResponse {
    /// Clamp `confidence` into `[0, 1]` defensively; construction sites
    /// should already satisfy this, but responses cross an adapter
    /// boundary we do not fully control.
    #[must_use]
    pub fn clamped_confidence(&self) -> f32 {
        self.confidence.clamp(0.0, 1.0)
    }
}

/// `GatewayResponse` is the OpenAI-compatible shape returned from the HTTP
/// surface; it wraps one or more choices plus usage, mirroring the wire
/// contract in spec §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// Response id (mirrors the request id for non-streaming calls).
    pub id: RequestId,
    /// Always `"chat.completion"`.
    pub object: String,
    /// Unix timestamp of creation.
    pub created: i64,
    /// Model that served the request.
    pub model: String,
    /// Completion choices (the gateway always returns exactly one).
    pub choices: Vec<Choice>,
    /// Aggregate token usage.
    pub usage: Usage,
}

/// One completion choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    /// Index within `choices`.
    pub index: u32,
    /// The generated message.
    pub message: ChatMessage,
    /// Why generation stopped.
    pub finish_reason: FinishReason,
}

/// `GET /v1/models` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelObject {
    /// Model id.
    pub id: String,
    /// Always `"model"`.
    pub object: String,
    /// Owning organization label.
    pub owned_by: String,
}

impl ModelObject {
    /// Construct a model object.
    pub fn new(id: impl Into<String>, owned_by: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: "model".to_string(),
            owned_by: owned_by.into(),
        }
    }
}

/// `GET /v1/models` response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    /// Always `"list"`.
    pub object: String,
    /// The model objects.
    pub data: Vec<ModelObject>,
}

impl ModelsResponse {
    /// Construct from the list of models.
    #[must_use]
    pub fn new(data: Vec<ModelObject>) -> Self {
        Self {
            object: "list".to_string(),
            data,
        }
    }
}
