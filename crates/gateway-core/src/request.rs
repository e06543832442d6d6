//! Request types for the gateway.
//!
//! `GatewayRequest` is the unified request format (data model's
//! `LLMRequest`) that abstracts across all LLM providers and carries the
//! OpenAI-compatible wire fields plus the ensemble/cache extensions.

use crate::error::GatewayError;
use crate::types::{MaxTokens, ModelId, RequestId, Temperature, TopK, TopP};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unified gateway request that abstracts all providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    /// Unique request identifier
    #[serde(default = "RequestId::generate")]
    pub id: RequestId,

    /// Target model (e.g., "gpt-4", "claude-3-opus")
    pub model: String,

    /// Chat messages for conversation. Populated from `prompt` when the
    /// `/v1/completions` wire shape is used instead of chat messages.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    /// Legacy single-string prompt, accepted for `/v1/completions`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Top-p (nucleus sampling) parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Top-k sampling parameter (provider-specific)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,

    /// Enable streaming response
    #[serde(default)]
    pub stream: bool,

    /// Provider-specific parameter overrides, passed through verbatim.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub provider_params: HashMap<String, serde_json::Value>,

    /// Ensemble configuration; absent means "single best provider, no
    /// debate" (equivalent to `strategy: parallel, min_providers: 1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensemble: Option<EnsembleConfig>,

    /// Query embedding for the semantic cache, dimension `D` fixed by the
    /// cache configuration. Absent means the request bypasses the cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_embedding: Option<Vec<f32>>,

    /// Request metadata for routing/billing/log correlation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RequestMetadata>,
}

/// Ensemble execution configuration (request-scoped override of the
/// service default).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Selection/aggregation strategy.
    #[serde(default)]
    pub strategy: EnsembleStrategy,
    /// Minimum number of healthy providers required to proceed.
    #[serde(default = "default_min_providers")]
    pub min_providers: usize,
    /// Maximum number of providers to fan out to.
    #[serde(default = "default_max_providers")]
    pub max_providers: usize,
    /// Confidence threshold used by `sequential` to stop early.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    /// Per-provider deadline for this ensemble run.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_min_providers() -> usize {
    1
}
fn default_max_providers() -> usize {
    3
}
fn default_confidence_threshold() -> f32 {
    0.7
}
fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            strategy: EnsembleStrategy::default(),
            min_providers: default_min_providers(),
            max_providers: default_max_providers(),
            confidence_threshold: default_confidence_threshold(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Ensemble selection strategy (component F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsembleStrategy {
    /// Fan out to all candidates, pick the argmax composite score.
    #[default]
    Parallel,
    /// Call providers one at a time, stop at the first response meeting
    /// the confidence threshold.
    Sequential,
    /// Same selection as `Parallel`; the name documents intent at the
    /// wire layer (both resolve to an argmax over composite score).
    ConfidenceWeighted,
    /// Bucket by normalized content, pick the largest bucket.
    MajorityVote,
}

impl GatewayRequest {
    /// Create a new builder for `GatewayRequest`
    #[must_use]
    pub fn builder() -> GatewayRequestBuilder {
        GatewayRequestBuilder::default()
    }

    /// Get validated temperature
    ///
    /// # Errors
    /// Returns error if temperature is out of range
    pub fn validated_temperature(&self) -> Result<Option<Temperature>, GatewayError> {
        self.temperature.map(Temperature::new).transpose()
    }

    /// Get validated max_tokens
    ///
    /// # Errors
    /// Returns error if max_tokens is out of range
    pub fn validated_max_tokens(&self) -> Result<Option<MaxTokens>, GatewayError> {
        self.max_tokens.map(MaxTokens::new).transpose()
    }

    /// Get validated top_p
    ///
    /// # Errors
    /// Returns error if top_p is out of range
    pub fn validated_top_p(&self) -> Result<Option<TopP>, GatewayError> {
        self.top_p.map(TopP::new).transpose()
    }

    /// Get validated top_k
    ///
    /// # Errors
    /// Returns error if top_k is out of range
    pub fn validated_top_k(&self) -> Result<Option<TopK>, GatewayError> {
        self.top_k.map(TopK::new).transpose()
    }

    /// Get validated model ID
    ///
    /// # Errors
    /// Returns error if model ID is invalid
    pub fn validated_model(&self) -> Result<ModelId, GatewayError> {
        ModelId::new(&self.model)
    }

    /// Validate the entire request, including the embedding dimension
    /// against `expected_embedding_dim` when both are present.
    ///
    /// # Errors
    /// Returns error if any field is invalid.
    pub fn validate(&self, expected_embedding_dim: Option<usize>) -> Result<(), GatewayError> {
        self.validated_model()?;

        if self.messages.is_empty() && self.prompt.is_none() {
            return Err(GatewayError::invalid_request(
                "either messages or prompt must be provided",
                Some("messages"),
            ));
        }

        self.validated_temperature()?;
        self.validated_max_tokens()?;
        self.validated_top_p()?;
        self.validated_top_k()?;

        if let (Some(dim), Some(embedding)) = (expected_embedding_dim, &self.query_embedding) {
            if embedding.len() != dim {
                return Err(GatewayError::invalid_request(
                    format!(
                        "query_embedding has dimension {}, expected {dim}",
                        embedding.len()
                    ),
                    Some("query_embedding"),
                ));
            }
        }

        if let Some(ensemble) = &self.ensemble {
            if !(0.0..=1.0).contains(&ensemble.confidence_threshold) {
                return Err(GatewayError::invalid_request(
                    "ensemble.confidence_threshold must be in [0, 1]",
                    Some("ensemble.confidence_threshold"),
                ));
            }
        }

        Ok(())
    }

    /// Messages to send, synthesizing a single user message from `prompt`
    /// when the legacy completions shape was used.
    #[must_use]
    pub fn effective_messages(&self) -> Vec<ChatMessage> {
        if !self.messages.is_empty() {
            return self.messages.clone();
        }
        match &self.prompt {
            Some(p) => vec![ChatMessage::user(p.clone())],
            None => Vec::new(),
        }
    }
}

/// Builder for `GatewayRequest`
#[derive(Debug, Default)]
pub struct GatewayRequestBuilder {
    id: Option<RequestId>,
    model: Option<String>,
    messages: Vec<ChatMessage>,
    prompt: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    top_p: Option<f32>,
    top_k: Option<u32>,
    stop: Option<Vec<String>>,
    stream: bool,
    ensemble: Option<EnsembleConfig>,
    query_embedding: Option<Vec<f32>>,
    metadata: Option<RequestMetadata>,
}

impl GatewayRequestBuilder {
    /// Set the request ID
    #[must_use]
    pub fn id(mut self, id: RequestId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the model
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the messages
    #[must_use]
    pub fn messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    /// Add a message
    #[must_use]
    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Set the legacy prompt field
    #[must_use]
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Set the temperature
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max_tokens
    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set top_p
    #[must_use]
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set top_k
    #[must_use]
    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Set stop sequences
    #[must_use]
    pub fn stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Enable streaming
    #[must_use]
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Set the ensemble configuration
    #[must_use]
    pub fn ensemble(mut self, ensemble: EnsembleConfig) -> Self {
        self.ensemble = Some(ensemble);
        self
    }

    /// Set the query embedding
    #[must_use]
    pub fn query_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.query_embedding = Some(embedding);
        self
    }

    /// Set metadata
    #[must_use]
    pub fn metadata(mut self, metadata: RequestMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Build the request
    ///
    /// # Errors
    /// Returns error if required fields are missing or invalid.
    pub fn build(self) -> Result<GatewayRequest, GatewayError> {
        let model = self.model.ok_or_else(|| {
            GatewayError::invalid_request("model is required", Some("model"))
        })?;

        if self.messages.is_empty() && self.prompt.is_none() {
            return Err(GatewayError::invalid_request(
                "either messages or prompt is required",
                Some("messages"),
            ));
        }

        let request = GatewayRequest {
            id: self.id.unwrap_or_else(RequestId::generate),
            model,
            messages: self.messages,
            prompt: self.prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            top_k: self.top_k,
            stop: self.stop,
            stream: self.stream,
            provider_params: HashMap::new(),
            ensemble: self.ensemble,
            query_embedding: self.query_embedding,
            metadata: self.metadata,
        };

        request.validate(None)?;

        Ok(request)
    }
}

/// Chat message with role and content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message author
    pub role: MessageRole,

    /// Content of the message
    pub content: MessageContent,

    /// Optional name of the author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Tool calls made by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// Tool call ID for tool response messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text(content.into()),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(content.into()),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Text(content.into()),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a tool response message
    #[must_use]
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: MessageContent::Text(content.into()),
            name: None,
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Get the text content if available
    #[must_use]
    pub fn text_content(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(s) => Some(s),
            MessageContent::Parts(_) => None,
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
    /// Tool response message
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// Message content (text or multimodal parts)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content
    Text(String),
    /// Multimodal content parts
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Get as text if this is a text content
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Parts(_) => None,
        }
    }

    /// Check if content is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Parts(parts) => parts.is_empty(),
        }
    }
}

/// Content part for multimodal messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text content part
    Text {
        /// The text content
        text: String,
    },
    /// Image content part
    ImageUrl {
        /// Image URL details
        image_url: ImageUrl,
    },
}

/// Image URL for vision models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    /// URL of the image
    pub url: String,
    /// Detail level for processing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ImageDetail>,
}

/// Image detail level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    /// Auto detail level
    Auto,
    /// Low detail level
    Low,
    /// High detail level
    High,
}

/// Tool call made by the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this tool call
    pub id: String,
    /// Tool type
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function call details
    pub function: FunctionCall,
}

/// Function call details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name
    pub name: String,
    /// Function arguments as JSON string
    pub arguments: String,
}

/// Tool choice configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    /// String choice: "none", "auto", "required"
    String(String),
    /// Specific tool choice
    Tool {
        /// Tool type
        #[serde(rename = "type")]
        tool_type: String,
        /// Function to call
        function: ToolChoiceFunction,
    },
}

/// Function choice for specific tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolChoiceFunction {
    /// Function name
    pub name: String,
}

/// Request metadata for routing and billing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// Tenant ID for multi-tenancy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// Request tags for filtering/routing
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,

    /// Request timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
