//! The `Provider` capability: the uniform call surface every vendor
//! adapter implements (component A).

use crate::error::GatewayResult;
use crate::request::GatewayRequest;
use crate::response::LLMResponse;
use crate::streaming::ChatChunk;
use crate::types::ProviderId;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A capability a provider may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Token-by-token streaming responses.
    Streaming,
    /// OpenAI-style function/tool calling.
    FunctionCalling,
    /// Image/vision inputs.
    Vision,
    /// Tool use beyond simple function calling.
    Tools,
    /// Exposes an intermediate reasoning trace.
    Reasoning,
    /// Specialized for code generation.
    Code,
}

/// Numeric limits and advertised capabilities for a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    /// Capabilities this provider supports.
    pub capabilities: HashSet<Capability>,
    /// Maximum tokens the provider will accept/generate in one call.
    pub max_tokens: u32,
    /// Maximum concurrent in-flight requests this provider should receive.
    pub max_concurrent: u32,
}

impl ProviderCapabilities {
    /// True if `cap` is advertised.
    #[must_use]
    pub fn supports(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }
}

/// Static description of a registered provider (component A / data model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Stable identifier, unique within a registry.
    pub id: ProviderId,
    /// Human-readable display name.
    pub display_name: String,
    /// Models this provider serves.
    pub supported_models: HashSet<String>,
    /// Advertised capabilities and limits.
    pub capabilities: ProviderCapabilities,
    /// Priority rank; lower sorts first in `GetHealthyProviders`.
    pub priority: u32,
}

/// Result of a cheap provider health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// The probe succeeded.
    Ok,
    /// The probe failed; the provider should be marked unhealthy.
    Unhealthy,
}

/// Outcome of `ValidateConfig`: either a clean bill of health, or a list of
/// human-readable problems. Pure, no I/O.
#[derive(Debug, Clone, Default)]
pub struct ConfigValidation {
    /// Problems found, empty when valid.
    pub messages: Vec<String>,
}

impl ConfigValidation {
    /// A validation with no problems.
    #[must_use]
    pub fn ok() -> Self {
        Self::default()
    }

    /// A validation carrying one problem message.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }

    /// True if no problems were recorded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.messages.is_empty()
    }
}

/// The uniform provider capability (component A). Implementations are
/// per-vendor adapters; the contract below is all callers may rely on.
///
/// Implementations must:
/// - respect `req`'s bound deadline via the ambient `tokio` timeout the
///   caller wraps the call in; a provider must not retry internally.
/// - never leak unclassified transport errors — map them to a
///   [`crate::error::GatewayError`] variant before returning.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable id, matching the entry in the owning registry.
    fn id(&self) -> &ProviderId;

    /// Static descriptor: models, capabilities, limits, priority.
    fn describe(&self) -> &ProviderDescriptor;

    /// One-shot completion. Must not retry; cancellation is cooperative —
    /// the future must be safe to drop at any await point. Returns the
    /// per-call response (confidence, latency, usage) the ensemble engine
    /// scores; the facade renders the selected response into the
    /// OpenAI-compatible wire shape.
    async fn complete(&self, req: &GatewayRequest) -> GatewayResult<LLMResponse>;

    /// Streaming completion. The returned stream is finite, closes on
    /// completion/error/cancellation, and preserves delta ordering. Not
    /// restartable — callers re-invoke for a fresh attempt.
    async fn complete_stream(
        &self,
        req: &GatewayRequest,
    ) -> GatewayResult<BoxStream<'static, GatewayResult<ChatChunk>>>;

    /// Cheap, bounded-time health probe. Should not consume billable
    /// tokens where the vendor API allows a free check.
    async fn health_check(&self) -> GatewayResult<HealthStatus>;

    /// Pure validation of a provider-specific configuration map; no I/O.
    fn validate_config(&self, config: &HashMap<String, String>) -> ConfigValidation;
}

/// Common adapter configuration fields, reused by every provider
/// implementation via composition rather than inheritance.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider instance id.
    pub id: ProviderId,
    /// Base URL of the upstream API.
    pub base_url: String,
    /// API key, if the vendor requires one.
    pub api_key: Option<crate::types::ApiKey>,
    /// Default model when the request omits one.
    pub default_model: Option<String>,
    /// Per-call timeout.
    pub timeout: std::time::Duration,
}
