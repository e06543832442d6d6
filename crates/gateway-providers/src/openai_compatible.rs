//! A single adapter for the OpenAI-compatible chat completions wire shape.
//!
//! Every vendor the gateway talks to (OpenAI itself, and any self-hosted
//! or third-party endpoint that mirrors its `/chat/completions` contract)
//! is reached through this one adapter, parameterized by `ProviderConfig`.
//! Vendor-specific request signing or wire dialects are out of scope.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures_util::StreamExt;
use gateway_core::{
    ChatChunk, ChatMessage, ChunkChoice, ChunkDelta, ConfigValidation, FinishReason,
    GatewayError, GatewayRequest, GatewayResult, HealthStatus, LLMResponse, Provider,
    ProviderConfig, ProviderDescriptor, ProviderId, Usage, DEFAULT_CONFIDENCE,
};
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Adapter for any vendor exposing an OpenAI-compatible chat completions
/// endpoint.
pub struct OpenAiCompatibleProvider {
    config: ProviderConfig,
    descriptor: ProviderDescriptor,
    client: Client,
}

impl OpenAiCompatibleProvider {
    /// Build an adapter from its connection config and static descriptor.
    ///
    /// # Panics
    /// Panics if the underlying `reqwest::Client` cannot be constructed,
    /// which only happens under a broken TLS backend.
    #[must_use]
    pub fn new(config: ProviderConfig, descriptor: ProviderDescriptor) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("reqwest client builder should not fail under a sane TLS backend");
        Self {
            config,
            descriptor,
            client,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.config.base_url.trim_end_matches('/'))
    }

    fn request_builder(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(url).header("Content-Type", "application/json");
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }
        builder
    }

    fn wire_request(&self, req: &GatewayRequest, stream: bool) -> WireRequest {
        let messages = if req.messages.is_empty() {
            vec![ChatMessage::user(req.prompt.clone().unwrap_or_default())]
        } else {
            req.messages.clone()
        };

        WireRequest {
            model: req.model.clone(),
            messages,
            temperature: req.temperature,
            max_tokens: req.max_tokens,
            top_p: req.top_p,
            stop: req.stop.clone(),
            stream,
        }
    }

    fn classify_status(&self, status: u16, body: &str) -> GatewayError {
        match status {
            401 | 403 => GatewayError::unauthorized(format!("{}: {body}", self.descriptor.id)),
            404 => GatewayError::not_found(format!("{}: {body}", self.descriptor.id)),
            429 => GatewayError::RateLimitExceeded {
                retry_after: Some(std::time::Duration::from_secs(30)),
            },
            _ => GatewayError::internal(format!(
                "{} returned {status}: {body}",
                self.descriptor.id
            )),
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    fn id(&self) -> &ProviderId {
        &self.descriptor.id
    }

    fn describe(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn complete(&self, req: &GatewayRequest) -> GatewayResult<LLMResponse> {
        let started = Instant::now();
        let wire = self.wire_request(req, false);

        debug!(provider = %self.descriptor.id, model = %req.model, "sending completion request");

        let response = self
            .request_builder(&self.completions_url())
            .json(&wire)
            .send()
            .await
            .map_err(|e| GatewayError::internal(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.classify_status(status.as_u16(), &body));
        }

        let body: WireResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::internal(format!("failed to parse response: {e}")))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::internal("provider returned no choices"))?;

        let finish_reason = parse_finish_reason(choice.finish_reason.as_deref());
        let usage = body
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LLMResponse {
            id: req.id,
            request_id: req.id,
            provider_name: self.descriptor.id.clone(),
            content: choice.message.content.unwrap_or_default(),
            confidence: DEFAULT_CONFIDENCE,
            latency_ms: started.elapsed().as_millis() as u64,
            usage,
            reasoning: None,
            finish_reason,
        })
    }

    async fn complete_stream(
        &self,
        req: &GatewayRequest,
    ) -> GatewayResult<BoxStream<'static, GatewayResult<ChatChunk>>> {
        let wire = self.wire_request(req, true);
        let request_builder = self.request_builder(&self.completions_url()).json(&wire);

        let event_source = EventSource::new(request_builder)
            .map_err(|e| GatewayError::internal(format!("failed to open event stream: {e}")))?;

        let provider_id = self.descriptor.id.clone();

        let stream = try_stream! {
            let mut es = event_source;
            while let Some(event) = es.next().await {
                match event {
                    Ok(Event::Open) => trace!(provider = %provider_id, "stream opened"),
                    Ok(Event::Message(msg)) => {
                        let data = msg.data.trim();
                        if data == "[DONE]" {
                            break;
                        }
                        match serde_json::from_str::<WireChunk>(data) {
                            Ok(chunk) => yield wire_chunk_to_chat_chunk(chunk),
                            Err(e) => warn!(provider = %provider_id, error = %e, "failed to parse stream chunk"),
                        }
                    }
                    Err(e) => {
                        warn!(provider = %provider_id, error = %e, "stream error");
                        Err(GatewayError::internal(format!("stream error: {e}")))?;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn health_check(&self) -> GatewayResult<HealthStatus> {
        let mut builder = self.client.get(self.models_url());
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }
        match builder.send().await {
            Ok(resp) if resp.status().is_success() => Ok(HealthStatus::Ok),
            Ok(_) => Ok(HealthStatus::Unhealthy),
            Err(e) => {
                warn!(provider = %self.descriptor.id, error = %e, "health check request failed");
                Ok(HealthStatus::Unhealthy)
            }
        }
    }

    fn validate_config(&self, config: &HashMap<String, String>) -> ConfigValidation {
        let mut messages = Vec::new();
        if !config.contains_key("base_url") {
            messages.push("missing base_url".to_string());
        }
        if messages.is_empty() {
            ConfigValidation::ok()
        } else {
            ConfigValidation { messages }
        }
    }
}

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireChunk {
    id: String,
    model: String,
    choices: Vec<WireChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChunkChoice {
    index: u32,
    delta: WireChunkDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireChunkDelta {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

fn parse_finish_reason(raw: Option<&str>) -> FinishReason {
    match raw {
        Some("length") => FinishReason::Length,
        Some("tool_calls") | Some("function_call") => FinishReason::ToolCalls,
        Some("content_filter") => FinishReason::ContentFilter,
        Some(_) | None => FinishReason::Stop,
    }
}

fn wire_chunk_to_chat_chunk(chunk: WireChunk) -> ChatChunk {
    ChatChunk {
        id: chunk.id,
        model: chunk.model,
        choices: chunk
            .choices
            .into_iter()
            .map(|c| ChunkChoice {
                index: c.index,
                delta: ChunkDelta {
                    role: c.delta.role,
                    content: c.delta.content,
                },
                finish_reason: c.finish_reason.as_deref().map(parse_finish_reason),
            })
            .collect(),
        usage: None,
    }
}
