//! A scripted in-memory provider, used by integration tests and local
//! development when no vendor credentials are configured.

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use gateway_core::{
    ChatChunk, ConfigValidation, FinishReason, GatewayError, GatewayRequest, GatewayResult,
    HealthStatus, LLMResponse, Provider, ProviderDescriptor, ProviderId, Usage,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A provider that always returns a fixed response, or fails, for tests
/// and local development.
pub struct MockProvider {
    descriptor: ProviderDescriptor,
    content: String,
    confidence: f32,
    latency: Duration,
    healthy: AtomicBool,
}

impl MockProvider {
    /// Build a mock that always succeeds with `content`.
    #[must_use]
    pub fn new(descriptor: ProviderDescriptor, content: impl Into<String>) -> Self {
        Self {
            descriptor,
            content: content.into(),
            confidence: gateway_core::DEFAULT_CONFIDENCE,
            latency: Duration::from_millis(10),
            healthy: AtomicBool::new(true),
        }
    }

    /// Override the reported confidence.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Override the simulated latency.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Flip the health probe outcome, e.g. to exercise failover in tests.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn id(&self) -> &ProviderId {
        &self.descriptor.id
    }

    fn describe(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn complete(&self, req: &GatewayRequest) -> GatewayResult<LLMResponse> {
        if !self.healthy.load(Ordering::Relaxed) {
            return Err(GatewayError::internal(format!(
                "{} is simulated unhealthy",
                self.descriptor.id
            )));
        }
        tokio::time::sleep(self.latency).await;
        Ok(LLMResponse {
            id: req.id,
            request_id: req.id,
            provider_name: self.descriptor.id.clone(),
            content: self.content.clone(),
            confidence: self.confidence,
            latency_ms: self.latency.as_millis() as u64,
            usage: Usage::new(8, 16),
            reasoning: None,
            finish_reason: FinishReason::Stop,
        })
    }

    async fn complete_stream(
        &self,
        _req: &GatewayRequest,
    ) -> GatewayResult<BoxStream<'static, GatewayResult<ChatChunk>>> {
        Ok(Box::pin(stream::empty()))
    }

    async fn health_check(&self) -> GatewayResult<HealthStatus> {
        if self.healthy.load(Ordering::Relaxed) {
            Ok(HealthStatus::Ok)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    fn validate_config(&self, _config: &HashMap<String, String>) -> ConfigValidation {
        ConfigValidation::ok()
    }
}
