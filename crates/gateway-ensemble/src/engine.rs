//! The ensemble engine (component F): parallel/sequential fan-out across
//! candidate providers, composite scoring, and deterministic selection.

use crate::scoring::{self, ScoredResponse};
use gateway_core::{
    EnsembleConfig, EnsembleStrategy, GatewayError, GatewayRequest, GatewayResult, LLMResponse,
    Provider, ProviderId,
};
use gateway_resilience::{Bulkhead, BulkheadConfig, TokenBucket};
use gateway_routing::SharedHealthService;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Runs the ensemble debate across a set of candidate providers, sharing
/// one rate limiter, one bulkhead, and the routing layer's per-provider
/// circuit breakers.
pub struct EnsembleEngine {
    health: SharedHealthService,
    rate_limiter: Arc<TokenBucket>,
    bulkhead: Arc<Bulkhead>,
}

impl EnsembleEngine {
    /// Build an engine over `health` (owns circuit breakers) and a shared
    /// `rate_limiter` gating every fanned-out call. Concurrent in-flight
    /// provider calls across all runs sharing this engine are capped by a
    /// single shared bulkhead, independent of any one run's `max_providers`.
    #[must_use]
    pub fn new(health: SharedHealthService, rate_limiter: Arc<TokenBucket>) -> Self {
        let bulkhead = Bulkhead::new(
            "ensemble-fanout",
            BulkheadConfig {
                max_concurrent: 32,
                queue_size: 32,
                queue_timeout: Duration::from_secs(30),
            },
        );
        Self {
            health,
            rate_limiter,
            bulkhead: Arc::new(bulkhead),
        }
    }

    /// Run the ensemble for `req` against `candidates`, ordered by the
    /// caller's failover preference (typically `HealthService::healthy_providers`
    /// mapped to live adapters).
    ///
    /// # Errors
    /// Returns `InsufficientProviders` if fewer than `min_providers`
    /// candidates are available, `AllProvidersFailed` if every fanned-out
    /// call errors or times out, and `Cancelled` if `cancel` fires before
    /// any usable response arrives.
    pub async fn run(
        &self,
        req: &GatewayRequest,
        candidates: &[Arc<dyn Provider>],
        cancel: &CancellationToken,
    ) -> GatewayResult<LLMResponse> {
        let config = req.ensemble.clone().unwrap_or_default();
        let available = candidates.len();
        let n = candidates.len().min(config.max_providers);
        if n < config.min_providers {
            return Err(GatewayError::InsufficientProviders {
                required: config.min_providers,
                available,
            });
        }
        let selected = &candidates[..n];
        let timeout = Duration::from_millis(config.timeout_ms);

        match config.strategy {
            EnsembleStrategy::Sequential => self.run_sequential(req, selected, &config, timeout, cancel).await,
            EnsembleStrategy::Parallel
            | EnsembleStrategy::ConfidenceWeighted
            | EnsembleStrategy::MajorityVote => {
                self.run_parallel(req, selected, &config, timeout, cancel).await
            }
        }
    }

    async fn run_sequential(
        &self,
        req: &GatewayRequest,
        providers: &[Arc<dyn Provider>],
        config: &EnsembleConfig,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> GatewayResult<LLMResponse> {
        let mut best: Option<ScoredResponse> = None;

        for provider in providers {
            if cancel.is_cancelled() {
                break;
            }
            let Some(scored) = self
                .call_one(Arc::clone(provider), req.clone(), timeout, cancel)
                .await
            else {
                continue;
            };

            if scored.composite >= config.confidence_threshold {
                let mut response = scored.response;
                response.confidence = scored.composite;
                return Ok(response);
            }

            best = Some(match best {
                Some(current) if scoring::beats(&current, &scored) => current,
                _ => scored,
            });
        }

        match best {
            Some(scored) => {
                let mut response = scored.response;
                response.confidence = scored.composite;
                Ok(response)
            }
            None if cancel.is_cancelled() => Err(GatewayError::Cancelled),
            None => Err(GatewayError::all_providers_failed(Vec::new())),
        }
    }

    async fn run_parallel(
        &self,
        req: &GatewayRequest,
        providers: &[Arc<dyn Provider>],
        config: &EnsembleConfig,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> GatewayResult<LLMResponse> {
        let mut tasks = Vec::with_capacity(providers.len());
        for provider in providers {
            let provider = Arc::clone(provider);
            let req = req.clone();
            let health = Arc::clone(&self.health);
            let rate_limiter = Arc::clone(&self.rate_limiter);
            let bulkhead = Arc::clone(&self.bulkhead);
            let cancel = cancel.clone();
            tasks.push(tokio::spawn(async move {
                call_one_owned(health, rate_limiter, bulkhead, provider, req, timeout, cancel).await
            }));
        }

        let mut scored = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(Some(response)) => scored.push(response),
                Ok(None) => {}
                Err(err) => warn!(error = %err, "ensemble task panicked"),
            }
        }

        if scored.is_empty() {
            return if cancel.is_cancelled() {
                Err(GatewayError::Cancelled)
            } else {
                Err(GatewayError::all_providers_failed(Vec::new()))
            };
        }

        let selected = match config.strategy {
            EnsembleStrategy::MajorityVote => select_majority_vote(&scored),
            _ => {
                let winner = scoring::argmax(&scored);
                let mut response = winner.response.clone();
                response.confidence = winner.composite;
                response
            }
        };

        Ok(selected)
    }

    async fn call_one(
        &self,
        provider: Arc<dyn Provider>,
        req: GatewayRequest,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Option<ScoredResponse> {
        call_one_owned(
            Arc::clone(&self.health),
            Arc::clone(&self.rate_limiter),
            Arc::clone(&self.bulkhead),
            provider,
            req,
            timeout,
            cancel.clone(),
        )
        .await
    }
}

/// Bucket responses by normalized content key, pick the largest bucket,
/// apply the argmax rule within it, and report
/// `bucket_size / total * avg(composite)` as the final confidence.
fn select_majority_vote(scored: &[ScoredResponse]) -> LLMResponse {
    let total = scored.len();
    let mut buckets: HashMap<String, Vec<&ScoredResponse>> = HashMap::new();
    for item in scored {
        buckets
            .entry(scoring::bucket_key(&item.response.content))
            .or_default()
            .push(item);
    }

    let largest = buckets
        .values()
        .max_by_key(|bucket| bucket.len())
        .expect("at least one bucket exists for a non-empty response set");

    let winner = largest
        .iter()
        .copied()
        .fold(largest[0], |best, candidate| {
            if scoring::beats(candidate, best) {
                candidate
            } else {
                best
            }
        });

    let avg_composite =
        largest.iter().map(|r| r.composite).sum::<f32>() / largest.len() as f32;
    let confidence = (largest.len() as f32 / total as f32) * avg_composite;

    let mut response = winner.response.clone();
    response.confidence = confidence;
    response
}

async fn call_one_owned(
    health: SharedHealthService,
    rate_limiter: Arc<TokenBucket>,
    bulkhead: Arc<Bulkhead>,
    provider: Arc<dyn Provider>,
    req: GatewayRequest,
    timeout: Duration,
    cancel: CancellationToken,
) -> Option<ScoredResponse> {
    let id: ProviderId = provider.id().clone();

    if rate_limiter.wait(&cancel).await.is_err() {
        return None;
    }
    if !health.is_provider_available(&id) {
        return None;
    }
    let _permit = match bulkhead.acquire().await {
        Ok(permit) => permit,
        Err(err) => {
            warn!(provider = %id, error = %err, "ensemble bulkhead full, dropping candidate");
            health.record_failure(&id);
            return None;
        }
    };

    let started = Instant::now();
    let outcome = tokio::select! {
        res = tokio::time::timeout(timeout, provider.complete(&req)) => res,
        () = cancel.cancelled() => return None,
    };

    match outcome {
        Ok(Ok(response)) => {
            health.record_success(&id, started.elapsed().as_millis() as u64);
            let composite = scoring::score(&response, timeout.as_millis() as u64);
            Some(ScoredResponse { response, composite })
        }
        Ok(Err(err)) => {
            warn!(provider = %id, error = %err, "ensemble candidate call failed");
            health.record_failure(&id);
            None
        }
        Err(_elapsed) => {
            warn!(provider = %id, "ensemble candidate call timed out");
            health.record_failure(&id);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream::{self, BoxStream};
    use gateway_core::{
        ChatChunk, ConfigValidation, FinishReason, GatewayRequestBuilder, HealthStatus,
        ProviderCapabilities, ProviderDescriptor, RequestId, Usage,
    };
    use gateway_routing::HealthService;
    use std::collections::HashSet;

    struct StubProvider {
        descriptor: ProviderDescriptor,
        content: String,
        confidence: f32,
        latency_ms: u64,
        finish_reason: FinishReason,
    }

    impl StubProvider {
        fn new(id: &str, content: &str, confidence: f32, latency_ms: u64) -> Arc<dyn Provider> {
            Arc::new(Self {
                descriptor: ProviderDescriptor {
                    id: ProviderId::from(id),
                    display_name: id.to_string(),
                    supported_models: HashSet::new(),
                    capabilities: ProviderCapabilities {
                        capabilities: HashSet::new(),
                        max_tokens: 4096,
                        max_concurrent: 10,
                    },
                    priority: 0,
                },
                content: content.to_string(),
                confidence,
                latency_ms,
                finish_reason: FinishReason::Stop,
            })
        }
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn id(&self) -> &ProviderId {
            &self.descriptor.id
        }

        fn describe(&self) -> &ProviderDescriptor {
            &self.descriptor
        }

        async fn complete(&self, _req: &GatewayRequest) -> GatewayResult<LLMResponse> {
            Ok(LLMResponse {
                id: RequestId::generate(),
                request_id: RequestId::generate(),
                provider_name: self.descriptor.id.clone(),
                content: self.content.clone(),
                confidence: self.confidence,
                latency_ms: self.latency_ms,
                usage: Usage::default(),
                reasoning: None,
                finish_reason: self.finish_reason,
            })
        }

        async fn complete_stream(
            &self,
            _req: &GatewayRequest,
        ) -> GatewayResult<BoxStream<'static, GatewayResult<ChatChunk>>> {
            Ok(Box::pin(stream::empty()))
        }

        async fn health_check(&self) -> GatewayResult<HealthStatus> {
            Ok(HealthStatus::Ok)
        }

        fn validate_config(&self, _config: &std::collections::HashMap<String, String>) -> ConfigValidation {
            ConfigValidation::ok()
        }
    }

    fn new_engine() -> (EnsembleEngine, SharedHealthService) {
        let health = Arc::new(HealthService::default());
        let rate_limiter = Arc::new(TokenBucket::new(1000, 1000.0));
        (EnsembleEngine::new(Arc::clone(&health), rate_limiter), health)
    }

    fn base_request() -> GatewayRequest {
        GatewayRequestBuilder::default()
            .model("gpt-4")
            .prompt("hello")
            .build()
            .expect("valid request")
    }

    #[tokio::test]
    async fn parallel_selects_argmax_composite() {
        let (engine, health) = new_engine();
        let p1 = StubProvider::new("p1", "a short answer", 0.6, 100);
        let p2 = StubProvider::new("p2", "a much longer and more thorough answer here", 0.95, 50);
        health.add_provider(ProviderId::from("p1"), "P1");
        health.add_provider(ProviderId::from("p2"), "P2");

        let mut req = base_request();
        req.ensemble = Some(gateway_core::EnsembleConfig {
            strategy: gateway_core::EnsembleStrategy::Parallel,
            min_providers: 1,
            max_providers: 2,
            confidence_threshold: 0.7,
            timeout_ms: 5_000,
        });

        let cancel = CancellationToken::new();
        let result = engine.run(&req, &[p1, p2], &cancel).await.unwrap();
        assert_eq!(result.provider_name.as_str(), "p2");
    }

    #[tokio::test]
    async fn insufficient_providers_is_rejected() {
        let (engine, health) = new_engine();
        let p1 = StubProvider::new("p1", "answer", 0.9, 10);
        health.add_provider(ProviderId::from("p1"), "P1");

        let mut req = base_request();
        req.ensemble = Some(gateway_core::EnsembleConfig {
            strategy: gateway_core::EnsembleStrategy::Parallel,
            min_providers: 2,
            max_providers: 2,
            confidence_threshold: 0.7,
            timeout_ms: 5_000,
        });

        let cancel = CancellationToken::new();
        let err = engine.run(&req, &[p1], &cancel).await.unwrap_err();
        assert!(matches!(err, GatewayError::InsufficientProviders { .. }));
    }

    #[tokio::test]
    async fn sequential_stops_at_first_above_threshold() {
        let (engine, health) = new_engine();
        let p1 = StubProvider::new("p1", "a decent answer of moderate length", 0.95, 10);
        let p2 = StubProvider::new("p2", "should never be called", 0.95, 10);
        health.add_provider(ProviderId::from("p1"), "P1");
        health.add_provider(ProviderId::from("p2"), "P2");

        let mut req = base_request();
        req.ensemble = Some(gateway_core::EnsembleConfig {
            strategy: gateway_core::EnsembleStrategy::Sequential,
            min_providers: 1,
            max_providers: 2,
            confidence_threshold: 0.5,
            timeout_ms: 5_000,
        });

        let cancel = CancellationToken::new();
        let result = engine.run(&req, &[p1, p2], &cancel).await.unwrap();
        assert_eq!(result.provider_name.as_str(), "p1");
    }

    #[tokio::test]
    async fn majority_vote_picks_largest_bucket() {
        let (engine, health) = new_engine();
        let p1 = StubProvider::new("p1", "the same answer", 0.8, 20);
        let p2 = StubProvider::new("p2", "The Same Answer", 0.8, 30);
        let p3 = StubProvider::new("p3", "a totally different answer", 0.9, 10);
        health.add_provider(ProviderId::from("p1"), "P1");
        health.add_provider(ProviderId::from("p2"), "P2");
        health.add_provider(ProviderId::from("p3"), "P3");

        let mut req = base_request();
        req.ensemble = Some(gateway_core::EnsembleConfig {
            strategy: gateway_core::EnsembleStrategy::MajorityVote,
            min_providers: 1,
            max_providers: 3,
            confidence_threshold: 0.7,
            timeout_ms: 5_000,
        });

        let cancel = CancellationToken::new();
        let result = engine.run(&req, &[p1, p2, p3], &cancel).await.unwrap();
        assert_eq!(result.content.to_lowercase(), "the same answer");
    }

    #[tokio::test]
    async fn all_providers_failing_is_an_error() {
        struct FailingProvider {
            descriptor: ProviderDescriptor,
        }

        #[async_trait]
        impl Provider for FailingProvider {
            fn id(&self) -> &ProviderId {
                &self.descriptor.id
            }
            fn describe(&self) -> &ProviderDescriptor {
                &self.descriptor
            }
            async fn complete(&self, _req: &GatewayRequest) -> GatewayResult<LLMResponse> {
                Err(GatewayError::internal("boom"))
            }
            async fn complete_stream(
                &self,
                _req: &GatewayRequest,
            ) -> GatewayResult<BoxStream<'static, GatewayResult<ChatChunk>>> {
                Ok(Box::pin(stream::empty()))
            }
            async fn health_check(&self) -> GatewayResult<HealthStatus> {
                Ok(HealthStatus::Ok)
            }
            fn validate_config(
                &self,
                _config: &std::collections::HashMap<String, String>,
            ) -> ConfigValidation {
                ConfigValidation::ok()
            }
        }

        let (engine, health) = new_engine();
        health.add_provider(ProviderId::from("p1"), "P1");
        let p1: Arc<dyn Provider> = Arc::new(FailingProvider {
            descriptor: ProviderDescriptor {
                id: ProviderId::from("p1"),
                display_name: "P1".to_string(),
                supported_models: HashSet::new(),
                capabilities: ProviderCapabilities {
                    capabilities: HashSet::new(),
                    max_tokens: 4096,
                    max_concurrent: 10,
                },
                priority: 0,
            },
        });

        let mut req = base_request();
        req.ensemble = Some(gateway_core::EnsembleConfig {
            strategy: gateway_core::EnsembleStrategy::Parallel,
            min_providers: 1,
            max_providers: 1,
            confidence_threshold: 0.7,
            timeout_ms: 5_000,
        });

        let cancel = CancellationToken::new();
        let err = engine.run(&req, &[p1], &cancel).await.unwrap_err();
        assert!(matches!(err, GatewayError::AllProvidersFailed(_)));
    }

    #[tokio::test]
    async fn fan_out_beyond_bulkhead_capacity_still_completes() {
        // More candidates than the engine's bulkhead max_concurrent (32), so
        // some calls must queue for a permit rather than run unbounded.
        let (engine, health) = new_engine();
        let mut providers: Vec<Arc<dyn Provider>> = Vec::new();
        for i in 0..40 {
            let id = format!("p{i}");
            health.add_provider(ProviderId::from(id.as_str()), &id);
            providers.push(StubProvider::new(&id, "a reasonably long answer", 0.8, 5));
        }

        let mut req = base_request();
        req.ensemble = Some(gateway_core::EnsembleConfig {
            strategy: gateway_core::EnsembleStrategy::Parallel,
            min_providers: 1,
            max_providers: 40,
            confidence_threshold: 0.9,
            timeout_ms: 5_000,
        });

        let cancel = CancellationToken::new();
        let result = engine.run(&req, &providers, &cancel).await.unwrap();
        assert!(!result.content.is_empty());
    }
}
