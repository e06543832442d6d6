//! Shared application state threaded through every handler.
//!
//! `AppState` owns one instance of each ambient service — provider
//! registry, health service, semantic cache, ensemble engine, rate
//! limiter, metrics, health checker — built once at startup and cloned
//! (cheaply, behind `Arc`) into every request.

use std::sync::Arc;

use gateway_cache::{CacheConfig, SemanticCache};
use gateway_config::GatewayConfig;
use gateway_core::response::GatewayResponse;
use gateway_core::Provider;
use gateway_ensemble::EnsembleEngine;
use gateway_providers::ProviderRegistry;
use gateway_resilience::{CircuitBreakerConfig, TokenBucket};
use gateway_routing::{HealthService, SharedHealthService};
use gateway_telemetry::{Metrics, MetricsConfig};

use crate::health::HealthChecker;

/// Default token bucket capacity for the shared admission-control
/// limiter. Not exposed via configuration yet; see `DESIGN.md`.
const DEFAULT_RATE_LIMIT_CAPACITY: u32 = 100;

/// Default refill rate, in tokens/sec, for the shared limiter.
const DEFAULT_RATE_LIMIT_REFILL_PER_SEC: f64 = 50.0;

/// Everything a handler needs to serve a request, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// The merged configuration this instance was built from.
    pub config: Arc<GatewayConfig>,
    /// Registered provider adapters.
    pub providers: Arc<ProviderRegistry>,
    /// Aggregated health/circuit-breaker state per provider.
    pub health: SharedHealthService,
    /// Semantic response cache.
    pub cache: Arc<SemanticCache<GatewayResponse>>,
    /// Fan-out/scoring/selection engine.
    pub ensemble: Arc<EnsembleEngine>,
    /// Shared admission-control limiter.
    pub rate_limiter: Arc<TokenBucket>,
    /// Process-wide request/cache/ensemble counters.
    pub metrics: Arc<Metrics>,
    /// Liveness/readiness/startup aggregator.
    pub health_checker: Arc<HealthChecker>,
}

impl AppState {
    /// Start building an `AppState`.
    #[must_use]
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }
}

/// Builder for [`AppState`]. Any field left unset gets a default built
/// from `config` (or, for `config` itself, `GatewayConfig::default()`).
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<GatewayConfig>,
    providers: Option<Vec<Arc<dyn Provider>>>,
    health: Option<SharedHealthService>,
}

impl AppStateBuilder {
    /// Set the merged configuration.
    #[must_use]
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the provider adapters to register. Each is added to the health
    /// service at its descriptor's priority.
    #[must_use]
    pub fn providers(mut self, providers: Vec<Arc<dyn Provider>>) -> Self {
        self.providers = Some(providers);
        self
    }

    /// Use an already-constructed health service instead of building a
    /// fresh one. Needed when a caller (e.g. a background health prober)
    /// must observe the same `HealthService` the server serves requests
    /// against.
    #[must_use]
    pub fn health(mut self, health: SharedHealthService) -> Self {
        self.health = Some(health);
        self
    }

    /// Assemble the state, constructing every ambient service from
    /// `config` where the caller didn't supply one directly.
    #[must_use]
    pub fn build(self) -> AppState {
        let config = self.config.unwrap_or_default();
        let providers = self.providers.unwrap_or_default();

        let health: SharedHealthService = self.health.unwrap_or_else(|| {
            Arc::new(HealthService::new(CircuitBreakerConfig::default()))
        });
        for provider in &providers {
            let descriptor = provider.describe();
            health.add_provider_with_priority(
                provider.id().clone(),
                descriptor.display_name.clone(),
                descriptor.priority,
            );
        }

        let registry = Arc::new(ProviderRegistry::new(providers));

        let cache_config = CacheConfig {
            max_entries: config.cache.max_entries,
            similarity_threshold: config.cache.similarity_threshold,
            ttl: config.cache.ttl,
            ..CacheConfig::default()
        };
        let cache = Arc::new(SemanticCache::new(cache_config));

        let rate_limiter = Arc::new(TokenBucket::new(
            DEFAULT_RATE_LIMIT_CAPACITY,
            DEFAULT_RATE_LIMIT_REFILL_PER_SEC,
        ));

        let ensemble = Arc::new(EnsembleEngine::new(health.clone(), rate_limiter.clone()));

        let metrics = Arc::new(Metrics::new(&MetricsConfig::default()));

        let health_checker = Arc::new(HealthChecker::with_defaults());

        AppState {
            config: Arc::new(config),
            providers: registry,
            health,
            cache,
            ensemble,
            rate_limiter,
            metrics,
            health_checker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_providers::MockProvider;
    use gateway_core::provider::{Capability, ProviderCapabilities, ProviderDescriptor};
    use gateway_core::types::ProviderId;
    use std::collections::HashSet;

    fn descriptor(id: &str, priority: u32) -> ProviderDescriptor {
        ProviderDescriptor {
            id: ProviderId::from(id),
            display_name: id.to_string(),
            supported_models: HashSet::from(["test-model".to_string()]),
            capabilities: ProviderCapabilities {
                capabilities: HashSet::from([Capability::Streaming]),
                max_tokens: 4096,
                max_concurrent: 4,
            },
            priority,
        }
    }

    #[test]
    fn builder_defaults_produce_an_empty_registry() {
        let state = AppState::builder().build();
        assert!(state.providers.is_empty());
        assert_eq!(state.config.server.port, 8080);
    }

    #[test]
    fn builder_registers_supplied_providers_with_health() {
        let provider: Arc<dyn Provider> =
            Arc::new(MockProvider::new(descriptor("p1", 0), "hi"));
        let state = AppState::builder().providers(vec![provider]).build();

        assert_eq!(state.providers.len(), 1);
        let id = ProviderId::from("p1");
        assert!(state.health.is_provider_available(&id));
    }

    #[test]
    fn builder_honors_cache_settings_from_config() {
        let mut config = GatewayConfig::default();
        config.cache.max_entries = 42;
        let state = AppState::builder().config(config).build();
        assert_eq!(state.config.cache.max_entries, 42);
    }
}
