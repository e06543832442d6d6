//! Health service: per-provider health tracking, circuit breaker ownership,
//! and failover selection (component D).

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use gateway_core::{GatewayError, ProviderId};
use gateway_resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use std::sync::Arc;
use tracing::{info, warn};

/// Smoothing factor for the latency EWMA.
const LATENCY_EWMA_ALPHA: f64 = 0.2;

/// Point-in-time health snapshot for one provider.
#[derive(Debug, Clone)]
pub struct ProviderHealth {
    /// Provider identifier.
    pub provider_id: ProviderId,
    /// Display name, set at registration.
    pub display_name: String,
    /// Priority rank; lower sorts first.
    pub priority: u32,
    /// Whether the last probe/call succeeded.
    pub healthy: bool,
    /// Circuit breaker state, mirrored for read convenience.
    pub circuit_state: CircuitState,
    /// Lifetime failure count (distinct from the breaker's consecutive count).
    pub failure_count: u64,
    /// Lifetime success count.
    pub success_count: u64,
    /// EWMA of call latency, milliseconds.
    pub avg_latency_ms: f64,
    /// Timestamp of the last successful call.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Timestamp of the last failed call.
    pub last_failure_at: Option<DateTime<Utc>>,
    /// Timestamp of the last health check/update of any kind.
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl ProviderHealth {
    fn new(provider_id: ProviderId, display_name: String, priority: u32) -> Self {
        Self {
            provider_id,
            display_name,
            priority,
            healthy: true,
            circuit_state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            avg_latency_ms: 0.0,
            last_success_at: None,
            last_failure_at: None,
            last_checked_at: None,
        }
    }

    /// Uptime percentage over the lifetime of this entry.
    #[must_use]
    pub fn uptime_percent(&self) -> f64 {
        let total = self.success_count + self.failure_count;
        if total == 0 {
            100.0
        } else {
            (self.success_count as f64 / total as f64) * 100.0
        }
    }
}

struct Entry {
    health: ProviderHealth,
    breaker: CircuitBreaker,
}

/// Owns `provider_id -> (ProviderHealth, CircuitBreaker)` and the
/// failover/selection operations built on top of it.
pub struct HealthService {
    entries: DashMap<ProviderId, Entry>,
    breaker_config: CircuitBreakerConfig,
}

impl Default for HealthService {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl HealthService {
    /// Create a health service whose breakers share `breaker_config`.
    #[must_use]
    pub fn new(breaker_config: CircuitBreakerConfig) -> Self {
        Self {
            entries: DashMap::new(),
            breaker_config,
        }
    }

    /// Register a provider with default priority 0.
    pub fn add_provider(&self, id: ProviderId, display_name: impl Into<String>) {
        self.add_provider_with_priority(id, display_name, 0);
    }

    /// Register a provider with an explicit priority rank.
    pub fn add_provider_with_priority(
        &self,
        id: ProviderId,
        display_name: impl Into<String>,
        priority: u32,
    ) {
        let display_name = display_name.into();
        let breaker = CircuitBreaker::new(id.as_str().to_string(), self.breaker_config.clone());
        let health = ProviderHealth::new(id.clone(), display_name, priority);
        self.entries.insert(id, Entry { health, breaker });
    }

    /// Deregister a provider.
    pub fn remove_provider(&self, id: &ProviderId) {
        self.entries.remove(id);
    }

    /// Record a successful call, updating the latency EWMA and breaker.
    pub fn record_success(&self, id: &ProviderId, latency_ms: u64) {
        let Some(mut entry) = self.entries.get_mut(id) else {
            return;
        };
        let latency = latency_ms as f64;
        entry.health.avg_latency_ms = if entry.health.success_count == 0 {
            latency
        } else {
            LATENCY_EWMA_ALPHA * latency + (1.0 - LATENCY_EWMA_ALPHA) * entry.health.avg_latency_ms
        };
        entry.health.success_count += 1;
        entry.health.healthy = true;
        let now = Utc::now();
        entry.health.last_success_at = Some(now);
        entry.health.last_checked_at = Some(now);

        entry.breaker.record_success();
        entry.health.circuit_state = entry.breaker.state();
    }

    /// Record a failed call, updating counters and forwarding to the breaker.
    pub fn record_failure(&self, id: &ProviderId) {
        let Some(mut entry) = self.entries.get_mut(id) else {
            return;
        };
        entry.health.failure_count += 1;
        let now = Utc::now();
        entry.health.last_failure_at = Some(now);
        entry.health.last_checked_at = Some(now);

        entry.breaker.record_failure();
        entry.health.circuit_state = entry.breaker.state();
        if entry.health.circuit_state == CircuitState::Open {
            entry.health.healthy = false;
        }
    }

    /// Mark a provider's `healthy` flag directly, as the background prober
    /// does after a standalone `health_check` call.
    pub fn set_probed_health(&self, id: &ProviderId, healthy: bool) {
        let Some(mut entry) = self.entries.get_mut(id) else {
            return;
        };
        entry.health.healthy = healthy;
        entry.health.last_checked_at = Some(Utc::now());
        if healthy {
            entry.breaker.record_success();
        } else {
            entry.breaker.record_failure();
        }
        entry.health.circuit_state = entry.breaker.state();
    }

    /// True if the breaker allows calls AND the provider is marked healthy.
    #[must_use]
    pub fn is_provider_available(&self, id: &ProviderId) -> bool {
        self.entries
            .get(id)
            .is_some_and(|entry| entry.breaker.allow() && entry.health.healthy)
    }

    /// Snapshot of one provider's health, if registered.
    #[must_use]
    pub fn health_of(&self, id: &ProviderId) -> Option<ProviderHealth> {
        self.entries.get(id).map(|e| e.health.clone())
    }

    /// All registered providers' health snapshots.
    #[must_use]
    pub fn all_health(&self) -> Vec<ProviderHealth> {
        self.entries.iter().map(|e| e.health.clone()).collect()
    }

    /// Healthy providers ordered by (priority asc, `avg_latency_ms` asc).
    #[must_use]
    pub fn healthy_providers(&self) -> Vec<ProviderId> {
        let mut candidates: Vec<ProviderHealth> = self
            .entries
            .iter()
            .filter(|e| e.breaker.allow() && e.health.healthy)
            .map(|e| e.health.clone())
            .collect();

        candidates.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.avg_latency_ms.total_cmp(&b.avg_latency_ms))
        });

        candidates.into_iter().map(|h| h.provider_id).collect()
    }

    /// Among `candidates`, the healthy provider with minimum EWMA latency;
    /// ties broken by lower failure count then lexicographic id.
    #[must_use]
    pub fn fastest_provider(&self, candidates: &[ProviderId]) -> Option<ProviderId> {
        let mut best: Option<ProviderHealth> = None;

        for id in candidates {
            let Some(entry) = self.entries.get(id) else {
                continue;
            };
            if !(entry.breaker.allow() && entry.health.healthy) {
                continue;
            }
            let candidate = entry.health.clone();
            best = Some(match best {
                None => candidate,
                Some(current) => pick_fastest(current, candidate),
            });
        }

        best.map(|h| h.provider_id)
    }

    /// Try `ordered_ids` in order, skipping providers whose circuit is open,
    /// returning the first success. On exhaustion returns
    /// `all-providers-failed` wrapping the last underlying error.
    ///
    /// # Errors
    /// Returns `GatewayError::AllProvidersFailed` if every candidate errors
    /// or is unavailable.
    pub async fn execute_with_failover<F, Fut, T>(
        &self,
        ordered_ids: &[ProviderId],
        mut op: F,
    ) -> Result<T, GatewayError>
    where
        F: FnMut(ProviderId) -> Fut,
        Fut: std::future::Future<Output = Result<T, GatewayError>>,
    {
        let mut failures = Vec::with_capacity(ordered_ids.len());

        for id in ordered_ids {
            if !self.is_provider_available(id) {
                failures.push(gateway_core::ProviderFailure {
                    provider_id: id.to_string(),
                    message: "circuit open or unhealthy".to_string(),
                });
                continue;
            }

            let started = std::time::Instant::now();
            match op(id.clone()).await {
                Ok(value) => {
                    self.record_success(id, started.elapsed().as_millis() as u64);
                    return Ok(value);
                }
                Err(err) => {
                    warn!(provider = %id, error = %err, "provider call failed during failover");
                    self.record_failure(id);
                    failures.push(gateway_core::ProviderFailure {
                        provider_id: id.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        Err(GatewayError::all_providers_failed(failures))
    }
}

fn pick_fastest(a: ProviderHealth, b: ProviderHealth) -> ProviderHealth {
    if b.avg_latency_ms < a.avg_latency_ms {
        return b;
    }
    if b.avg_latency_ms > a.avg_latency_ms {
        return a;
    }
    if b.failure_count < a.failure_count {
        return b;
    }
    if b.failure_count > a.failure_count {
        return a;
    }
    if b.provider_id.as_str() < a.provider_id.as_str() {
        b
    } else {
        a
    }
}

/// Shared handle to a `HealthService`, cheap to clone across tasks.
pub type SharedHealthService = Arc<HealthService>;

/// Log a one-line summary, used by the server's `/v1/health` handler.
pub fn log_registration(id: &ProviderId, display_name: &str) {
    info!(provider = %id, name = display_name, "provider registered with health service");
}
