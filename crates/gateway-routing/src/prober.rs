//! Background health prober: periodically calls `Provider::health_check`
//! on every registered provider and feeds the result back to the
//! `HealthService`.

use crate::health::SharedHealthService;
use gateway_core::{HealthStatus, Provider};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Prober configuration.
#[derive(Debug, Clone)]
pub struct ProberConfig {
    /// How often to probe each provider.
    pub check_interval: Duration,
    /// Per-probe timeout.
    pub probe_timeout: Duration,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// Drives periodic health checks against a fixed provider set.
///
/// `start`/`stop` are idempotent on stop and reject a second concurrent
/// start.
pub struct HealthProber {
    health: SharedHealthService,
    providers: Vec<Arc<dyn Provider>>,
    config: ProberConfig,
    running: AtomicBool,
    handle: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl HealthProber {
    /// Create a prober over `providers`, reporting into `health`.
    #[must_use]
    pub fn new(
        health: SharedHealthService,
        providers: Vec<Arc<dyn Provider>>,
        config: ProberConfig,
    ) -> Self {
        Self {
            health,
            providers,
            config,
            running: AtomicBool::new(false),
            handle: parking_lot::Mutex::new(None),
        }
    }

    /// True if the background loop is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start the background probing loop.
    ///
    /// # Errors
    /// Returns an error if the prober is already running.
    pub fn start(self: &Arc<Self>) -> Result<(), &'static str> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err("prober already running");
        }

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.config.check_interval);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                if !this.running.load(Ordering::Acquire) {
                    break;
                }
                this.probe_all().await;
            }
        });

        *self.handle.lock() = Some(handle);
        Ok(())
    }

    /// Stop the background loop. Idempotent: calling this when already
    /// stopped is a no-op.
    pub fn stop(&self) {
        if self
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }

    async fn probe_all(&self) {
        for provider in &self.providers {
            let id = provider.id().clone();
            let result =
                tokio::time::timeout(self.config.probe_timeout, provider.health_check()).await;

            match result {
                Ok(Ok(HealthStatus::Ok)) => {
                    debug!(provider = %id, "health probe ok");
                    self.health.set_probed_health(&id, true);
                }
                Ok(Ok(HealthStatus::Unhealthy)) => {
                    warn!(provider = %id, "health probe reported unhealthy");
                    self.health.set_probed_health(&id, false);
                }
                Ok(Err(err)) => {
                    warn!(provider = %id, error = %err, "health probe errored");
                    self.health.set_probed_health(&id, false);
                }
                Err(_) => {
                    warn!(provider = %id, "health probe timed out");
                    self.health.set_probed_health(&id, false);
                }
            }
        }
    }
}

impl Drop for HealthProber {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthService;
    use async_trait::async_trait;
    use futures::stream::BoxStream;
    use gateway_core::{
        ConfigValidation, GatewayRequest, GatewayResult, LLMResponse, ProviderCapabilities,
        ProviderDescriptor, ProviderId,
    };
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::AtomicU32;

    struct FlakyProvider {
        descriptor: ProviderDescriptor,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Provider for FlakyProvider {
        fn id(&self) -> &ProviderId {
            &self.descriptor.id
        }

        fn describe(&self) -> &ProviderDescriptor {
            &self.descriptor
        }

        async fn complete(&self, _req: &GatewayRequest) -> GatewayResult<LLMResponse> {
            unimplemented!("not exercised by prober tests")
        }

        async fn complete_stream(
            &self,
            _req: &GatewayRequest,
        ) -> GatewayResult<BoxStream<'static, GatewayResult<gateway_core::ChatChunk>>> {
            unimplemented!("not exercised by prober tests")
        }

        async fn health_check(&self) -> GatewayResult<HealthStatus> {
            let n = self.calls.fetch_add(1, Ordering::Relaxed);
            if n == 0 {
                Ok(HealthStatus::Ok)
            } else {
                Ok(HealthStatus::Unhealthy)
            }
        }

        fn validate_config(&self, _config: &HashMap<String, String>) -> ConfigValidation {
            ConfigValidation::ok()
        }
    }

    fn make_provider(id: &str) -> Arc<dyn Provider> {
        Arc::new(FlakyProvider {
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
            calls: AtomicU32::new(0),
        })
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let health = Arc::new(HealthService::default());
        health.add_provider(ProviderId::from("p1"), "P1");
        let prober = Arc::new(HealthProber::new(
            Arc::clone(&health),
            vec![make_provider("p1")],
            ProberConfig {
                check_interval: Duration::from_millis(20),
                probe_timeout: Duration::from_millis(10),
            },
        ));

        prober.start().expect("first start succeeds");
        assert!(prober.start().is_err());
        prober.stop();
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let health = Arc::new(HealthService::default());
        let prober = Arc::new(HealthProber::new(
            Arc::clone(&health),
            vec![],
            ProberConfig::default(),
        ));
        prober.stop();
        prober.stop();
        assert!(!prober.is_running());
    }

    #[tokio::test]
    async fn probe_all_updates_health_service() {
        let health = Arc::new(HealthService::default());
        health.add_provider(ProviderId::from("p1"), "P1");
        let prober = HealthProber::new(
            Arc::clone(&health),
            vec![make_provider("p1")],
            ProberConfig::default(),
        );

        prober.probe_all().await;
        assert!(health.is_provider_available(&ProviderId::from("p1")));

        prober.probe_all().await;
        assert!(!health.is_provider_available(&ProviderId::from("p1")));
    }
}
