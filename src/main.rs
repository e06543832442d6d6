//! # LLM Inference Gateway
//!
//! Multi-provider LLM gateway: ensemble debate across providers,
//! health-aware failover, rate limiting, and a semantic response cache
//! behind an OpenAI-compatible HTTP surface.
//!
//! ## Usage
//!
//! ```bash
//! # Start with default configuration
//! llm-inference-gateway
//!
//! # Start with environment overrides
//! GATEWAY_PORT=9000 llm-inference-gateway
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use gateway_config::load_config;
use gateway_core::provider::{Capability, ProviderCapabilities, ProviderDescriptor};
use gateway_core::types::ProviderId;
use gateway_core::Provider;
use gateway_providers::OpenAiCompatibleProvider;
use gateway_resilience::CircuitBreakerConfig;
use gateway_routing::{HealthProber, HealthService, ProberConfig, SharedHealthService};
use gateway_server::{AppState, Server, ServerConfig};
use gateway_telemetry::{init_logging, LoggingConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(&LoggingConfig::new().with_level("info").with_json(true))
        .context("failed to initialize logging")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting LLM Inference Gateway"
    );

    if let Err(err) = run().await {
        tracing::error!(error = %err, "application failed");
        return Err(err);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let config = load_config()
        .await
        .context("failed to load configuration")?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        providers = config.providers.len(),
        "configuration loaded"
    );

    let health: SharedHealthService =
        Arc::new(HealthService::new(CircuitBreakerConfig::default()));
    let providers = build_providers(&config);
    info!(providers = providers.len(), "provider registry initialized");

    let prober = Arc::new(HealthProber::new(
        health.clone(),
        providers.clone(),
        ProberConfig {
            check_interval: config.health.check_interval,
            probe_timeout: config.health.check_timeout,
        },
    ));
    prober
        .start()
        .map_err(|e| anyhow::anyhow!("failed to start health prober: {e}"))?;

    let state = AppState::builder()
        .config(config.clone())
        .providers(providers)
        .health(health)
        .build();

    state.health_checker.mark_initialized("config").await;
    state.health_checker.mark_initialized("providers").await;
    state.health_checker.mark_initialized("router").await;
    state.health_checker.mark_initialized("metrics").await;

    let server_config = ServerConfig::new()
        .with_host(&config.server.host)
        .with_port(config.server.port);

    let server = Server::new(server_config, state);
    server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("server error: {e}"))?;

    prober.stop();
    Ok(())
}

/// Build a provider adapter for every enabled entry in `config.providers`
/// that carries an API key.
fn build_providers(config: &gateway_config::GatewayConfig) -> Vec<Arc<dyn Provider>> {
    let mut providers: Vec<Arc<dyn Provider>> = Vec::new();

    for entry in &config.providers {
        if !entry.enabled {
            continue;
        }

        let Some(provider_config) = entry.to_provider_config() else {
            warn!(provider = %entry.id, "no provider config derived, skipping");
            continue;
        };

        if provider_config.api_key.is_none() {
            warn!(
                provider = %entry.id,
                "no API key configured, skipping (set {}_API_KEY or the config file's api_key)",
                entry.id.to_uppercase()
            );
            continue;
        }

        let mut supported_models = HashSet::new();
        if let Some(model) = &entry.default_model {
            supported_models.insert(model.clone());
        }

        let descriptor = ProviderDescriptor {
            id: ProviderId::from(entry.id.as_str()),
            display_name: entry.id.clone(),
            supported_models,
            capabilities: ProviderCapabilities {
                capabilities: HashSet::from([Capability::Streaming, Capability::FunctionCalling]),
                max_tokens: 8192,
                max_concurrent: 16,
            },
            priority: entry.priority,
        };

        let provider = OpenAiCompatibleProvider::new(provider_config, descriptor);
        providers.push(Arc::new(provider));
    }

    if providers.is_empty() {
        warn!("no providers registered; set provider credentials via environment or config file");
    }

    providers
}
