//! HTTP request handlers for the gateway's OpenAI-compatible surface.

use axum::{
    extract::{Path, State},
    http::header,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    Json,
};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use gateway_core::provider::{Capability, ProviderCapabilities, ProviderDescriptor};
use gateway_core::types::ProviderId;
use gateway_core::{Choice, GatewayRequest, GatewayResponse, GatewayResult, ModelObject, ModelsResponse};
use gateway_routing::ProviderHealth;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::{
    error::ApiError,
    extractors::JsonBody,
    health::{aggregate_provider_health, ProviderHealthResult},
    state::AppState,
};

use gateway_core::Provider as _;

/// `GET /healthz` — process liveness, no dependency checks.
pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.health_checker.check_liveness())
}

/// `GET /metrics` — plain-text self-reported counters.
pub async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render_text(),
    )
}

/// `GET /v1/health` — deep health check aggregating provider status.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let results: Vec<ProviderHealthResult> = state
        .health
        .all_health()
        .into_iter()
        .map(provider_health_result)
        .collect();
    let component = aggregate_provider_health(&results);
    let response = state.health_checker.check_deep(vec![component]).await;
    let status = axum::http::StatusCode::from_u16(response.status.http_status_code())
        .unwrap_or(axum::http::StatusCode::OK);
    (status, Json(response))
}

fn provider_health_result(health: ProviderHealth) -> ProviderHealthResult {
    if health.healthy {
        ProviderHealthResult::healthy(
            health.provider_id.as_str().to_string(),
            Duration::from_secs_f64(health.avg_latency_ms / 1000.0),
        )
    } else {
        ProviderHealthResult::unhealthy(
            health.provider_id.as_str().to_string(),
            format!("circuit {:?}", health.circuit_state),
        )
    }
}

/// Serializable projection of `ProviderHealth`, which deliberately doesn't
/// derive `Serialize` itself — it's gateway-routing's internal snapshot.
#[derive(Debug, Serialize)]
pub struct ProviderHealthView {
    provider_id: String,
    display_name: String,
    priority: u32,
    healthy: bool,
    circuit_state: String,
    failure_count: u64,
    success_count: u64,
    avg_latency_ms: f64,
    uptime_percent: f64,
    last_success_at: Option<DateTime<Utc>>,
    last_failure_at: Option<DateTime<Utc>>,
}

impl From<ProviderHealth> for ProviderHealthView {
    fn from(h: ProviderHealth) -> Self {
        Self {
            provider_id: h.provider_id.as_str().to_string(),
            display_name: h.display_name.clone(),
            priority: h.priority,
            healthy: h.healthy,
            circuit_state: format!("{:?}", h.circuit_state),
            failure_count: h.failure_count,
            success_count: h.success_count,
            avg_latency_ms: h.avg_latency_ms,
            uptime_percent: h.uptime_percent(),
            last_success_at: h.last_success_at,
            last_failure_at: h.last_failure_at,
        }
    }
}

/// `GET /v1/providers` — every registered provider's health snapshot.
pub async fn list_providers(State(state): State<AppState>) -> impl IntoResponse {
    let views: Vec<ProviderHealthView> = state
        .health
        .all_health()
        .into_iter()
        .map(ProviderHealthView::from)
        .collect();
    Json(views)
}

/// `GET /v1/providers/:id/health` — one provider's health snapshot.
///
/// # Errors
/// Returns `not-found` if the id isn't registered.
pub async fn provider_health(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let provider_id = ProviderId::from(id.as_str());
    let health = state.health.health_of(&provider_id).ok_or_else(|| {
        ApiError::from(gateway_core::GatewayError::not_found(format!(
            "unknown provider: {id}"
        )))
    })?;
    Ok(Json(ProviderHealthView::from(health)))
}

/// `GET /v1/models` — models served by at least one registered provider.
pub async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    let mut seen = HashSet::new();
    let mut models = Vec::new();
    for id in state.providers.ids() {
        let Ok(provider) = state.providers.get(id) else {
            continue;
        };
        let descriptor = provider.describe();
        for model in &descriptor.supported_models {
            if seen.insert(model.clone()) {
                models.push(ModelObject::new(
                    model.clone(),
                    descriptor.display_name.clone(),
                ));
            }
        }
    }
    Json(ModelsResponse::new(models))
}

/// `POST /v1/completions` — legacy single-prompt completion.
///
/// # Errors
/// See [`complete`].
#[instrument(skip(state, body))]
pub async fn completions(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<GatewayRequest>,
) -> Result<Response, ApiError> {
    complete(state, body).await
}

/// `POST /v1/chat/completions` — chat-shaped completion, the primary
/// entry point.
///
/// # Errors
/// See [`complete`].
#[instrument(skip(state, body))]
pub async fn chat_completions(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<GatewayRequest>,
) -> Result<Response, ApiError> {
    complete(state, body).await
}

/// `POST /v1/ensemble/completions` — forces a multi-provider debate even
/// when the request didn't ask for one.
///
/// # Errors
/// See [`complete`].
#[instrument(skip(state, body))]
pub async fn ensemble_completions(
    State(state): State<AppState>,
    JsonBody(mut body): JsonBody<GatewayRequest>,
) -> Result<Response, ApiError> {
    let mut ensemble = body.ensemble.clone().unwrap_or_default();
    ensemble.min_providers = ensemble.min_providers.max(2);
    body.ensemble = Some(ensemble);
    complete(state, body).await
}

async fn complete(state: AppState, req: GatewayRequest) -> Result<Response, ApiError> {
    req.validate(None).map_err(ApiError::from)?;

    state.metrics.record_request();

    if req.stream {
        return Ok(stream_completion(state, req).await.into_response());
    }

    match run_completion(&state, &req).await {
        Ok(response) => Ok(Json(response).into_response()),
        Err(err) => {
            state.metrics.record_failure();
            Err(ApiError::from(err))
        }
    }
}

/// Opaque cache key derived from the model and message text, independent
/// of the query embedding used for similarity lookup.
fn fingerprint_of(req: &GatewayRequest) -> String {
    let mut hasher = DefaultHasher::new();
    req.model.hash(&mut hasher);
    for message in req.effective_messages() {
        if let Some(text) = message.text_content() {
            text.hash(&mut hasher);
        }
    }
    format!("{:x}", hasher.finish())
}

async fn run_completion(state: &AppState, req: &GatewayRequest) -> GatewayResult<GatewayResponse> {
    if let Some(embedding) = req.query_embedding.clone() {
        if let gateway_cache::LookupResult::Hit { response, .. } =
            state.cache.lookup(embedding).await?
        {
            state.metrics.record_cache_hit();
            info!(request_id = %req.id, "served from semantic cache");
            return Ok(response);
        }
        state.metrics.record_cache_miss();
    }

    let candidates = candidate_providers(state, req);
    let cancel = CancellationToken::new();

    let started = Instant::now();
    let llm_response = state.ensemble.run(req, &candidates, &cancel).await?;
    state
        .metrics
        .record_ensemble_latency(started.elapsed().as_millis() as u64);

    let response = to_gateway_response(req, &llm_response);

    if let Some(embedding) = req.query_embedding.clone() {
        state
            .cache
            .put(fingerprint_of(req), embedding, response.clone())
            .await?;
    }

    Ok(response)
}

fn candidate_providers(state: &AppState, req: &GatewayRequest) -> Vec<Arc<dyn gateway_core::Provider>> {
    let matching = state.providers.supporting_model(&req.model);
    let supporting: HashSet<ProviderId> = matching.iter().map(|p| p.id().clone()).collect();

    let ordered: Vec<ProviderId> = state
        .health
        .healthy_providers()
        .into_iter()
        .filter(|id| supporting.contains(id))
        .collect();

    if ordered.is_empty() {
        // Nothing in the health service's priority ordering matched
        // (e.g. first contact before any success/failure was recorded);
        // the ensemble engine still filters out unavailable providers
        // itself, so registration order is a safe fallback.
        return matching;
    }

    state.providers.resolve(&ordered)
}

fn to_gateway_response(req: &GatewayRequest, llm: &gateway_core::LLMResponse) -> GatewayResponse {
    GatewayResponse {
        id: llm.request_id,
        object: "chat.completion".to_string(),
        created: Utc::now().timestamp(),
        model: req.model.clone(),
        choices: vec![Choice {
            index: 0,
            message: gateway_core::ChatMessage::assistant(llm.content.clone()),
            finish_reason: llm.finish_reason,
        }],
        usage: llm.usage,
    }
}

async fn stream_completion(state: AppState, req: GatewayRequest) -> impl IntoResponse {
    let events = match collect_stream_events(&state, &req).await {
        Ok(events) => events,
        Err(err) => {
            state.metrics.record_failure();
            vec![Event::default().event("error").data(err.to_string())]
        }
    };

    let done = Event::default().data("[DONE]");
    let body = events.into_iter().chain(std::iter::once(done)).map(Ok::<_, std::convert::Infallible>);
    Sse::new(stream::iter(body))
}

async fn collect_stream_events(state: &AppState, req: &GatewayRequest) -> GatewayResult<Vec<Event>> {
    let candidates = candidate_providers(state, req);
    let provider = candidates
        .into_iter()
        .next()
        .ok_or(gateway_core::GatewayError::InsufficientProviders {
            required: 1,
            available: 0,
        })?;

    let mut stream = provider.complete_stream(req).await?;
    let mut events = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let json = serde_json::to_string(&chunk)
            .map_err(|e| gateway_core::GatewayError::internal(e.to_string()))?;
        events.push(Event::default().data(json));
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_providers::MockProvider;

    fn descriptor(id: &str) -> ProviderDescriptor {
        ProviderDescriptor {
            id: ProviderId::from(id),
            display_name: id.to_string(),
            supported_models: HashSet::from(["demo-model".to_string()]),
            capabilities: ProviderCapabilities {
                capabilities: HashSet::from([Capability::Streaming]),
                max_tokens: 1024,
                max_concurrent: 4,
            },
            priority: 0,
        }
    }

    fn state_with_provider() -> AppState {
        let provider: Arc<dyn gateway_core::Provider> =
            Arc::new(MockProvider::new(descriptor("p1"), "hello"));
        AppState::builder().providers(vec![provider]).build()
    }

    #[tokio::test]
    async fn list_models_returns_supported_models() {
        let state = state_with_provider();
        let result = super::list_models(State(state)).await.into_response();
        let body = axum::body::to_bytes(result.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["data"][0]["id"], "demo-model");
    }

    #[tokio::test]
    async fn chat_completions_runs_against_mock_provider() {
        let state = state_with_provider();
        let req = GatewayRequest::builder()
            .model("demo-model")
            .message(gateway_core::ChatMessage::user("hi"))
            .build()
            .unwrap();

        let response = run_completion(&state, &req).await.unwrap();
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].message.text_content(), Some("hello"));
    }

    #[tokio::test]
    async fn provider_health_rejects_unknown_id() {
        let state = state_with_provider();
        let result = super::provider_health(State(state), Path("nope".to_string())).await;
        assert!(result.is_err());
    }

    #[test]
    fn ensemble_completions_bumps_min_providers_to_at_least_two() {
        let mut ensemble = gateway_core::EnsembleConfig::default();
        ensemble.min_providers = 1;
        ensemble.min_providers = ensemble.min_providers.max(2);
        assert_eq!(ensemble.min_providers, 2);
    }

    #[test]
    fn fingerprint_is_stable_for_identical_requests() {
        let req = GatewayRequest::builder()
            .model("demo-model")
            .message(gateway_core::ChatMessage::user("hi"))
            .build()
            .unwrap();
        let other = GatewayRequest::builder()
            .model("demo-model")
            .message(gateway_core::ChatMessage::user("hi"))
            .build()
            .unwrap();
        assert_eq!(fingerprint_of(&req), fingerprint_of(&other));
    }
}
