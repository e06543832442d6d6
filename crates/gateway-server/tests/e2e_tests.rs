//! End-to-end integration tests for the gateway's HTTP surface.
//!
//! These exercise the real router wired to mock providers rather than
//! hitting any upstream vendor.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use gateway_config::GatewayConfig;
use gateway_core::provider::{Capability, ProviderCapabilities, ProviderDescriptor};
use gateway_core::types::ProviderId;
use gateway_core::{ChatMessage, GatewayRequest, Provider};
use gateway_providers::MockProvider;
use gateway_server::routes::create_router;
use gateway_server::shutdown::ShutdownCoordinator;
use gateway_server::{AppState, AuthConfig, AuthState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tower::ServiceExt;

fn mock_descriptor(id: &str) -> ProviderDescriptor {
    ProviderDescriptor {
        id: ProviderId::from(id),
        display_name: id.to_string(),
        supported_models: HashSet::from(["gpt-4o-mini".to_string()]),
        capabilities: ProviderCapabilities {
            capabilities: HashSet::from([Capability::Streaming]),
            max_tokens: 4096,
            max_concurrent: 8,
        },
        priority: 0,
    }
}

fn test_state() -> AppState {
    let provider: Arc<dyn Provider> =
        Arc::new(MockProvider::new(mock_descriptor("mock-openai"), "Hello!"));
    AppState::builder()
        .config(GatewayConfig::default())
        .providers(vec![provider])
        .build()
}

fn test_app() -> axum::Router {
    create_router(
        test_state(),
        AuthState::new(AuthConfig::default()),
        Arc::new(ShutdownCoordinator::with_defaults()),
    )
}

mod health_endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn healthz_returns_ok() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn deep_health_reports_provider_status() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_ne!(response.status(), StatusCode::NOT_FOUND);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert!(json.get("status").is_some());
    }
}

mod models_endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn models_endpoint_returns_list() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/v1/models")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["object"], "list");
        assert!(json["data"].is_array());
    }

    #[tokio::test]
    async fn models_endpoint_contains_mock_providers_model() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/v1/models")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();

        let models = json["data"].as_array().unwrap();
        assert!(!models.is_empty());
        assert_eq!(models[0]["id"], "gpt-4o-mini");
    }
}

mod chat_completions_validation_tests {
    use super::*;

    #[tokio::test]
    async fn requires_model() {
        let body = json!({
            "messages": [{"role": "user", "content": "Hello"}]
        });

        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/v1/chat/completions")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_string(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn requires_messages_or_prompt() {
        let body = json!({ "model": "gpt-4o-mini" });

        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/v1/chat/completions")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_string(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_out_of_range_temperature() {
        let body = json!({
            "model": "gpt-4o-mini",
            "messages": [{"role": "user", "content": "Hello"}],
            "temperature": 3.0
        });

        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/v1/chat/completions")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_string(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn valid_request_runs_against_mock_provider() {
        let body = json!({
            "model": "gpt-4o-mini",
            "messages": [{"role": "user", "content": "Hello"}]
        });

        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/v1/chat/completions")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_string(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: Value = serde_json::from_slice(
            &response.into_body().collect().await.unwrap().to_bytes(),
        )
        .unwrap();
        assert_eq!(json["choices"][0]["message"]["content"], "Hello!");
    }
}

mod error_handling_tests {
    use super::*;

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/nonexistent/endpoint")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_json_returns_400() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/v1/chat/completions")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not valid json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

mod metrics_endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn metrics_endpoint_available() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

mod admin_endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn providers_endpoint_lists_registered_providers() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/v1/providers")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: Value = serde_json::from_slice(
            &response.into_body().collect().await.unwrap().to_bytes(),
        )
        .unwrap();
        let providers = json.as_array().unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0]["provider_id"], "mock-openai");
    }

    #[tokio::test]
    async fn single_provider_health_endpoint() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/v1/providers/mock-openai/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_provider_health_returns_404() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/v1/providers/does-not-exist/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

mod cache_tests {
    use super::*;
    use gateway_cache::{CacheConfig, LookupResult, SemanticCache};
    use gateway_core::{Choice, FinishReason, GatewayResponse, Usage};

    fn response(content: &str) -> GatewayResponse {
        GatewayResponse {
            id: gateway_core::types::RequestId::generate(),
            object: "chat.completion".to_string(),
            created: 1_700_000_000,
            model: "gpt-4o-mini".to_string(),
            choices: vec![Choice {
                index: 0,
                message: ChatMessage::assistant(content),
                finish_reason: FinishReason::Stop,
            }],
            usage: Usage::new(5, 10),
        }
    }

    #[tokio::test]
    async fn stores_and_retrieves_by_similar_embedding() {
        let cache: SemanticCache<GatewayResponse> = SemanticCache::new(CacheConfig {
            embedding_dimension: 4,
            similarity_threshold: 0.9,
            ..CacheConfig::default()
        });

        let embedding = vec![1.0, 0.0, 0.0, 0.0];
        cache
            .put("fingerprint-1", embedding.clone(), response("cached"))
            .await
            .unwrap();

        match cache.lookup(embedding).await.unwrap() {
            LookupResult::Hit { response, .. } => {
                assert_eq!(response.choices[0].message.text_content(), Some("cached"));
            }
            LookupResult::Miss => panic!("expected a cache hit for an identical embedding"),
        }
    }

    #[tokio::test]
    async fn dissimilar_embedding_misses() {
        let cache: SemanticCache<GatewayResponse> = SemanticCache::new(CacheConfig {
            embedding_dimension: 4,
            similarity_threshold: 0.95,
            ..CacheConfig::default()
        });

        cache
            .put("fingerprint-1", vec![1.0, 0.0, 0.0, 0.0], response("cached"))
            .await
            .unwrap();

        let miss = cache.lookup(vec![0.0, 1.0, 0.0, 0.0]).await.unwrap();
        assert!(matches!(miss, LookupResult::Miss));
    }
}

mod request_builder_tests {
    use super::*;

    #[test]
    fn builder_creates_a_valid_request() {
        let request = GatewayRequest::builder()
            .model("gpt-4o")
            .message(ChatMessage::user("Hello"))
            .message(ChatMessage::assistant("Hi there!"))
            .message(ChatMessage::user("How are you?"))
            .temperature(0.8)
            .max_tokens(200u32)
            .top_p(0.95)
            .build();

        let req = request.unwrap();
        assert_eq!(req.model, "gpt-4o");
        assert_eq!(req.messages.len(), 3);
        assert_eq!(req.temperature, Some(0.8));
        assert_eq!(req.max_tokens, Some(200));
        assert_eq!(req.top_p, Some(0.95));
    }

    #[test]
    fn builder_rejects_out_of_range_temperature() {
        let result = GatewayRequest::builder()
            .model("gpt-4o")
            .message(ChatMessage::user("Hello"))
            .temperature(2.5)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_requires_a_model() {
        let result = GatewayRequest::builder()
            .message(ChatMessage::user("Hello"))
            .build();
        assert!(result.is_err());
    }
}

mod response_format_tests {
    use super::*;
    use gateway_core::{Choice, FinishReason, GatewayResponse, Usage};

    #[test]
    fn response_serializes_openai_compatible_shape() {
        let response = GatewayResponse {
            id: gateway_core::types::RequestId::generate(),
            object: "chat.completion".to_string(),
            created: 1_700_000_000,
            model: "gpt-4o-mini".to_string(),
            choices: vec![Choice {
                index: 0,
                message: ChatMessage::assistant("Hello!"),
                finish_reason: FinishReason::Stop,
            }],
            usage: Usage::new(10, 5),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["object"], "chat.completion");
        assert_eq!(json["choices"][0]["message"]["content"], "Hello!");
        assert_eq!(json["usage"]["total_tokens"], 15);
    }
}
