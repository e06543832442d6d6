//! Route definitions for the gateway API.

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};

use crate::{
    auth::{auth_middleware, AuthState},
    handlers, middleware,
    shutdown::ShutdownCoordinator,
    state::AppState,
};

/// Build the full router: ambient endpoints, the OpenAI-compatible
/// surface, and the admin/provider-health surface, with auth, shutdown
/// draining, and tracing layered on top.
pub fn create_router(state: AppState, auth: AuthState, shutdown: Arc<ShutdownCoordinator>) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::metrics_endpoint))
        .nest("/v1", v1_routes())
        .layer(axum::middleware::from_fn_with_state(auth, auth_middleware))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .layer(axum::middleware::from_fn(middleware::shutdown_middleware))
        .layer(Extension(shutdown))
        .layer(middleware::cors_layer())
        .with_state(state)
}

fn v1_routes() -> Router<AppState> {
    Router::new()
        .route("/completions", post(handlers::completions))
        .route("/chat/completions", post(handlers::chat_completions))
        .route(
            "/ensemble/completions",
            post(handlers::ensemble_completions),
        )
        .route("/models", get(handlers::list_models))
        .route("/health", get(handlers::health))
        .route("/providers", get(handlers::list_providers))
        .route("/providers/:id/health", get(handlers::provider_health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::shutdown::ShutdownCoordinator;

    fn test_app() -> Router {
        create_router(
            AppState::builder().build(),
            AuthState::new(Default::default()),
            Arc::new(ShutdownCoordinator::with_defaults()),
        )
    }

    #[tokio::test]
    async fn healthz_is_reachable_without_auth() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_is_reachable() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn models_endpoint_reachable_under_v1() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/v1/models")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn deep_health_endpoint_reachable_under_v1() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_ne!(response.status(), StatusCode::NOT_FOUND);
    }
}
