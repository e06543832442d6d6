//! Cross-cutting HTTP middleware: request-id propagation, access
//! logging, and permissive CORS for browser-based clients.

use std::sync::Arc;

use axum::{
    extract::{Extension, Request},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

use crate::shutdown::{RequestGuard, ShutdownCoordinator};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Stamp every response with an `X-Request-Id`, reusing one the caller
/// supplied or minting a fresh UUID.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);

    request
        .headers_mut()
        .insert(REQUEST_ID_HEADER, HeaderValue::from_str(&id).unwrap_or_else(|_| {
            HeaderValue::from_static("invalid-request-id")
        }));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Log method, path, and status for every request at `info` level.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = std::time::Instant::now();

    let response = next.run(request).await;

    info!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "handled request"
    );
    response
}

/// Permissive CORS for browser-based clients hitting the OpenAI-compatible
/// surface directly.
#[must_use]
pub fn cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}

/// Reject new requests once shutdown has been triggered, otherwise hold a
/// [`RequestGuard`] for the request's lifetime so the drain wait in
/// [`crate::shutdown::ShutdownCoordinator::trigger_shutdown`] sees it.
pub async fn shutdown_middleware(
    Extension(coordinator): Extension<Arc<ShutdownCoordinator>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(_guard) = RequestGuard::new(coordinator) else {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response();
    };
    next.run(request).await
}
