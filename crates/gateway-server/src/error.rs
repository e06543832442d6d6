//! HTTP projection of [`gateway_core::GatewayError`].
//!
//! Every error crossing the HTTP boundary is classified exactly once,
//! here, into the wire shape named by the external interface contract:
//! `{"error": {"kind": ..., "message": ..., "field": ...}}` plus a
//! `Retry-After` header when the gateway error carries one.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway_core::GatewayError;
use serde::Serialize;

/// Axum-facing error wrapper around [`GatewayError`].
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl ApiError {
    /// Build a `bad_request`-classified `ApiError`, used by extractors
    /// that reject malformed input before a `GatewayRequest` exists.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(GatewayError::invalid_request(message, None))
    }

    /// Build an `unauthorized`-classified `ApiError`, used by the bearer
    /// token extractor and middleware.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self(GatewayError::unauthorized(message))
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    kind: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = &self.0;
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let field = match err {
            GatewayError::InvalidRequest { field, .. } => field.as_deref(),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                kind: err.kind(),
                message: err.to_string(),
                field,
            },
        };

        match err.kind() {
            "internal" | "all-providers-failed" => {
                tracing::error!(kind = err.kind(), message = %err, "request failed");
            }
            "circuit-open" | "rate-limit-exceeded" => {
                tracing::warn!(kind = err.kind(), message = %err, "request rejected");
            }
            "not-found" => {
                tracing::debug!(kind = err.kind(), message = %err, "request missed");
            }
            _ => {
                tracing::debug!(kind = err.kind(), message = %err, "request rejected");
            }
        }

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = err.retry_after_secs() {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert("retry-after", value);
            }
        }
        response
    }
}
