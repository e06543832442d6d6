//! Bearer-token authentication stub.
//!
//! JWT/OIDC/JWKS verification, API-key issuance, and RBAC are out of
//! scope; requests either carry the single configured bearer token or
//! they don't. `AuthConfig::required == false` (the default, matching an
//! unset `JWT_SECRET`) disables enforcement entirely so the gateway runs
//! out of the box.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::sync::Arc;

/// A handful of paths that bypass the bearer check regardless of
/// `AuthConfig::required`, so health/metrics scraping never needs a token.
const PUBLIC_PATHS: &[&str] = &["/healthz", "/metrics", "/v1/health"];

/// Bearer-token auth configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Whether the bearer token is enforced. `false` when no token is
    /// configured (the `JWT_SECRET` stub was left unset).
    pub required: bool,
    /// The single accepted token, if `required`.
    pub token: Option<SecretString>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("required", &self.required)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            required: false,
            token: None,
        }
    }
}

impl AuthConfig {
    /// Build a config enforcing `token`.
    #[must_use]
    pub fn required(token: SecretString) -> Self {
        Self {
            required: true,
            token: Some(token),
        }
    }

    /// Build from the `JWT_SECRET` stub: present and non-empty enables
    /// enforcement, absent disables it.
    #[must_use]
    pub fn from_jwt_secret_stub(jwt_secret: Option<SecretString>) -> Self {
        match jwt_secret {
            Some(token) if !token.expose_secret().is_empty() => Self::required(token),
            _ => Self::default(),
        }
    }
}

/// Auth middleware state, cheap to clone into an axum `State`.
#[derive(Clone, Debug)]
pub struct AuthState {
    config: Arc<AuthConfig>,
}

impl AuthState {
    /// Build from a config.
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: AuthErrorDetail,
}

#[derive(Serialize)]
struct AuthErrorDetail {
    kind: &'static str,
    message: String,
}

/// Rejection returned by [`auth_middleware`].
#[derive(Debug)]
pub struct AuthError(String);

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = AuthErrorBody {
            error: AuthErrorDetail {
                kind: "unauthorized",
                message: self.0,
            },
        };
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Reject requests missing or mismatching the configured bearer token.
/// Public paths (health/metrics) and a disabled config always pass.
///
/// # Errors
/// Returns [`AuthError`] (401) if a token is required and absent or
/// wrong.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if !state.config.required || PUBLIC_PATHS.contains(&request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let Some(expected) = &state.config.token else {
        return Ok(next.run(request).await);
    };

    let presented = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected.expose_secret() => Ok(next.run(request).await),
        Some(_) => Err(AuthError("invalid bearer token".to_string())),
        None => Err(AuthError("missing bearer token".to_string())),
    }
}
