//! Error kinds surfaced by the gateway core.
//!
//! Every variant maps to exactly one of the error kinds named in the
//! external interface contract, and to one HTTP status code. Adapters and
//! internal components must classify failures into one of these variants
//! at the boundary; nothing upstream re-interprets a transport error.

use std::fmt;
use thiserror::Error;

/// Result alias used throughout the gateway core.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway-wide error type. Each variant names the semantic kind from the
/// error handling design, not the underlying transport failure.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Schema/bounds violation, unsupported role, wrong embedding dimension.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Human-readable detail.
        message: String,
        /// Offending field, if identifiable.
        field: Option<String>,
    },

    /// Credentials missing or rejected at a provider adapter.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Human-readable detail.
        message: String,
    },

    /// Unknown model or provider id.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable detail.
        message: String,
    },

    /// The rate limiter rejected admission.
    #[error("rate limit exceeded")]
    RateLimitExceeded {
        /// Suggested retry delay, if known.
        retry_after: Option<std::time::Duration>,
    },

    /// A circuit breaker rejected the call.
    #[error("circuit open for provider {provider_id}")]
    CircuitOpen {
        /// The provider whose breaker is open.
        provider_id: String,
    },

    /// The request or operation deadline elapsed before completion.
    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// The caller cancelled the operation.
    #[error("cancelled")]
    Cancelled,

    /// Fewer healthy providers were available than `min_providers` required.
    #[error("insufficient providers: need {required}, have {available}")]
    InsufficientProviders {
        /// Providers required by the ensemble config.
        required: usize,
        /// Providers actually available.
        available: usize,
    },

    /// No candidate provider produced a successful response.
    #[error("all {0} provider(s) failed")]
    AllProvidersFailed(Vec<ProviderFailure>),

    /// Defensive catch-all for conditions that should not occur.
    #[error("internal error: {0}")]
    Internal(String),
}

/// One provider's contribution to an `AllProvidersFailed` error, kept for
/// diagnostics.
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    /// The provider that failed.
    pub provider_id: String,
    /// The classified error kind's rendered message.
    pub message: String,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider_id, self.message)
    }
}

impl GatewayError {
    /// Build an `InvalidRequest` error.
    pub fn invalid_request(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            field: field.map(ToString::to_string),
        }
    }

    /// Build an `Unauthorized` error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Build a `NotFound` error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Build a `CircuitOpen` error.
    pub fn circuit_breaker_open(provider_id: impl Into<String>) -> Self {
        Self::CircuitOpen {
            provider_id: provider_id.into(),
        }
    }

    /// Build an `AllProvidersFailed` error from the per-provider failures
    /// collected during a fan-out.
    #[must_use]
    pub fn all_providers_failed(failures: Vec<ProviderFailure>) -> Self {
        Self::AllProvidersFailed(failures)
    }

    /// Build an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Semantic error kind, used for the wire `{error:{kind,...}}` body and
    /// for routing to the HTTP status below.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid-request",
            Self::Unauthorized { .. } => "unauthorized",
            Self::NotFound { .. } => "not-found",
            Self::RateLimitExceeded { .. } => "rate-limit-exceeded",
            Self::CircuitOpen { .. } => "circuit-open",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
            Self::InsufficientProviders { .. } => "insufficient-providers",
            Self::AllProvidersFailed(_) => "all-providers-failed",
            Self::Internal(_) => "internal",
        }
    }

    /// HTTP status code mapped from the error kind.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest { .. } => 400,
            Self::Unauthorized { .. } => 401,
            Self::NotFound { .. } => 404,
            Self::RateLimitExceeded { .. } => 429,
            Self::CircuitOpen { .. } => 503,
            Self::Timeout(_) => 504,
            Self::Cancelled => 499,
            Self::InsufficientProviders { .. } => 503,
            Self::AllProvidersFailed(_) => 502,
            Self::Internal(_) => 500,
        }
    }

    /// Suggested `Retry-After` seconds, when known.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimitExceeded { retry_after } => {
                retry_after.map(|d| d.as_secs().max(1))
            }
            _ => None,
        }
    }
}
