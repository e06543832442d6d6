//! Validated newtypes shared across the gateway.
//!
//! Each wraps a primitive and enforces the bound named in the data model
//! at construction time so downstream code never re-checks it.

use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique request identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a new random request id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tenant identifier, opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provider identifier, unique within a `Registry`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(pub String);

impl ProviderId {
    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProviderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Model identifier, e.g. `"gpt-4"` or `"claude-3-opus"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    /// Validate and construct a model id.
    ///
    /// # Errors
    /// Returns an error if `raw` is empty.
    pub fn new(raw: impl Into<String>) -> Result<Self, GatewayError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(GatewayError::invalid_request(
                "model must not be empty",
                Some("model"),
            ));
        }
        Ok(Self(raw))
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sampling temperature, bounded to `[0, 2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Temperature(f32);

impl Temperature {
    /// Validate and construct a temperature value.
    ///
    /// # Errors
    /// Returns an error if `value` is outside `[0.0, 2.0]`.
    pub fn new(value: f32) -> Result<Self, GatewayError> {
        if !(0.0..=2.0).contains(&value) {
            return Err(GatewayError::invalid_request(
                format!("temperature must be in [0, 2], got {value}"),
                Some("temperature"),
            ));
        }
        Ok(Self(value))
    }

    /// Get the raw value.
    #[must_use]
    pub fn value(&self) -> f32 {
        self.0
    }
}

/// Nucleus-sampling parameter, bounded to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopP(f32);

impl TopP {
    /// Validate and construct a top-p value.
    ///
    /// # Errors
    /// Returns an error if `value` is outside `[0.0, 1.0]`.
    pub fn new(value: f32) -> Result<Self, GatewayError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(GatewayError::invalid_request(
                format!("top_p must be in [0, 1], got {value}"),
                Some("top_p"),
            ));
        }
        Ok(Self(value))
    }

    /// Get the raw value.
    #[must_use]
    pub fn value(&self) -> f32 {
        self.0
    }
}

/// Top-k sampling parameter. Provider-specific; only bounded to be nonzero
/// when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopK(u32);

impl TopK {
    /// Validate and construct a top-k value.
    ///
    /// # Errors
    /// Returns an error if `value` is zero.
    pub fn new(value: u32) -> Result<Self, GatewayError> {
        if value == 0 {
            return Err(GatewayError::invalid_request(
                "top_k must be greater than 0",
                Some("top_k"),
            ));
        }
        Ok(Self(value))
    }

    /// Get the raw value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// Maximum tokens to generate. Must be nonzero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaxTokens(u32);

impl MaxTokens {
    /// Validate and construct a max-tokens value.
    ///
    /// # Errors
    /// Returns an error if `value` is zero.
    pub fn new(value: u32) -> Result<Self, GatewayError> {
        if value == 0 {
            return Err(GatewayError::invalid_request(
                "max_tokens must be greater than 0",
                Some("max_tokens"),
            ));
        }
        Ok(Self(value))
    }

    /// Get the raw value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// API key wrapper; `Display`/`Debug` never reveal the secret (see
/// `gateway_core::provider::ApiKey` usages, which always go through
/// `secrecy`).
pub type ApiKey = secrecy::SecretString;
