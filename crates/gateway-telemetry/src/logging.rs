//! Structured logging setup.
//!
//! OpenTelemetry/OTLP export is out of scope; this configures `tracing`
//! with a JSON formatter and an env-filter, the same fallback branch the
//! teacher's tracing setup used when OTel was disabled.

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON-formatted lines instead of the human-readable default.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl LoggingConfig {
    /// Start from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the default level.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Toggle JSON output.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

/// Failed to install the global tracing subscriber.
#[derive(Debug, Error)]
#[error("failed to initialize logging: {0}")]
pub struct LoggingError(String);

/// Install the process-wide `tracing` subscriber. Safe to call once per
/// process; a second call returns an error rather than panicking.
///
/// # Errors
/// Returns [`LoggingError`] if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry.with(fmt::layer().json().with_target(true)).try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init()
    };

    result.map_err(|e| LoggingError(e.to_string()))
}

/// Span for a single end-to-end request through the facade.
#[macro_export]
macro_rules! llm_request_span {
    ($request_id:expr, $model:expr) => {
        tracing::info_span!("llm_request", request_id = %$request_id, model = %$model)
    };
}

/// Span for one provider call within a request.
#[macro_export]
macro_rules! provider_span {
    ($provider:expr, $operation:expr) => {
        tracing::info_span!("provider_call", provider = %$provider, operation = %$operation)
    };
}
