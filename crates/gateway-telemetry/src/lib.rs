//! # Gateway Telemetry
//!
//! Ambient observability for the LLM Inference Gateway: structured
//! `tracing` logging and self-reported request/cache/ensemble counters.
//! Exporting those counters to an external metrics backend, and
//! distributed-trace export (OTLP), are out of scope; `/metrics` renders
//! them as plain text itself.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LoggingConfig, LoggingError};
pub use metrics::{Metrics, MetricsConfig, MetricsSnapshot};
