//! # Gateway Routing
//!
//! The health service (component D): per-provider health and circuit
//! breaker ownership, failover execution, and the background prober that
//! keeps health state current.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod health;
pub mod prober;

pub use health::{HealthService, ProviderHealth, SharedHealthService};
pub use prober::{HealthProber, ProberConfig};
