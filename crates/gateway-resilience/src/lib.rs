//! # Gateway Resilience
//!
//! Resilience patterns for the LLM Inference Gateway:
//! - Rate limiting (token bucket + sliding window) for admission control
//! - Circuit breaker for per-provider failure isolation
//! - Bulkhead pattern for bounding concurrent fan-out

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bulkhead;
pub mod circuit_breaker;
pub mod rate_limiter;

pub use bulkhead::{Bulkhead, BulkheadConfig, BulkheadPermit, BulkheadStats};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
pub use rate_limiter::{check_admission, SlidingWindow, TokenBucket};
