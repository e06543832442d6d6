//! Circuit breaker pattern implementation.
//!
//! The circuit breaker prevents cascading failures by stopping requests
//! to a failing provider and allowing it time to recover. Unlike a
//! failure-rate-over-window model, this breaker trips on a run of
//! *consecutive* failures: any success, in any state, resets the counter.

use gateway_core::GatewayError;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    /// Circuit is closed, requests flow normally
    Closed = 0,
    /// Circuit is open, requests are rejected
    Open = 1,
    /// Circuit is half-open, testing if the provider recovered
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Closed,
            1 => Self::Open,
            2 => Self::HalfOpen,
            _ => Self::Closed,
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,
    /// Reset timeout: how long the circuit stays open before probing again
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

/// Circuit breaker for a single provider. State transitions follow:
///
/// `closed --failure(count>=threshold)--> open --timeout elapsed--> half_open`
/// `half_open --success--> closed`, `half_open --failure--> open`, and any
/// success in `closed` resets the consecutive-failure counter.
pub struct CircuitBreaker {
    /// Provider identifier
    provider_id: String,
    /// Configuration
    config: CircuitBreakerConfig,
    /// Current state (atomic for lock-free reads)
    state: AtomicU8,
    /// Consecutive failure count; reset to 0 on any success
    consecutive_failures: AtomicU32,
    /// Timestamp when circuit opened (milliseconds since epoch)
    opened_at: AtomicU64,
    /// Lock serializing state transitions
    transition_lock: RwLock<()>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker
    #[must_use]
    pub fn new(provider_id: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            provider_id: provider_id.into(),
            config,
            state: AtomicU8::new(CircuitState::Closed as u8),
            consecutive_failures: AtomicU32::new(0),
            opened_at: AtomicU64::new(0),
            transition_lock: RwLock::new(()),
        }
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults(provider_id: impl Into<String>) -> Self {
        Self::new(provider_id, CircuitBreakerConfig::default())
    }

    /// Get the provider ID
    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Get the current state
    #[must_use]
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    /// True if a request may proceed right now: closed or half-open, or
    /// open past its reset timeout (which transitions to half-open as a
    /// side effect).
    #[must_use]
    pub fn allow(&self) -> bool {
        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                if self.should_attempt_reset() {
                    self.transition_to_half_open();
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Check if the circuit allows requests.
    ///
    /// # Errors
    /// Returns `GatewayError::CircuitOpen` if the circuit is open.
    pub fn check(&self) -> Result<(), GatewayError> {
        if self.allow() {
            Ok(())
        } else {
            Err(GatewayError::circuit_breaker_open(&self.provider_id))
        }
    }

    /// Run `f` behind this breaker, recording the outcome.
    ///
    /// # Errors
    /// Returns `GatewayError::CircuitOpen` without calling `f` if the
    /// circuit is open; otherwise returns whatever `f` returns.
    pub fn call<T>(&self, f: impl FnOnce() -> Result<T, GatewayError>) -> Result<T, GatewayError> {
        self.check()?;
        match f() {
            Ok(v) => {
                self.record_success();
                Ok(v)
            }
            Err(e) => {
                self.record_failure();
                Err(e)
            }
        }
    }

    /// Record a successful request. Resets the consecutive-failure
    /// counter in every state and closes the circuit from half-open.
    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);

        if self.state() == CircuitState::HalfOpen {
            self.transition_to_closed();
        }
    }

    /// Record a failed request.
    pub fn record_failure(&self) {
        let current_state = self.state();
        match current_state {
            CircuitState::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures >= self.config.failure_threshold {
                    debug!(
                        provider = %self.provider_id,
                        failures = failures,
                        threshold = self.config.failure_threshold,
                        "circuit breaker consecutive failure threshold reached"
                    );
                    self.transition_to_open();
                }
            }
            CircuitState::HalfOpen => {
                debug!(provider = %self.provider_id, "half-open probe failed, reopening");
                self.transition_to_open();
            }
            CircuitState::Open => {}
        }
    }

    fn should_attempt_reset(&self) -> bool {
        let opened_at = self.opened_at.load(Ordering::Acquire);
        if opened_at == 0 {
            return false;
        }

        let now = now_millis();
        let elapsed = now.saturating_sub(opened_at);
        elapsed >= self.config.reset_timeout.as_millis() as u64
    }

    fn transition_to_open(&self) {
        let _guard = self.transition_lock.write();

        self.state.store(CircuitState::Open as u8, Ordering::Release);
        self.opened_at.store(now_millis(), Ordering::Release);

        warn!(provider = %self.provider_id, "circuit breaker opened");
    }

    fn transition_to_half_open(&self) {
        let _guard = self.transition_lock.write();

        let prev_state = self
            .state
            .swap(CircuitState::HalfOpen as u8, Ordering::Release);

        if prev_state == CircuitState::Open as u8 {
            info!(provider = %self.provider_id, "circuit breaker half-open, probing");
        }
    }

    fn transition_to_closed(&self) {
        let _guard = self.transition_lock.write();

        self.state
            .store(CircuitState::Closed as u8, Ordering::Release);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.opened_at.store(0, Ordering::Release);

        info!(provider = %self.provider_id, "circuit breaker closed");
    }

    /// Force the circuit back to closed state.
    pub fn reset(&self) {
        self.transition_to_closed();
    }

    /// Force the circuit open (manual intervention / testing).
    pub fn force_open(&self) {
        self.transition_to_open();
    }

    /// Current statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> CircuitBreakerStats {
        CircuitBreakerStats {
            state: self.state(),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
        }
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Circuit breaker statistics
#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    /// Current state
    pub state: CircuitState,
    /// Current consecutive failure count
    pub consecutive_failures: u32,
}
