//! Admission control: token bucket and sliding window rate limiters.
//!
//! Both satisfy the same `{allow, wait}` contract and are safe for
//! concurrent callers behind a single mutex.

use gateway_core::GatewayError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

/// Cooperative poll interval used by `wait` when the bucket/window is
/// momentarily exhausted.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Token bucket limiter. Refill is lazy: each call computes elapsed time
/// since the last refill and tops up the bucket, capped at `capacity`.
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<TokenBucketState>,
}

struct TokenBucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a bucket with the given capacity and refill rate (tokens/sec).
    #[must_use]
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            capacity: f64::from(capacity),
            refill_per_sec,
            state: Mutex::new(TokenBucketState {
                tokens: f64::from(capacity),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Refill then try to consume one token.
    #[must_use]
    pub fn allow(&self) -> bool {
        let mut state = self.state.lock();
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Poll `allow` with a cooperative sleep until it succeeds or `ctx`
    /// (a cancellation token) fires.
    ///
    /// # Errors
    /// Returns `GatewayError::Cancelled` if the token fires first.
    pub async fn wait(&self, ctx: &tokio_util::sync::CancellationToken) -> Result<(), GatewayError> {
        loop {
            if self.allow() {
                return Ok(());
            }
            tokio::select! {
                () = tokio::time::sleep(WAIT_POLL_INTERVAL) => {}
                () = ctx.cancelled() => return Err(GatewayError::Cancelled),
            }
        }
    }
}

/// Sliding window limiter. Admits up to `max` events in any trailing
/// window of duration `window`. O(1) amortized via a deque of timestamps.
pub struct SlidingWindow {
    window: Duration,
    max: usize,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl SlidingWindow {
    /// Create a limiter admitting at most `max` events per `window`.
    #[must_use]
    pub fn new(window: Duration, max: usize) -> Self {
        Self {
            window,
            max,
            timestamps: Mutex::new(VecDeque::with_capacity(max.min(1024))),
        }
    }

    /// Drop stale timestamps, then admit if the remaining count is under
    /// the limit.
    #[must_use]
    pub fn allow(&self) -> bool {
        let now = Instant::now();
        let mut timestamps = self.timestamps.lock();
        let cutoff = now.checked_sub(self.window).unwrap_or(now);
        while matches!(timestamps.front(), Some(&t) if t < cutoff) {
            timestamps.pop_front();
        }

        if timestamps.len() < self.max {
            timestamps.push_back(now);
            true
        } else {
            debug!(window_ms = self.window.as_millis(), max = self.max, "sliding window full");
            false
        }
    }

    /// Poll `allow` with a cooperative sleep until it succeeds or `ctx`
    /// fires.
    ///
    /// # Errors
    /// Returns `GatewayError::Cancelled` if the token fires first.
    pub async fn wait(&self, ctx: &tokio_util::sync::CancellationToken) -> Result<(), GatewayError> {
        loop {
            if self.allow() {
                return Ok(());
            }
            tokio::select! {
                () = tokio::time::sleep(WAIT_POLL_INTERVAL) => {}
                () = ctx.cancelled() => return Err(GatewayError::Cancelled),
            }
        }
    }
}

/// Non-blocking admission check used by HTTP middleware: rejects
/// immediately with the `rate-limit-exceeded` error kind rather than
/// waiting.
pub fn check_admission(allowed: bool, retry_after: Option<Duration>) -> Result<(), GatewayError> {
    if allowed {
        Ok(())
    } else {
        Err(GatewayError::RateLimitExceeded { retry_after })
    }
}
