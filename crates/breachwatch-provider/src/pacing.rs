//! Client-side call pacing for rate-limited providers.
//!
//! A [`Pacer`] enforces a minimum interval between successive calls. It is
//! created per provider invocation, so concurrent searches against the same
//! provider each get their own pacing state.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Monotonic time source with an async sleep.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Suspend for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// [`Clock`] backed by the tokio timer.
///
/// Honors `tokio::time::pause()` in tests.
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    /// Create a clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Enforces a minimum spacing between successive outbound calls.
pub struct Pacer {
    clock: Arc<dyn Clock>,
    min_interval: Duration,
    last_call_at: Option<Duration>,
}

impl Pacer {
    /// Create a pacer with an explicit minimum interval.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, min_interval: Duration) -> Self {
        Self {
            clock,
            min_interval,
            last_call_at: None,
        }
    }

    /// Minimum interval for a rate, or `None` if the rate is not a finite
    /// positive number whose interval fits in a `Duration`.
    #[must_use]
    pub fn interval_for_rate(queries_per_second: f64) -> Option<Duration> {
        if !queries_per_second.is_finite() || queries_per_second <= 0.0 {
            return None;
        }
        Duration::try_from_secs_f64(1.0 / queries_per_second).ok()
    }

    /// Sleep until the next call is allowed. Returns the time slept.
    pub async fn wait(&self) -> Duration {
        let Some(last_call_at) = self.last_call_at else {
            return Duration::ZERO;
        };

        let elapsed = self.clock.now().saturating_sub(last_call_at);
        let remaining = self.min_interval.saturating_sub(elapsed);
        if !remaining.is_zero() {
            debug!(?remaining, "pacing outbound call");
            self.clock.sleep(remaining).await;
        }
        remaining
    }

    /// Record that a call just completed.
    pub fn mark(&mut self) {
        self.last_call_at = Some(self.clock.now());
    }

    /// Wait for the pacing window, run `call`, then record its completion.
    ///
    /// Completion is recorded whatever the call's outcome.
    pub async fn paced<F, Fut, T>(&mut self, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.wait().await;
        let output = call().await;
        self.mark();
        output
    }
}
