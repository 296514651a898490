//! Write pacing within a tick

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use std::time::Duration;

use crate::config::PacingMode;

/// Per-worker pacer for [`PacingMode::Spread`]
///
/// Holds a token bucket that releases one write every
/// `tick_interval / batch_size`, so a batch is spread over its tick instead of
/// being submitted back to back. In [`PacingMode::Burst`] the pacer is a no-op
/// and the worker relies on the sleep between ticks alone.
pub struct TickPacer {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    period: Option<Duration>,
}

impl TickPacer {
    /// Create a pacer for the given mode and batch shape
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use tsload_core::config::PacingMode;
    /// use tsload_core::worker::TickPacer;
    ///
    /// // 100 writes per one-second tick: one write every 10ms
    /// let pacer = TickPacer::new(PacingMode::Spread, 100, Duration::from_secs(1));
    /// assert!(pacer.is_enabled());
    ///
    /// let burst = TickPacer::new(PacingMode::Burst, 100, Duration::from_secs(1));
    /// assert!(!burst.is_enabled());
    /// ```
    pub fn new(mode: PacingMode, batch_size: usize, tick_interval: Duration) -> Self {
        if mode == PacingMode::Burst || batch_size == 0 {
            return Self::disabled();
        }

        let period = tick_interval / batch_size.min(u32::MAX as usize) as u32;
        match Quota::with_period(period) {
            Some(quota) => Self {
                limiter: Some(RateLimiter::direct(quota)),
                period: Some(period),
            },
            // Sub-nanosecond spacing: nothing to spread
            None => Self::disabled(),
        }
    }

    /// Create a pacer that never waits
    pub fn disabled() -> Self {
        Self {
            limiter: None,
            period: None,
        }
    }

    /// Wait until the next write is allowed
    ///
    /// Returns immediately when pacing is disabled.
    pub async fn wait(&self) {
        if let Some(ref limiter) = self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Check if pacing is enabled
    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Spacing between two writes, if pacing is enabled
    pub fn period(&self) -> Option<Duration> {
        self.period
    }
}

impl Default for TickPacer {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for TickPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickPacer")
            .field("period", &self.period)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
