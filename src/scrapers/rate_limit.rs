use std::sync::Arc;
use std::time::Duration;

use governor::{
    clock::DefaultClock,
    state::{direct::NotKeyed, InMemoryState},
    Quota,
};
use tracing::trace;

type DirectLimiter = governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Request budget towards the source: one request per `period`, no bursts.
///
/// Clones share the same budget, so results pages and offer pages handed the
/// same limiter are spaced against each other. The first permit is taken at
/// construction, so even the first request waits a full period.
#[derive(Clone)]
pub struct RateLimiter {
    period: Duration,
    limiter: Option<Arc<DirectLimiter>>,
}

impl RateLimiter {
    pub fn new(period: Duration) -> Self {
        let limiter = Quota::with_period(period).map(|quota| {
            let limiter = DirectLimiter::direct(quota);
            let _ = limiter.check();
            Arc::new(limiter)
        });
        Self { period, limiter }
    }

    /// A policy that never waits. Used by tests.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Waits until the next request is allowed and claims it.
    pub async fn acquire(&self) {
        let Some(limiter) = &self.limiter else {
            return;
        };
        trace!(period_ms = self.period.as_millis() as u64, "waiting for rate limit permit");
        limiter.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const PERIOD: Duration = Duration::from_millis(60);
    // Slack for the limiter clock and the test clock disagreeing slightly.
    const SLACK: Duration = Duration::from_millis(5);

    #[tokio::test]
    async fn test_first_call_waits_full_period() {
        let limiter = RateLimiter::new(PERIOD);
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() + SLACK >= PERIOD);
    }

    #[tokio::test]
    async fn test_calls_are_spaced() {
        let limiter = RateLimiter::new(PERIOD);
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() + SLACK >= PERIOD * 3);
    }

    #[tokio::test]
    async fn test_clones_share_the_budget() {
        let pages = RateLimiter::new(PERIOD);
        let offers = pages.clone();
        pages.acquire().await;
        let before = Instant::now();
        offers.acquire().await;
        pages.acquire().await;
        assert!(before.elapsed() + SLACK >= PERIOD * 2);
    }

    #[tokio::test]
    async fn test_disabled_never_waits() {
        let limiter = RateLimiter::disabled();
        let start = Instant::now();
        for _ in 0..100 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
