//! Fixed-window limiter for the test-event trigger.
//!
//! One accepted request per window per process. The window start lives in
//! [`ProcessStatus`] so every handler instance shares it.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::status::ProcessStatus;

pub const TEST_EVENT_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Rate limit exceeded. Please wait before making another request.")]
pub struct RateLimited {
    /// Whole seconds until the window reopens, rounded up.
    pub retry_after: u64,
}

pub struct TestEventLimiter {
    status: Arc<ProcessStatus>,
    window: Duration,
}

impl TestEventLimiter {
    pub fn new(status: Arc<ProcessStatus>) -> Self {
        Self {
            status,
            window: TEST_EVENT_WINDOW,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn check(&self) -> Result<(), RateLimited> {
        self.check_at(Instant::now())
    }

    /// Accept and record `now`, or report how long to wait.
    pub fn check_at(&self, now: Instant) -> Result<(), RateLimited> {
        let mut last = self.status.test_event_slot();
        if let Some(previous) = *last {
            let elapsed = now.saturating_duration_since(previous);
            if elapsed < self.window {
                let remaining = self.window - elapsed;
                let retry_after = remaining.as_nanos().div_ceil(1_000_000_000) as u64;
                return Err(RateLimited { retry_after });
            }
        }
        *last = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> TestEventLimiter {
        TestEventLimiter::new(Arc::new(ProcessStatus::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_call_inside_window_rejected() {
        let limiter = limiter();
        let start = Instant::now();

        assert!(limiter.check_at(start).is_ok());
        let err = limiter
            .check_at(start + Duration::from_millis(400))
            .unwrap_err();
        assert_eq!(err.retry_after, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_a_window_apart_both_accepted() {
        let limiter = limiter();
        let start = Instant::now();

        assert!(limiter.check_at(start).is_ok());
        assert!(limiter.check_at(start + Duration::from_secs(1)).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_call_does_not_move_window() {
        let limiter = limiter();
        let start = Instant::now();

        limiter.check_at(start).unwrap();
        limiter
            .check_at(start + Duration::from_millis(900))
            .unwrap_err();
        assert!(limiter.check_at(start + Duration::from_millis(1000)).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_rounds_up() {
        let limiter = limiter().with_window(Duration::from_millis(2500));
        let start = Instant::now();

        limiter.check_at(start).unwrap();
        let err = limiter
            .check_at(start + Duration::from_millis(100))
            .unwrap_err();
        assert_eq!(err.retry_after, 3);
    }
}
