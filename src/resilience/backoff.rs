//! Scheduled backoff between connection attempts.

use std::time::Duration;

/// Delay used once the attempt index runs past the configured schedule.
pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_millis(30_000);

/// Retry policy for one connect cycle.
///
/// Immutable once built: `max_attempts >= 1` and a non-empty delay schedule
/// are enforced by [`RetryPolicy::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delays: Vec<Duration>,
    fallback_delay: Duration,
}

/// Reasons a retry policy cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("max attempts must be at least 1")]
    NoAttempts,
    #[error("at least one retry delay must be specified")]
    EmptySchedule,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        delays: Vec<Duration>,
        fallback_delay: Duration,
    ) -> Result<Self, PolicyError> {
        if max_attempts == 0 {
            return Err(PolicyError::NoAttempts);
        }
        if delays.is_empty() {
            return Err(PolicyError::EmptySchedule);
        }
        Ok(Self {
            max_attempts,
            delays,
            fallback_delay,
        })
    }

    /// Build a policy from a millisecond schedule with the default fallback.
    pub fn from_millis(max_attempts: u32, delays_ms: &[u64]) -> Result<Self, PolicyError> {
        Self::new(
            max_attempts,
            delays_ms.iter().copied().map(Duration::from_millis).collect(),
            DEFAULT_FALLBACK_DELAY,
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Delay to wait after failed attempt `attempt` (1-based) before the next one.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        self.delays
            .get(attempt as usize - 1)
            .copied()
            .unwrap_or(self.fallback_delay)
    }

    /// True if another attempt is allowed after `attempt` failures.
    pub fn has_attempts_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_follows_schedule_then_fallback() {
        let policy = RetryPolicy::from_millis(5, &[100, 200, 300]).unwrap();

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(300));
        assert_eq!(policy.delay_for(4), DEFAULT_FALLBACK_DELAY);
        assert_eq!(policy.delay_for(5), DEFAULT_FALLBACK_DELAY);
    }

    #[test]
    fn test_delay_for_every_attempt_index() {
        let schedule = [5_000, 15_000];
        let policy = RetryPolicy::new(
            4,
            schedule.iter().copied().map(Duration::from_millis).collect(),
            Duration::from_millis(42),
        )
        .unwrap();

        for attempt in 1..=policy.max_attempts() {
            let expected = schedule
                .get(attempt as usize - 1)
                .map(|ms| Duration::from_millis(*ms))
                .unwrap_or(Duration::from_millis(42));
            assert_eq!(policy.delay_for(attempt), expected, "attempt {attempt}");
        }
    }

    #[test]
    fn test_rejects_invalid_policies() {
        assert_eq!(RetryPolicy::from_millis(0, &[100]), Err(PolicyError::NoAttempts));
        assert_eq!(RetryPolicy::from_millis(3, &[]), Err(PolicyError::EmptySchedule));
    }

    #[test]
    fn test_attempt_budget() {
        let policy = RetryPolicy::from_millis(3, &[1]).unwrap();
        assert!(policy.has_attempts_after(1));
        assert!(policy.has_attempts_after(2));
        assert!(!policy.has_attempts_after(3));
    }
}
