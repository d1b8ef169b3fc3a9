//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap dependency calls with a deadline
//! - Report which operation ran out of time
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the inner future is dropped on expiry
//! - Timeout errors are distinct from the operation's own errors

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// An operation did not finish within its budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} timeout after {}ms", .after.as_millis())]
pub struct TimeoutError {
    pub operation: String,
    pub after: Duration,
}

/// Run `future`, giving up after `budget`.
pub async fn with_timeout<F, T>(
    operation: &str,
    budget: Duration,
    future: F,
) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(budget, future)
        .await
        .map_err(|_| TimeoutError {
            operation: operation.to_string(),
            after: budget,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fast_operation_passes_through() {
        let result = with_timeout("fast", Duration::from_millis(50), async { 7 }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_operation_times_out() {
        let result = with_timeout("Redis health check", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.after, Duration::from_millis(50));
        assert_eq!(err.to_string(), "Redis health check timeout after 50ms");
    }
}
