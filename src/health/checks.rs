//! Registered dependency checks.

use std::sync::Arc;

use async_trait::async_trait;

use crate::connection::ConnectionManager;
use crate::health::result::HealthCheckResult;
use crate::status::{iso8601, ProcessStatus};

/// One dependency probe run by the aggregator.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Key under which the result is reported.
    fn name(&self) -> &str;

    /// Human label used in timeout messages.
    fn label(&self) -> &str;

    async fn check(&self) -> HealthCheckResult;
}

/// `redis`: a fresh probe through the connection manager.
pub struct ConnectionCheck {
    connection: Arc<ConnectionManager>,
}

impl ConnectionCheck {
    pub fn new(connection: Arc<ConnectionManager>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl HealthCheck for ConnectionCheck {
    fn name(&self) -> &str {
        "redis"
    }

    fn label(&self) -> &str {
        "Redis health check"
    }

    async fn check(&self) -> HealthCheckResult {
        self.connection.check_connection().await
    }
}

/// `eventStream`: healthy iff the consumer loop is reading.
pub struct StreamActivityCheck {
    status: Arc<ProcessStatus>,
}

impl StreamActivityCheck {
    pub fn new(status: Arc<ProcessStatus>) -> Self {
        Self { status }
    }
}

#[async_trait]
impl HealthCheck for StreamActivityCheck {
    fn name(&self) -> &str {
        "eventStream"
    }

    fn label(&self) -> &str {
        "Event stream health check"
    }

    async fn check(&self) -> HealthCheckResult {
        let active = self.status.is_stream_active();
        let mut result = if active {
            HealthCheckResult::healthy()
        } else {
            HealthCheckResult::unhealthy("Event stream consumer inactive")
        };
        result.consumer_active = Some(active);
        result.last_message = Some(self.status.last_message().map(iso8601));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::CheckStatus;
    use chrono::Utc;

    #[tokio::test]
    async fn test_stream_check_follows_flag() {
        let status = Arc::new(ProcessStatus::new());
        let check = StreamActivityCheck::new(status.clone());

        let inactive = check.check().await;
        assert_eq!(inactive.status, CheckStatus::Unhealthy);
        assert_eq!(inactive.consumer_active, Some(false));
        assert_eq!(inactive.last_message, Some(None));

        status.set_stream_active(true);
        status.record_message(Utc::now());
        let active = check.check().await;
        assert!(active.is_healthy());
        assert!(matches!(active.last_message, Some(Some(_))));
    }
}
