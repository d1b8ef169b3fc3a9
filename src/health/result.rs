//! Health check result types.

use std::time::Duration;

use serde::Serialize;

use crate::status::now_iso8601;

/// Status of one check, or of the service as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Healthy,
    /// Reserved: no built-in check reports it.
    Degraded,
    Unhealthy,
}

impl CheckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Healthy => "healthy",
            CheckStatus::Degraded => "degraded",
            CheckStatus::Unhealthy => "unhealthy",
        }
    }

    /// Unhealthy dominates degraded, degraded dominates healthy.
    pub fn combine<I>(statuses: I) -> CheckStatus
    where
        I: IntoIterator<Item = CheckStatus>,
    {
        let mut overall = CheckStatus::Healthy;
        for status in statuses {
            match status {
                CheckStatus::Unhealthy => return CheckStatus::Unhealthy,
                CheckStatus::Degraded => overall = CheckStatus::Degraded,
                CheckStatus::Healthy => {}
            }
        }
        overall
    }
}

/// Outcome of a single check. Built fresh for every query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResult {
    pub status: CheckStatus,

    /// Round trip in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Set when the check ran out of time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<bool>,

    /// Connection attempts so far, reported while disconnected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,

    /// Last successful probe, ISO-8601.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_active: Option<bool>,

    /// Last inbound message, ISO-8601. Serialized as `null` when none yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Option<String>>,

    pub timestamp: String,
}

impl HealthCheckResult {
    fn with_status(status: CheckStatus) -> Self {
        Self {
            status,
            latency: None,
            error: None,
            timeout: None,
            attempts: None,
            last_check: None,
            consumer_active: None,
            last_message: None,
            timestamp: now_iso8601(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(CheckStatus::Healthy)
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        let mut result = Self::with_status(CheckStatus::Unhealthy);
        result.error = Some(error.into());
        result
    }

    /// Unhealthy because the check did not finish within its budget.
    pub fn timed_out(error: impl Into<String>) -> Self {
        let mut result = Self::unhealthy(error);
        result.timeout = Some(true);
        result
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency.as_millis() as u64);
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }

    pub fn with_last_check(mut self, last_check: Option<String>) -> Self {
        self.last_check = last_check;
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status == CheckStatus::Healthy
    }
}
