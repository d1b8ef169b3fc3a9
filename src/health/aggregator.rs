//! Composite service health.
//!
//! # Responsibilities
//! - Liveness without I/O
//! - Readiness and detailed health from the registered checks
//! - Independent deadline per check; a slow check cannot hold up the others

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use tokio::time::Instant;

use crate::health::checks::HealthCheck;
use crate::health::result::{CheckStatus, HealthCheckResult};
use crate::observability::metrics;
use crate::resilience::with_timeout;
use crate::status::now_iso8601;

/// Default budget for each check.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Serialize)]
pub struct Liveness {
    pub status: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Readiness {
    Ready { timestamp: String },
    NotReady { reason: String, timestamp: String },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceReport {
    pub name: String,
    pub version: String,
    /// Whole seconds since the aggregator was built.
    pub uptime: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailedHealth {
    pub status: CheckStatus,
    pub timestamp: String,
    pub service: ServiceReport,
    pub checks: BTreeMap<String, HealthCheckResult>,
}

pub struct HealthAggregator {
    checks: Vec<Arc<dyn HealthCheck>>,
    check_timeout: Duration,
    service_name: String,
    service_version: String,
    started: Instant,
}

impl HealthAggregator {
    pub fn new(service_name: impl Into<String>, service_version: impl Into<String>) -> Self {
        Self {
            checks: Vec::new(),
            check_timeout: DEFAULT_CHECK_TIMEOUT,
            service_name: service_name.into(),
            service_version: service_version.into(),
            started: Instant::now(),
        }
    }

    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    pub fn register(mut self, check: Arc<dyn HealthCheck>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn check_liveness(&self) -> Liveness {
        Liveness {
            status: "OK",
            timestamp: now_iso8601(),
        }
    }

    pub async fn check_readiness(&self) -> Readiness {
        let results = self.run_checks().await;
        let failed: Vec<&str> = results
            .iter()
            .filter(|(_, result)| !result.is_healthy())
            .map(|(name, _)| name.as_str())
            .collect();

        if failed.is_empty() {
            Readiness::Ready {
                timestamp: now_iso8601(),
            }
        } else {
            Readiness::NotReady {
                reason: format!("Dependencies unhealthy: {}", failed.join(", ")),
                timestamp: now_iso8601(),
            }
        }
    }

    pub async fn detailed_health(&self) -> DetailedHealth {
        let results = self.run_checks().await;
        let status = CheckStatus::combine(results.iter().map(|(_, r)| r.status));

        DetailedHealth {
            status,
            timestamp: now_iso8601(),
            service: ServiceReport {
                name: self.service_name.clone(),
                version: self.service_version.clone(),
                uptime: self.started.elapsed().as_secs(),
            },
            checks: results.into_iter().collect(),
        }
    }

    /// Run every check concurrently, each under its own deadline.
    /// Results keep registration order.
    async fn run_checks(&self) -> Vec<(String, HealthCheckResult)> {
        let budget = self.check_timeout;
        let probes = self.checks.iter().map(|check| async move {
            let start = Instant::now();
            let result = match with_timeout(check.label(), budget, check.check()).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(check = check.name(), error = %e, "Health check timed out");
                    HealthCheckResult::timed_out(e.to_string())
                }
            };
            metrics::record_health_check(check.name(), result.status.as_str(), start.elapsed());
            (check.name().to_string(), result)
        });
        join_all(probes).await
    }
}
