//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP /health/*
//!     → aggregator.rs (fan out, one deadline per check)
//!     → checks.rs (redis → ConnectionManager, eventStream → ProcessStatus)
//!     → result.rs (per-check result, combined status)
//! ```
//!
//! # Design Decisions
//! - Results are computed per request and never cached
//! - Unhealthy dominates degraded, degraded dominates healthy
//! - A timed-out check is unhealthy and marked `timeout: true`

pub mod aggregator;
pub mod checks;
pub mod result;

pub use aggregator::{DetailedHealth, HealthAggregator, Liveness, Readiness};
pub use checks::{ConnectionCheck, HealthCheck, StreamActivityCheck};
pub use result::{CheckStatus, HealthCheckResult};
