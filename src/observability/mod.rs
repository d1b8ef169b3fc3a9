//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (text or JSON lines)
//!     → Prometheus scrape listener (when METRICS_ENABLED)
//! ```
//!
//! # Design Decisions
//! - Every log line carries structured fields, never interpolated ids
//! - Correlation ids come from the HTTP layer (`x-correlation-id`)

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat, LogLevel, LoggingSettings};
