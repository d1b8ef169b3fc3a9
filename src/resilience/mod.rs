//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Connect to stream backend:
//!     → backoff.rs (retry policy: bounded attempts, scheduled delays)
//!
//! Dependency health probe:
//!     → timeouts.rs (independent deadline per check)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every dependency probe has a deadline
//! - Retry schedule is explicit, not exponential: operators pick each delay
//! - Exhausting the retry budget is fatal, never silently ignored

pub mod backoff;
pub mod timeouts;

pub use backoff::RetryPolicy;
pub use timeouts::{with_timeout, TimeoutError};
