//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! POST /trigger-test-event
//!     → rate_limit.rs (one request per window, process wide)
//!     → publish
//! ```
//!
//! # Design Decisions
//! - Fail closed: a limited request never reaches the backend
//! - Limiter state belongs to the process status, not to a global

pub mod rate_limit;

pub use rate_limit::{RateLimited, TestEventLimiter};
