//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Banner → metrics → backend → connect → jobs → HTTP → wait for signal
//!
//! Shutdown (shutdown.rs):
//!     Signal received → later signals only logged → stop HTTP
//!     → cancel jobs (jobs.rs) → disconnect → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Shutdown runs at most once per process
//! - Shutdown has a deadline: exit non-zero once it passes

pub mod jobs;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use jobs::JobSet;
pub use shutdown::{ShutdownError, ShutdownOrchestrator, ShutdownOutcome};
pub use signals::SignalListener;
