//! Process-wide status registry.
//!
//! # Responsibilities
//! - Shutdown flag (guards the single shutdown sequence)
//! - Stream-active flag (read by the event stream health check)
//! - Timestamp of the last consumed message
//! - Timestamp of the last accepted test event (rate limiting)
//!
//! # Design Decisions
//! - One instance built at startup and shared by `Arc`; no module-level globals
//! - Independent fields, last write wins
//! - Atomics for flags and timestamps; the shutdown flag is claimed with a
//!   compare-and-set so two shutdown sequences can never interleave

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use tokio::time::Instant;

/// Sentinel stored in `last_message_ms` before the first message arrives.
const NEVER: i64 = i64::MIN;

/// Shared mutable state of the running process.
#[derive(Debug)]
pub struct ProcessStatus {
    shutting_down: AtomicBool,
    stream_active: AtomicBool,
    last_message_ms: AtomicI64,
    last_test_event: Mutex<Option<Instant>>,
}

impl ProcessStatus {
    pub fn new() -> Self {
        Self {
            shutting_down: AtomicBool::new(false),
            stream_active: AtomicBool::new(false),
            last_message_ms: AtomicI64::new(NEVER),
            last_test_event: Mutex::new(None),
        }
    }

    /// Returns true once shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Claim the shutdown transition. Only the first caller gets `true`.
    pub fn try_begin_shutdown(&self) -> bool {
        self.shutting_down
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_stream_active(&self) -> bool {
        self.stream_active.load(Ordering::Relaxed)
    }

    pub fn set_stream_active(&self, active: bool) {
        self.stream_active.store(active, Ordering::Relaxed);
    }

    /// Record that a valid message was consumed at `at`.
    pub fn record_message(&self, at: DateTime<Utc>) {
        self.last_message_ms
            .store(at.timestamp_millis(), Ordering::Relaxed);
    }

    /// When the last valid message was consumed, if ever.
    pub fn last_message(&self) -> Option<DateTime<Utc>> {
        match self.last_message_ms.load(Ordering::Relaxed) {
            NEVER => None,
            ms => Utc.timestamp_millis_opt(ms).single(),
        }
    }

    /// Exclusive access to the last accepted test event instant.
    ///
    /// Callers check and update the slot under the same guard.
    pub fn test_event_slot(&self) -> MutexGuard<'_, Option<Instant>> {
        match self.last_test_event.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for ProcessStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a timestamp the way every JSON body in this service does
/// (`2024-05-01T12:00:00.000Z`).
pub fn iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time rendered with [`iso8601`].
pub fn now_iso8601() -> String {
    iso8601(Utc::now())
}
