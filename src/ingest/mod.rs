//! Event ingestion subsystem.
//!
//! # Data Flow
//! ```text
//! StreamBackend::read_group
//!     → consumer.rs (one entry at a time → RawMessage + AckHandle)
//!     → pipeline.rs (validation.rs → handler.rs → ack)
//! ```
//!
//! # Design Decisions
//! - A bad message is rejected and logged; the loop moves on to the next
//! - Acknowledgment is a single-use handle, consumed by value

pub mod consumer;
pub mod handler;
pub mod message;
pub mod pipeline;
pub mod validation;

pub use consumer::StreamConsumer;
pub use handler::{EventHandler, HandlerError, LoggingHandler};
pub use message::{AckHandle, RawMessage, StreamMessage};
pub use pipeline::{Disposition, EventPipeline};
pub use validation::ValidationError;
