//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment
//!     → loader.rs (envconfig → RawConfig)
//!     → validation.rs (semantic checks, URL assembly)
//!     → Settings (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no reload
//! - Every optional variable has a default so a minimal deployment sets three
//! - Any violation is fatal before the service starts

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_from_env, load_from_map, ConfigError};
pub use schema::{RedisSettings, Settings};
pub use validation::{ConfigViolation, Validated};
