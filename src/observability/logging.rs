//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Map `LOG_LEVEL` / `LOG_FORMAT` onto a filter and an output layer
//!
//! # Design Decisions
//! - `RUST_LOG`, when set, overrides `LOG_LEVEL`
//! - JSON output for log shippers, plain text for terminals

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Minimum severity to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ERROR" => Ok(LogLevel::Error),
            "WARN" => Ok(LogLevel::Warn),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.directive().to_ascii_uppercase())
    }
}

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoggingSettings {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl LoggingSettings {
    /// Read `LOG_LEVEL` and `LOG_FORMAT`; unknown values fall back to the defaults.
    ///
    /// Also returns a warning for every value that was ignored, to be logged
    /// once the subscriber is installed.
    pub fn from_values(level: Option<&str>, format: Option<&str>) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let mut settings = LoggingSettings::default();

        if let Some(raw) = level {
            match raw.parse() {
                Ok(level) => settings.level = level,
                Err(e) => warnings.push(format!("LOG_LEVEL: {e}, using {}", settings.level)),
            }
        }
        if let Some(raw) = format {
            match raw.parse() {
                Ok(format) => settings.format = format,
                Err(e) => warnings.push(format!("LOG_FORMAT: {e}, using text")),
            }
        }
        (settings, warnings)
    }

    pub fn from_env() -> (Self, Vec<String>) {
        let level = std::env::var("LOG_LEVEL").ok();
        let format = std::env::var("LOG_FORMAT").ok();
        Self::from_values(level.as_deref(), format.as_deref())
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = self.level.directive();
            format!("stream_sentinel={level},tower_http={level},{level}").into()
        })
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(settings: &LoggingSettings) {
    let registry = tracing_subscriber::registry().with(settings.filter());
    let installed = match settings.format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .try_init(),
    };
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
