//! Configuration schema definitions.
//!
//! [`RawConfig`] is read straight from the environment. Numeric and list
//! values stay as text here so that validation can report every bad value
//! at once instead of stopping at the first parse failure.
//! [`Settings`] is the validated, typed result shared with all subsystems.

use std::net::SocketAddr;
use std::time::Duration;

use envconfig::Envconfig;
use url::Url;

use crate::observability::LoggingSettings;
use crate::resilience::RetryPolicy;

/// Environment variables as read, before validation.
#[derive(Envconfig, Debug, Clone)]
pub struct RawConfig {
    #[envconfig(from = "REDIS_HOST")]
    pub redis_host: Option<String>,

    #[envconfig(from = "REDIS_PORT")]
    pub redis_port: Option<String>,

    #[envconfig(from = "REDIS_USER")]
    pub redis_user: Option<String>,

    #[envconfig(from = "REDIS_PW")]
    pub redis_password: Option<String>,

    #[envconfig(from = "REDIS_TLS_ENABLED", default = "false")]
    pub redis_tls_enabled: bool,

    #[envconfig(from = "SERVICE_NAME")]
    pub service_name: Option<String>,

    #[envconfig(from = "SERVICE_PORT", default = "8000")]
    pub service_port: String,

    #[envconfig(from = "SERVICE_VERSION", default = "1.0.0")]
    pub service_version: String,

    #[envconfig(from = "ENVIRONMENT", default = "development")]
    pub environment: String,

    #[envconfig(from = "STREAM", default = "event-stream")]
    pub stream: String,

    #[envconfig(from = "CONSUMER_NAME")]
    pub consumer_name: Option<String>,

    #[envconfig(from = "HOSTNAME")]
    pub hostname: Option<String>,

    #[envconfig(from = "CONNECTION_TIMEOUT", default = "10000")]
    pub connection_timeout_ms: String,

    #[envconfig(from = "MAX_RETRY_ATTEMPTS", default = "3")]
    pub max_retry_attempts: String,

    #[envconfig(from = "RETRY_DELAYS", default = "5000,15000,30000")]
    pub retry_delays: String,

    #[envconfig(from = "HEALTH_CHECK_TIMEOUT_MS", default = "3000")]
    pub health_check_timeout_ms: String,

    #[envconfig(from = "SHUTDOWN_TIMEOUT_SECS", default = "30")]
    pub shutdown_timeout_secs: String,

    #[envconfig(from = "PING_INTERVAL_SECS", default = "15")]
    pub ping_interval_secs: String,

    #[envconfig(from = "TEST_EVENT_INTERVAL_SECS", default = "0")]
    pub test_event_interval_secs: String,

    #[envconfig(from = "REQUEST_TIMEOUT_SECS", default = "30")]
    pub request_timeout_secs: String,

    #[envconfig(from = "LOG_LEVEL")]
    pub log_level: Option<String>,

    #[envconfig(from = "LOG_FORMAT")]
    pub log_format: Option<String>,

    #[envconfig(from = "METRICS_ENABLED", default = "false")]
    pub metrics_enabled: bool,

    #[envconfig(from = "METRICS_ADDRESS", default = "0.0.0.0:9090")]
    pub metrics_address: String,
}

/// Validated service configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub service: ServiceSettings,
    pub redis: RedisSettings,
    pub stream: StreamSettings,
    pub connection: ConnectionSettings,
    pub health: HealthSettings,
    pub lifecycle: LifecycleSettings,
    pub http: HttpSettings,
    pub logging: LoggingSettings,
    pub metrics: MetricsSettings,
}

/// Service identity, reported by `/health` and the startup banner.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub name: String,
    pub version: String,
    pub environment: String,
    pub port: u16,
}

/// Redis connection target.
#[derive(Clone)]
pub struct RedisSettings {
    /// Full connection URL; may contain credentials.
    pub url: Url,

    /// Budget for opening a connection and for each command response.
    pub connection_timeout: Duration,
}

impl RedisSettings {
    /// The URL with any password replaced by `****`, safe to log.
    pub fn masked_url(&self) -> String {
        let mut masked = self.url.clone();
        if masked.password().is_some() {
            // Only fails for cannot-be-a-base URLs, which redis URLs never are.
            let _ = masked.set_password(Some("****"));
        }
        masked.to_string()
    }
}

impl std::fmt::Debug for RedisSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSettings")
            .field("url", &self.masked_url())
            .field("connection_timeout", &self.connection_timeout)
            .finish()
    }
}

/// Stream and consumer group identity.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub name: String,
    /// Consumer group; the service name.
    pub group: String,
    pub consumer: String,
}

#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub policy: RetryPolicy,
    /// `None` disables the periodic liveness ping.
    pub ping_interval: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct HealthSettings {
    /// Independent budget for each health check.
    pub check_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// Hard deadline for the whole teardown.
    pub shutdown_timeout: Duration,
    /// `None` disables the scheduled test-event publisher.
    pub test_event_interval: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub address: SocketAddr,
}
