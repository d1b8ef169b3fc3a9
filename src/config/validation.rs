//! Configuration validation.
//!
//! # Responsibilities
//! - Turn a [`RawConfig`] into typed [`Settings`]
//! - Check value ranges (ports, retry budget, delays, durations)
//! - Build the Redis URL from host, port, credentials and TLS flag
//!
//! # Design Decisions
//! - Returns all violations, not just the first
//! - Validation is a pure function: RawConfig → Result<Validated, Vec<ConfigViolation>>
//! - Soft problems (low timeout, unknown log level) become warnings, not errors

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

use crate::config::schema::{
    ConnectionSettings, HealthSettings, HttpSettings, LifecycleSettings, MetricsSettings,
    RawConfig, RedisSettings, ServiceSettings, Settings, StreamSettings,
};
use crate::observability::LoggingSettings;
use crate::resilience::RetryPolicy;

/// Connection timeouts below this are accepted with a warning.
const MIN_RECOMMENDED_CONNECTION_TIMEOUT_MS: u64 = 1000;

/// One rejected configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigViolation {
    /// Environment variable name.
    pub key: &'static str,
    pub message: String,
}

impl ConfigViolation {
    fn new(key: &'static str, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Settings plus the non-fatal findings to log once logging is up.
#[derive(Debug, Clone)]
pub struct Validated {
    pub settings: Settings,
    pub warnings: Vec<String>,
}

/// Accumulates violations while parsing individual values.
#[derive(Default)]
struct Checker {
    violations: Vec<ConfigViolation>,
    warnings: Vec<String>,
}

impl Checker {
    fn required<'a>(&mut self, key: &'static str, value: Option<&'a str>) -> Option<&'a str> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                self.violations.push(ConfigViolation::new(
                    key,
                    format!("Required environment variable {key} is not set"),
                ));
                None
            }
        }
    }

    fn port(&mut self, key: &'static str, raw: &str) -> Option<u16> {
        match raw.trim().parse::<u16>() {
            Ok(port) if port >= 1 => Some(port),
            _ => {
                self.violations
                    .push(ConfigViolation::new(key, format!("Invalid port: {raw}")));
                None
            }
        }
    }

    fn number(&mut self, key: &'static str, raw: &str) -> Option<u64> {
        match raw.trim().parse::<u64>() {
            Ok(n) => Some(n),
            Err(_) => {
                self.violations.push(ConfigViolation::new(
                    key,
                    format!("expected a non-negative integer, got '{raw}'"),
                ));
                None
            }
        }
    }

    fn positive(&mut self, key: &'static str, raw: &str) -> Option<u64> {
        match self.number(key, raw)? {
            0 => {
                self.violations
                    .push(ConfigViolation::new(key, "must be greater than 0"));
                None
            }
            n => Some(n),
        }
    }

    /// Zero means "disabled".
    fn optional_interval(&mut self, key: &'static str, raw: &str) -> Option<Option<Duration>> {
        let secs = self.number(key, raw)?;
        Some((secs > 0).then(|| Duration::from_secs(secs)))
    }
}

fn parse_delays(raw: &str) -> Result<Vec<u64>, String> {
    let delays = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<u64>() {
            Ok(ms) if ms > 0 => Ok(ms),
            _ => Err(format!("invalid retry delay '{s}'")),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if delays.is_empty() {
        return Err("At least one retry delay must be specified".to_string());
    }
    Ok(delays)
}

/// Stream names allow alphanumerics and `.`, `_`, `:`, `-`.
pub fn is_valid_stream_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '-'))
}

fn redis_url(
    host: &str,
    port: u16,
    user: Option<&str>,
    password: Option<&str>,
    tls: bool,
) -> Result<Url, String> {
    let scheme = if tls { "rediss" } else { "redis" };
    let mut url = Url::parse(&format!("{scheme}://{host}:{port}"))
        .map_err(|e| format!("Invalid Redis host '{host}': {e}"))?;

    let user = user.filter(|u| !u.is_empty());
    let password = password.filter(|p| !p.is_empty());
    if let Some(user) = user {
        url.set_username(user)
            .map_err(|_| "Redis URL cannot carry a username".to_string())?;
    }
    if password.is_some() {
        url.set_password(password)
            .map_err(|_| "Redis URL cannot carry a password".to_string())?;
    }
    Ok(url)
}

/// Consumer identity: explicit name, else host name, else lowercase service name.
fn consumer_name(raw: &RawConfig, service_name: &str) -> String {
    [raw.consumer_name.as_deref(), raw.hostname.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| service_name.to_lowercase())
}

/// Validate raw values into [`Settings`], collecting every violation.
pub fn validate_config(raw: &RawConfig) -> Result<Validated, Vec<ConfigViolation>> {
    let mut check = Checker::default();

    let redis_host = check.required("REDIS_HOST", raw.redis_host.as_deref());
    let redis_port = check
        .required("REDIS_PORT", raw.redis_port.as_deref())
        .and_then(|p| check.port("REDIS_PORT", p));
    let service_name = check.required("SERVICE_NAME", raw.service_name.as_deref());
    let service_port = check.port("SERVICE_PORT", &raw.service_port);

    let connection_timeout_ms = check.positive("CONNECTION_TIMEOUT", &raw.connection_timeout_ms);
    if let Some(ms) = connection_timeout_ms {
        if ms < MIN_RECOMMENDED_CONNECTION_TIMEOUT_MS {
            check.warnings.push(format!(
                "Connection timeout is very low ({ms}ms), minimum recommended is {MIN_RECOMMENDED_CONNECTION_TIMEOUT_MS}ms"
            ));
        }
    }

    let max_attempts = match raw.max_retry_attempts.trim().parse::<u32>() {
        Ok(n) if n >= 1 => Some(n),
        _ => {
            check.violations.push(ConfigViolation::new(
                "MAX_RETRY_ATTEMPTS",
                "Max retry attempts must be at least 1",
            ));
            None
        }
    };
    let delays = match parse_delays(&raw.retry_delays) {
        Ok(delays) => Some(delays),
        Err(message) => {
            check
                .violations
                .push(ConfigViolation::new("RETRY_DELAYS", message));
            None
        }
    };

    let stream = raw.stream.trim();
    if !is_valid_stream_name(stream) {
        check.violations.push(ConfigViolation::new(
            "STREAM",
            format!(
                "Invalid stream name: \"{stream}\" contains invalid characters. Only alphanumeric, dots, underscores, hyphens, and colons are allowed."
            ),
        ));
    }

    let health_timeout_ms = check.positive("HEALTH_CHECK_TIMEOUT_MS", &raw.health_check_timeout_ms);
    let shutdown_secs = check.positive("SHUTDOWN_TIMEOUT_SECS", &raw.shutdown_timeout_secs);
    let request_secs = check.positive("REQUEST_TIMEOUT_SECS", &raw.request_timeout_secs);
    let ping_interval = check.optional_interval("PING_INTERVAL_SECS", &raw.ping_interval_secs);
    let test_event_interval =
        check.optional_interval("TEST_EVENT_INTERVAL_SECS", &raw.test_event_interval_secs);

    let metrics_address = match raw.metrics_address.trim().parse::<SocketAddr>() {
        Ok(addr) => Some(addr),
        Err(_) => {
            check.violations.push(ConfigViolation::new(
                "METRICS_ADDRESS",
                format!("Invalid socket address: {}", raw.metrics_address),
            ));
            None
        }
    };

    let url = match (redis_host, redis_port) {
        (Some(host), Some(port)) => match redis_url(
            host,
            port,
            raw.redis_user.as_deref(),
            raw.redis_password.as_deref(),
            raw.redis_tls_enabled,
        ) {
            Ok(url) => Some(url),
            Err(message) => {
                check
                    .violations
                    .push(ConfigViolation::new("REDIS_HOST", message));
                None
            }
        },
        _ => None,
    };

    let (logging, log_warnings) =
        LoggingSettings::from_values(raw.log_level.as_deref(), raw.log_format.as_deref());
    check.warnings.extend(log_warnings);

    let Checker {
        violations,
        warnings,
    } = check;
    if !violations.is_empty() {
        return Err(violations);
    }

    // Every value below is Some once no violation was recorded.
    let (
        Some(url),
        Some(service_name),
        Some(port),
        Some(timeout_ms),
        Some(max_attempts),
        Some(delays),
        Some(health_ms),
        Some(shutdown_secs),
        Some(request_secs),
        Some(ping_interval),
        Some(test_event_interval),
        Some(metrics_address),
    ) = (
        url,
        service_name,
        service_port,
        connection_timeout_ms,
        max_attempts,
        delays,
        health_timeout_ms,
        shutdown_secs,
        request_secs,
        ping_interval,
        test_event_interval,
        metrics_address,
    )
    else {
        return Err(vec![ConfigViolation::new(
            "CONFIG",
            "incomplete configuration",
        )]);
    };

    let policy = RetryPolicy::from_millis(max_attempts, &delays)
        .map_err(|e| vec![ConfigViolation::new("RETRY_DELAYS", e.to_string())])?;

    let settings = Settings {
        service: ServiceSettings {
            name: service_name.to_string(),
            version: raw.service_version.clone(),
            environment: raw.environment.clone(),
            port,
        },
        redis: RedisSettings {
            url,
            connection_timeout: Duration::from_millis(timeout_ms),
        },
        stream: StreamSettings {
            name: stream.to_string(),
            group: service_name.to_string(),
            consumer: consumer_name(raw, service_name),
        },
        connection: ConnectionSettings {
            policy,
            ping_interval,
        },
        health: HealthSettings {
            check_timeout: Duration::from_millis(health_ms),
        },
        lifecycle: LifecycleSettings {
            shutdown_timeout: Duration::from_secs(shutdown_secs),
            test_event_interval,
        },
        http: HttpSettings {
            request_timeout: Duration::from_secs(request_secs),
        },
        logging,
        metrics: MetricsSettings {
            enabled: raw.metrics_enabled,
            address: metrics_address,
        },
    };

    Ok(Validated { settings, warnings })
}
