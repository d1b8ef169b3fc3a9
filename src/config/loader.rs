//! Configuration loading from the environment.

use std::collections::HashMap;

use envconfig::Envconfig;
use thiserror::Error;

use crate::config::schema::RawConfig;
use crate::config::validation::{validate_config, ConfigViolation, Validated};

/// Error type for configuration loading. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment error: {0}")]
    Env(#[from] envconfig::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ConfigViolation>),
}

fn join(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from process environment variables.
pub fn load_from_env() -> Result<Validated, ConfigError> {
    let raw = RawConfig::init_from_env()?;
    validate_config(&raw).map_err(ConfigError::Validation)
}

/// Load and validate configuration from an explicit map.
pub fn load_from_map(vars: &HashMap<String, String>) -> Result<Validated, ConfigError> {
    let raw = RawConfig::init_from_hashmap(vars)?;
    validate_config(&raw).map_err(ConfigError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_bool_is_env_error() {
        let vars = HashMap::from([("METRICS_ENABLED".to_string(), "yes please".to_string())]);
        assert!(matches!(load_from_map(&vars), Err(ConfigError::Env(_))));
    }

    #[test]
    fn test_validation_error_lists_every_key() {
        let err = load_from_map(&HashMap::new()).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Validation failed: "));
        assert!(message.contains("REDIS_HOST"));
        assert!(message.contains("REDIS_PORT"));
        assert!(message.contains("SERVICE_NAME"));
    }
}
