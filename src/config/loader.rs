//! Configuration loading from disk and the process environment.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::config::schema::{AppConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value '{value}' for {key}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the runtime configuration: optional file, then environment overrides.
pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let base = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    let config = apply_env_overrides(base, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// Empty values are ignored, matching an unset variable.
pub fn apply_env_overrides<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(port) = get("APP_PORT") {
        let port: u16 = port.parse().map_err(|_| ConfigError::InvalidEnv {
            key: "APP_PORT",
            value: port.clone(),
        })?;
        config.listener.bind_address = match config.listener.bind_address.parse::<SocketAddr>() {
            Ok(mut addr) => {
                addr.set_port(port);
                addr.to_string()
            }
            Err(_) => format!("0.0.0.0:{}", port),
        };
    }

    if let Some(token) = get("ADMIN_TOKEN") {
        config.admin.token = token;
    }

    if let Some(level) = get("LOG_LEVEL") {
        config.observability.log_level = level;
    }

    if let Some(environment) = get("ENVIRONMENT") {
        if environment == "production" {
            config.observability.log_format = LogFormat::Json;
        }
        config.observability.environment = environment;
    }

    if let Some(format) = get("LOG_FORMAT") {
        config.observability.log_format =
            format.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "LOG_FORMAT",
                value: format.clone(),
            })?;
    }

    if let Some(secs) = get("REQUEST_TIMEOUT_SECS") {
        config.timeouts.request_secs = parse_secs("REQUEST_TIMEOUT_SECS", secs)?;
    }

    if let Some(secs) = get("SHUTDOWN_TIMEOUT_SECS") {
        config.shutdown.drain_timeout_secs = parse_secs("SHUTDOWN_TIMEOUT_SECS", secs)?;
    }

    Ok(config)
}

fn parse_secs(key: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn no_overrides_keeps_defaults() {
        let config = apply_env_overrides(AppConfig::default(), env(&[])).unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.admin.token, "changeme");
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn overrides_port_token_and_level() {
        let config = apply_env_overrides(
            AppConfig::default(),
            env(&[("APP_PORT", "9000"), ("ADMIN_TOKEN", "s3cret"), ("LOG_LEVEL", "debug")]),
        )
        .unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:9000");
        assert_eq!(config.admin.token, "s3cret");
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn production_switches_to_json_logs() {
        let config =
            apply_env_overrides(AppConfig::default(), env(&[("ENVIRONMENT", "production")]))
                .unwrap();
        assert_eq!(config.observability.log_format, LogFormat::Json);

        let config = apply_env_overrides(
            AppConfig::default(),
            env(&[("ENVIRONMENT", "production"), ("LOG_FORMAT", "pretty")]),
        )
        .unwrap();
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn empty_value_is_ignored() {
        let config =
            apply_env_overrides(AppConfig::default(), env(&[("ADMIN_TOKEN", "")])).unwrap();
        assert_eq!(config.admin.token, "changeme");
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = apply_env_overrides(AppConfig::default(), env(&[("APP_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "APP_PORT", .. }));
    }

    #[test]
    fn parses_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [admin]
            token = "from-file"

            [shutdown]
            drain_timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.admin.token, "from-file");
        assert_eq!(config.shutdown.drain_timeout_secs, 5);
        assert_eq!(config.shutdown.poll_interval_ms, 1000);
        assert_eq!(config.timeouts.request_secs, 60);
    }
}
