//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and formats.
//! Every problem is reported, not just the first one.

use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// Ceiling for every timeout. Deadlines are computed as `now + timeout`.
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a valid socket address")]
    BindAddress(String),
    #[error("listener.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,
    #[error("admin.token must not be empty")]
    EmptyAdminToken,
    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,
    #[error("shutdown.drain_timeout_secs must be greater than zero")]
    ZeroDrainTimeout,
    #[error("shutdown.poll_interval_ms must be greater than zero")]
    ZeroPollInterval,
    #[error("health.check_timeout_secs must be greater than zero")]
    ZeroCheckTimeout,
    #[error("{field} must not exceed {max} seconds")]
    TimeoutTooLarge { field: &'static str, max: u64 },
}

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }
    if config.admin.token.trim().is_empty() {
        errors.push(ValidationError::EmptyAdminToken);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if config.shutdown.drain_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDrainTimeout);
    }
    if config.shutdown.poll_interval_ms == 0 {
        errors.push(ValidationError::ZeroPollInterval);
    }
    if config.health.check_timeout_secs == 0 {
        errors.push(ValidationError::ZeroCheckTimeout);
    }

    let bounded = [
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("shutdown.drain_timeout_secs", config.shutdown.drain_timeout_secs),
        ("shutdown.poll_interval_ms", config.shutdown.poll_interval_ms / 1000),
        ("health.check_timeout_secs", config.health.check_timeout_secs),
    ];
    for (field, secs) in bounded {
        if secs > MAX_TIMEOUT_SECS {
            errors.push(ValidationError::TimeoutTooLarge {
                field,
                max: MAX_TIMEOUT_SECS,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
