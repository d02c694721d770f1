//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. All problems are
//! collected and returned together rather than stopping at the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::observability::logging::{is_valid_level, LogFormat};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("observability.log_level: unknown level '{0}'")]
    InvalidLogLevel(String),

    #[error("observability.log_format: expected 'pretty' or 'json', got '{0}'")]
    InvalidLogFormat(String),

    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingAdminKey,

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address("listener.bind_address", &config.listener.bind_address, &mut errors);

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.request_secs"));
    }

    let obs = &config.observability;
    if !is_valid_level(&obs.log_level) {
        errors.push(ValidationError::InvalidLogLevel(obs.log_level.clone()));
    }
    if LogFormat::parse(&obs.log_format).is_none() {
        errors.push(ValidationError::InvalidLogFormat(obs.log_format.clone()));
    }
    if obs.metrics_enabled {
        check_address("observability.metrics_address", &obs.metrics_address, &mut errors);
    }

    let admin = &config.admin;
    if admin.enabled {
        check_address("admin.bind_address", &admin.bind_address, &mut errors);
        if admin.api_key.trim().is_empty() {
            errors.push(ValidationError::MissingAdminKey);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
