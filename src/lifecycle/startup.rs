//! Startup orchestration.
//!
//! Fail fast: a configuration that does not load or validate is fatal.

use std::path::Path;

use crate::config::{load_config, ConfigError, RelayConfig};

/// Load the configuration file if one was given, defaults otherwise.
pub fn load_or_default(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(RelayConfig::default()),
    }
}
