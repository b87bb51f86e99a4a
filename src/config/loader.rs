//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyOptions;
use crate::config::validation::{validate_options, ValidationError};

/// Error type for configuration loading and handler setup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid proxy handler options ({route}): {}", join(.errors))]
    Validation {
        route: String,
        errors: Vec<ValidationError>,
    },

    #[error("TLS setup failed: {0}")]
    Tls(String),
}

impl ConfigError {
    /// Validation errors carried by this error, if any.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            ConfigError::Validation { errors, .. } => errors,
            _ => &[],
        }
    }
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse options from TOML text without semantic checks.
///
/// Used for plugin-level defaults, which need not name a target.
pub fn parse_options(content: &str) -> Result<ProxyOptions, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load plugin-level default options from a TOML file.
pub fn load_defaults(path: &Path) -> Result<ProxyOptions, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_options(&content)
}

/// Load and validate route options from a TOML file.
pub fn load_route_options(path: &Path) -> Result<ProxyOptions, ConfigError> {
    let content = fs::read_to_string(path)?;
    let options = parse_options(&content)?;

    validate_options(&options).map_err(|errors| ConfigError::Validation {
        route: path.display().to_string(),
        errors,
    })?;

    Ok(options)
}
