//! Middleware configuration.
//!
//! ```toml
//! # valmid.toml
//! max_body_size = 65536
//! rejection_status = 422
//! ```
//!
//! Every key is optional. Unknown keys are rejected.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use valmid_extract::DEFAULT_MAX_BODY_SIZE;

/// Errors loading or checking a [`ValmidConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unknown keys.
    #[error("failed to parse TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// The offending key.
        field: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Middleware settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValmidConfig {
    /// Largest accepted request body, in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Status the default error handler replies with. Must be 4xx.
    #[serde(default = "default_rejection_status")]
    pub rejection_status: u16,
}

fn default_max_body_size() -> usize {
    DEFAULT_MAX_BODY_SIZE
}

fn default_rejection_status() -> u16 {
    StatusCode::BAD_REQUEST.as_u16()
}

impl Default for ValmidConfig {
    fn default() -> Self {
        Self {
            max_body_size: default_max_body_size(),
            rejection_status: default_rejection_status(),
        }
    }
}

impl ValmidConfig {
    /// Parses and checks a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and checks a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_body_size".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        match StatusCode::from_u16(self.rejection_status) {
            Ok(status) if status.is_client_error() => Ok(()),
            _ => Err(ConfigError::InvalidValue {
                field: "rejection_status".to_string(),
                reason: format!("{} is not a 4xx status", self.rejection_status),
            }),
        }
    }

    /// Returns the rejection status.
    ///
    /// Falls back to 400 if the value was never validated and is not a
    /// client error.
    #[must_use]
    pub fn rejection_status(&self) -> StatusCode {
        StatusCode::from_u16(self.rejection_status)
            .ok()
            .filter(StatusCode::is_client_error)
            .unwrap_or(StatusCode::BAD_REQUEST)
    }
}
