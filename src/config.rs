//! Configuration
//!
//! Cart pricing settings, loadable from YAML.

use std::{fs, path::Path};

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading a configuration file
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_norway::Error),
}

/// Cart construction settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CartConfig {
    /// Unit prices include tax (gross pricing)
    pub prices_with_vat: bool,

    /// Decimal places monetary amounts are rounded to; must not be negative
    pub rounding_decimals: i32,
}

impl CartConfig {
    /// Parse configuration from a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the document is not valid configuration.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_norway::from_str(yaml)?)
    }

    /// Read configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml(&contents)
    }
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            prices_with_vat: true,
            rounding_decimals: 2,
        }
    }
}
