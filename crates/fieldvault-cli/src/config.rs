//! Configuration loading and validation for the fieldvault CLI.
//!
//! Only process-level settings live here. Keys and the search salt are read
//! by the library itself, from `<SETTINGS_PREFIX>_*` variables, on every
//! operation.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Validated CLI configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prefix of the environment variables holding keys, salt, and profile.
    #[serde(default = "default_settings_prefix")]
    pub settings_prefix: String,
}

fn default_log_level() -> String {
    "warn".into()
}
fn default_settings_prefix() -> String {
    fieldvault::config::ENV_PREFIX.into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build fieldvault CLI configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise fieldvault CLI configuration")?;

        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        if self.log_level.trim().is_empty() {
            anyhow::bail!("LOG_LEVEL must not be empty");
        }
        let prefix = self.settings_prefix.trim();
        if prefix.is_empty() {
            anyhow::bail!("SETTINGS_PREFIX is required and must not be empty");
        }
        if !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            anyhow::bail!("SETTINGS_PREFIX may only contain letters, digits, and '_'");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(log_level: &str, settings_prefix: &str) -> Config {
        Config {
            log_level: log_level.into(),
            settings_prefix: settings_prefix.into(),
        }
    }

    #[test]
    fn defaults() {
        assert_eq!(default_log_level(), "warn");
        assert_eq!(default_settings_prefix(), "FIELDVAULT");
    }

    #[test]
    fn validate_accepts_valid_config() {
        assert!(cfg("info", "FIELDVAULT").validate().is_ok());
        assert!(cfg("debug", "APP_PII_2").validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_log_level() {
        assert!(cfg("  ", "FIELDVAULT").validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_prefix() {
        assert!(cfg("info", "").validate().is_err());
        assert!(cfg("info", "FIELD-VAULT").validate().is_err());
    }
}
