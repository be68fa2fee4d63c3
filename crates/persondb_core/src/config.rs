//! Runtime configuration resolved from the environment.
//!
//! # Invariants
//! - A missing database path selects an in-memory database.
//! - Empty values are treated as unset.
//! - `log_level` is checked even when file logging is disabled.

use crate::logging::{default_log_level, normalize_level, LoggingError};
use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::path::PathBuf;

/// Prefix of every store variable: `PERSONDB_DATABASE_PATH`,
/// `PERSONDB_LOG_LEVEL`, `PERSONDB_LOG_DIR`.
pub const ENV_PREFIX: &str = "PERSONDB";

/// Store settings shared by the CLI and embedding applications.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file; `None` opens an in-memory database.
    pub database_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl StoreConfig {
    /// Resolves configuration from `PERSONDB_*` process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Environment::with_prefix(ENV_PREFIX))
    }

    /// Resolves configuration from an explicit variable map, keyed by full
    /// variable name (`PERSONDB_LOG_LEVEL`).
    pub fn from_vars(vars: config::Map<String, String>) -> Result<Self, ConfigError> {
        Self::load(Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }

    fn load(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(environment.ignore_empty(true))
            .build()?
            .try_deserialize()
    }

    /// Rejects an unknown `log_level`, whether or not `log_dir` is set.
    pub fn validate(&self) -> Result<(), LoggingError> {
        normalize_level(&self.log_level).map(|_| ())
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::StoreConfig;
    use crate::logging::{default_log_level, LoggingError};
    use std::path::PathBuf;

    fn vars(pairs: &[(&str, &str)]) -> config::Map<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = StoreConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert!(config.is_in_memory());
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn prefixed_variables_are_read() {
        let config = StoreConfig::from_vars(vars(&[
            ("PERSONDB_DATABASE_PATH", "/tmp/people.sqlite3"),
            ("PERSONDB_LOG_LEVEL", "warn"),
            ("PERSONDB_LOG_DIR", "/var/log/persondb"),
            ("OTHER_LOG_LEVEL", "trace"),
        ]))
        .unwrap();
        assert_eq!(
            config.database_path,
            Some(PathBuf::from("/tmp/people.sqlite3"))
        );
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/persondb")));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = StoreConfig::from_vars(vars(&[
            ("PERSONDB_DATABASE_PATH", ""),
            ("PERSONDB_LOG_LEVEL", ""),
        ]))
        .unwrap();
        assert!(config.is_in_memory());
        assert_eq!(config.log_level, default_log_level());
    }

    #[test]
    fn validate_checks_level_without_log_dir() {
        let config = StoreConfig {
            log_level: "loud".to_string(),
            ..StoreConfig::default()
        };
        assert_eq!(config.log_dir, None);
        assert_eq!(
            config.validate().unwrap_err(),
            LoggingError::UnsupportedLevel("loud".to_string())
        );

        let config = StoreConfig {
            log_level: " WARNING ".to_string(),
            ..StoreConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
