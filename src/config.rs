//! Configuration for the migration tool and the RPC layer.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{Backend, MySql, Postgres, Sqlite};
use crate::store::DEFAULT_LEDGER_TABLE;
use crate::upstream::{ExternalDataOrigin, RetryPolicy};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sqlite,
    #[default]
    Postgres,
    Mysql,
}

impl BackendKind {
    pub fn backend(self) -> &'static dyn Backend {
        match self {
            BackendKind::Sqlite => &Sqlite,
            BackendKind::Postgres => &Postgres,
            BackendKind::Mysql => &MySql,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: BackendKind,
    /// `postgres://` / `mysql://` URL, or a SQLite file path.
    pub url: String,
    pub ledger_table: String,
    /// Apply pending records that sort before the latest applied one.
    pub allow_unordered: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            url: "postgres://localhost/catalogi".to_string(),
            ledger_table: DEFAULT_LEDGER_TABLE.to_string(),
            allow_unordered: false,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub external_data_origin: ExternalDataOrigin,
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            log_level: "info".to_string(),
            external_data_origin: ExternalDataOrigin::default(),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Reads `path` when given, otherwise falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid("database.url is empty".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
