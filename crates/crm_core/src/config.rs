//! Runtime configuration for the customer store and its adapters.
//!
//! # Responsibility
//! - Load settings from an optional TOML file.
//! - Apply `CRM_*` environment overrides on top of file values.
//! - Validate the merged result before anything opens the database.
//!
//! # Invariants
//! - Precedence is defaults < file < environment.
//! - A validated config always carries a normalized log level.

use crate::logging::{default_log_level, normalize_level};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATABASE_FILE: &str = "crm.sqlite3";
pub const ENV_DATABASE_PATH: &str = "CRM_DATABASE_PATH";
pub const ENV_LOG_LEVEL: &str = "CRM_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CRM_LOG_DIR";

/// Merged runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrmConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_FILE),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

/// Configuration loading errors.
#[derive(Debug)]
pub enum ConfigError {
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        origin: String,
        source: toml::de::Error,
    },
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "could not read config file `{}`: {source}", path.display())
            }
            Self::Parse { origin, source } => {
                write!(f, "could not parse config from {origin}: {source}")
            }
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid value `{value}` for `{key}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl CrmConfig {
    /// Loads defaults, then `path` (when given), then process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(std::env::vars());
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            origin: format!("`{}`", path.display()),
            source,
        })
    }

    /// Parses inline TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            origin: "inline text".to_string(),
            source,
        })
    }

    /// Applies `CRM_*` overrides from `(key, value)` pairs. Empty values are
    /// ignored so an exported-but-blank variable does not erase file settings.
    pub fn apply_env<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if value.trim().is_empty() {
                continue;
            }
            match key.as_str() {
                ENV_DATABASE_PATH => self.database_path = PathBuf::from(value),
                ENV_LOG_LEVEL => self.log_level = value,
                ENV_LOG_DIR => self.log_dir = Some(PathBuf::from(value)),
                _ => {}
            }
        }
    }

    /// Checks values and normalizes `log_level`.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "database_path",
                value: String::new(),
                reason: "must not be empty".to_string(),
            });
        }

        self.log_level = normalize_level(&self.log_level)
            .map_err(|err| ConfigError::InvalidValue {
                key: "log_level",
                value: self.log_level.clone(),
                reason: err.to_string(),
            })?
            .to_string();

        if let Some(log_dir) = &self.log_dir {
            if !log_dir.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    key: "log_dir",
                    value: log_dir.display().to_string(),
                    reason: "must be an absolute path".to_string(),
                });
            }
        }

        Ok(())
    }
}
