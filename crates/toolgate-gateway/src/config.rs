//! Gateway configuration.
//!
//! Loaded from TOML. Every section defaults to working values, so an
//! empty file (or a bare section header) produces a usable
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors from configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML did not parse.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The parsed configuration is unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Database location.
    pub database: DatabaseSection,
    /// Connection-pool lifetime policy.
    pub pool: PoolSection,
    /// Approval handling knobs.
    pub approvals: ApprovalsSection,
    /// Logging level.
    pub logging: LoggingSection,
}

/// Database location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Path of the SQLite database file.
    pub path: PathBuf,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("toolgate.db"),
        }
    }
}

/// Connection-pool lifetime policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSection {
    /// Seconds an unused downstream connection stays pooled.
    pub idle_timeout_secs: u64,
}

impl PoolSection {
    /// The idle timeout as a [`Duration`].
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 300,
        }
    }
}

/// Approval handling knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalsSection {
    /// Maximum ids accepted by one batch resolution.
    pub batch_limit: usize,
}

impl Default for ApprovalsSection {
    fn default() -> Self {
        Self { batch_limit: 64 }
    }
}

/// Logging level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default tracing filter (e.g. `info`, `toolgate=debug`).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML,
    /// [`ConfigError::Invalid`] for unusable values.
    pub fn from_toml_str(input: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, plus
    /// the conditions of [`GatewayConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let input = std::fs::read_to_string(path)?;
        Self::from_toml_str(&input)
    }

    /// Check invariants the types cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] with the first violated rule.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.approvals.batch_limit == 0 {
            return Err(ConfigError::Invalid(
                "approvals.batch_limit must be at least 1".to_string(),
            ));
        }
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "database.path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
