//! Engine configuration.
//!
//! Loaded once at startup. The dialect is resolved here so an unsupported engine
//! name stops the process before the first request arrives.
//!
//! ```toml
//! dialect = "oracle"
//! default_take = 20
//! max_take = 200
//! query_timeout_ms = 15000
//! ```

use crate::dialect::SqlDialect;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors, all raised at startup.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configured dialect is not one of the supported engines.
    #[error("unsupported SQL dialect '{0}' (expected 'mysql' or 'oracle')")]
    UnsupportedDialect(String),

    /// The TOML could not be parsed.
    #[error("invalid engine configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("cannot read engine configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Values parsed but are inconsistent.
    #[error("invalid engine configuration: {0}")]
    Invalid(String),
}

/// Runtime settings for the template engine and paging coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct EngineConfig {
    /// Target SQL dialect.
    pub dialect: SqlDialect,
    /// Page size used when a paging request asks for `take = 0`.
    pub default_take: u32,
    /// Upper bound applied to every requested page size.
    pub max_take: u32,
    /// Per-query timeout; `None` waits indefinitely.
    pub query_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::MySql,
            default_take: 20,
            max_take: 500,
            query_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// On-disk shape; the dialect stays a string until [`EngineConfig::try_from`]
/// so the error names the offending engine.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    dialect: String,
    default_take: Option<u32>,
    max_take: Option<u32>,
    query_timeout_ms: Option<u64>,
}

impl TryFrom<RawConfig> for EngineConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let defaults = Self::default();
        let config = Self {
            dialect: raw.dialect.parse()?,
            default_take: raw.default_take.unwrap_or(defaults.default_take),
            max_take: raw.max_take.unwrap_or(defaults.max_take),
            query_timeout: match raw.query_timeout_ms {
                Some(0) => None,
                Some(ms) => Some(Duration::from_millis(ms)),
                None => defaults.query_timeout,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

impl EngineConfig {
    /// Create a configuration for `dialect` with default limits.
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Set the default and maximum page sizes.
    #[must_use]
    pub const fn with_take_limits(mut self, default_take: u32, max_take: u32) -> Self {
        self.default_take = default_take;
        self.max_take = max_take;
        self
    }

    /// Set the per-query timeout.
    #[must_use]
    pub const fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(s)?;
        Self::try_from(raw)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check the page-size bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_take == 0 {
            return Err(ConfigError::Invalid("default_take must be positive".into()));
        }
        if self.max_take < self.default_take {
            return Err(ConfigError::Invalid(format!(
                "max_take ({}) is smaller than default_take ({})",
                self.max_take, self.default_take
            )));
        }
        Ok(())
    }

    /// Resolve the page size for a request: `0` means "use the default",
    /// anything above the maximum is clamped.
    pub fn effective_take(&self, requested: u32) -> u32 {
        if requested == 0 {
            self.default_take
        } else {
            requested.min(self.max_take)
        }
    }
}
