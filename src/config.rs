//! Resolver configuration
//!
//! One `ResolverConfig` is owned by a [`crate::QueryResolver`] and threaded
//! into every request it serves. It can be built in code or loaded from
//! YAML:
//!
//! ```yaml
//! max_depth: 8
//! batch_size: 200
//! batch_window_ms: 2
//! limits:
//!   default_limit: 50
//!   max_limit: 500
//! ```
//!
//! Without a `limits` section list queries are unbounded unless the request
//! passes a non-negative `limit`.

use crate::resolve::{LimitConfig, LoaderConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Invalid or unreadable configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("max depth must be greater than 0, got {0}")]
    InvalidMaxDepth(usize),

    #[error("batch size must be greater than 0")]
    InvalidBatchSize,

    #[error("batch window must be greater than 0")]
    InvalidBatchWindow,

    #[error("max limit must be greater than 0, got {0}")]
    InvalidMaxLimit(usize),

    #[error("default limit must be greater than 0 and at most max limit {max}, got {default}")]
    InvalidDefaultLimit { default: usize, max: usize },

    #[error("max complexity must be greater than 0")]
    InvalidMaxComplexity,

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Deepest relationship nesting a request may select
    pub max_depth: usize,
    /// Keys per loader batch before an early dispatch
    pub batch_size: usize,
    /// Loader accumulation window
    #[serde(rename = "batch_window_ms", with = "duration_ms")]
    pub batch_window: Duration,
    /// Server-side list limits; `None` leaves `limit` to the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<LimitConfig>,
    /// Highest complexity score a request may reach
    pub max_complexity: usize,
    /// Assumed size of a list field without limit/first/last
    pub default_list_limit: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            batch_size: 100,
            batch_window: Duration::from_millis(1),
            limits: None,
            max_complexity: 10_000,
            default_list_limit: 100,
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth(self.max_depth));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        if self.batch_window.is_zero() {
            return Err(ConfigError::InvalidBatchWindow);
        }
        if let Some(limits) = &self.limits {
            if limits.max_limit == 0 {
                return Err(ConfigError::InvalidMaxLimit(limits.max_limit));
            }
            if limits.default_limit == 0 || limits.default_limit > limits.max_limit {
                return Err(ConfigError::InvalidDefaultLimit {
                    default: limits.default_limit,
                    max: limits.max_limit,
                });
            }
        }
        if self.max_complexity == 0 {
            return Err(ConfigError::InvalidMaxComplexity);
        }
        Ok(())
    }

    /// Parse and validate YAML; omitted keys keep their defaults
    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        let config: ResolverConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        info!("Loaded resolver configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            batch_size: self.batch_size,
            window: self.batch_window,
        }
    }

    pub fn limit_config(&self) -> Option<LimitConfig> {
        self.limits
    }
}
