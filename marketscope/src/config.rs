//! Configuration for marketscope.
//!
//! TOML-based configuration with defaults suitable for local development.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MarketscopeError, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MarketscopeConfig {
    pub query: QueryConfig,
    pub pool: PoolConfig,
}

/// Query execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Query timeout in milliseconds (default: 30000).
    pub timeout_ms: u64,
    /// Default row cap for prospect listings when the request gives none.
    pub default_prospect_limit: i64,
    /// Hard upper bound on prospect listings (0 = unlimited).
    pub max_prospect_limit: i64,
}

/// Connection pooling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum pool size (default: 16).
    pub size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            default_prospect_limit: 100,
            max_prospect_limit: 10_000,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { size: 16 }
    }
}

impl MarketscopeConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| MarketscopeError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| MarketscopeError::Config(format!("failed to parse config: {e}")))
    }

    /// Load from default locations (env var, cwd, or defaults).
    ///
    /// Search order:
    /// 1. `MARKETSCOPE_CONFIG` environment variable
    /// 2. `./marketscope.toml` (current directory)
    /// 3. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("MARKETSCOPE_CONFIG") {
            if let Ok(cfg) = Self::from_file(&path) {
                tracing::info!(path = %path, "loaded config from MARKETSCOPE_CONFIG");
                return cfg;
            }
        }

        if let Ok(cfg) = Self::from_file("marketscope.toml") {
            tracing::info!("loaded config from ./marketscope.toml");
            return cfg;
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }

    /// Clamp a requested prospect limit against the configured caps.
    pub fn effective_prospect_limit(&self, requested: Option<i64>) -> i64 {
        let limit = requested.unwrap_or(self.query.default_prospect_limit);
        if self.query.max_prospect_limit > 0 {
            limit.min(self.query.max_prospect_limit)
        } else {
            limit
        }
    }
}
