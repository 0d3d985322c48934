// src/config.rs
//! Trending configuration: TOML file with env overrides.
//!
//! Resolution order:
//! 1) `$TRENDING_CONFIG_PATH` (must exist when set)
//! 2) `config/trending.toml`
//! 3) built-in defaults
//!
//! then `TRENDING_WINDOW_SECS`, `TRENDING_RECOMPUTE_INTERVAL_SECS`,
//! `TRENDING_STORE` and `REDIS_URL` override individual fields.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::engagement::Weights;

pub const DEFAULT_CONFIG_PATH: &str = "config/trending.toml";
pub const ENV_CONFIG_PATH: &str = "TRENDING_CONFIG_PATH";
pub const ENV_WINDOW_SECS: &str = "TRENDING_WINDOW_SECS";
pub const ENV_RECOMPUTE_INTERVAL_SECS: &str = "TRENDING_RECOMPUTE_INTERVAL_SECS";
pub const ENV_STORE: &str = "TRENDING_STORE";
pub const ENV_REDIS_URL: &str = "REDIS_URL";
pub const ENV_DEV_LOG: &str = "TRENDING_DEV_LOG";
pub const ENV_LOG_FILTER: &str = "TRENDING_LOG_FILTER";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redis,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            other => Err(anyhow!("unknown store backend `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrendingConfig {
    /// Sliding window length.
    pub window_secs: u64,
    pub recompute_interval_secs: u64,
    /// Page size of `/trending` when no limit is given.
    pub default_limit: usize,
    pub max_limit: usize,
    pub store: StoreBackend,
    pub redis_url: Option<String>,
    pub weights: Weights,
    /// Compact stdout tracing in dev environments.
    pub dev_log: bool,
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            window_secs: 6 * 3600,
            recompute_interval_secs: 60,
            default_limit: 20,
            max_limit: 100,
            store: StoreBackend::Memory,
            redis_url: None,
            weights: Weights::default(),
            dev_log: false,
            log_filter: "trending=debug,info".to_string(),
        }
    }
}

impl TrendingConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn recompute_interval(&self) -> Duration {
        Duration::from_secs(self.recompute_interval_secs)
    }

    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s).context("parsing trending config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let cfg = Self::read_unvalidated(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    // Env overrides may still fill in what the file leaves out.
    fn read_unvalidated(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading trending config from {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("parsing trending config {}", path.display()))
    }

    /// File (env path, then default path, then defaults) + env overrides.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path");
            }
            Self::read_unvalidated(&pb)?
        } else {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default.exists() {
                Self::read_unvalidated(&default)?
            } else {
                info!(target: "trending", "no trending config file; using defaults");
                Self::default()
            }
        };
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_parse::<u64>(ENV_WINDOW_SECS)? {
            self.window_secs = v;
        }
        if let Some(v) = env_parse::<u64>(ENV_RECOMPUTE_INTERVAL_SECS)? {
            self.recompute_interval_secs = v;
        }
        if let Some(v) = env_parse::<StoreBackend>(ENV_STORE)? {
            self.store = v;
        }
        if let Ok(url) = std::env::var(ENV_REDIS_URL) {
            if !url.trim().is_empty() {
                self.redis_url = Some(url.trim().to_string());
            }
        }
        if let Ok(v) = std::env::var(ENV_DEV_LOG) {
            self.dev_log = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(filter) = std::env::var(ENV_LOG_FILTER) {
            if !filter.trim().is_empty() {
                self.log_filter = filter.trim().to_string();
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_secs == 0 {
            bail!("window_secs must be > 0");
        }
        if self.recompute_interval_secs == 0 {
            bail!("recompute_interval_secs must be > 0");
        }
        if self.default_limit == 0 {
            bail!("default_limit must be >= 1");
        }
        if self.max_limit < self.default_limit {
            bail!(
                "max_limit ({}) must be >= default_limit ({})",
                self.max_limit,
                self.default_limit
            );
        }
        if self.log_filter.trim().is_empty() {
            bail!("log_filter must not be empty");
        }
        if self.store == StoreBackend::Redis && self.redis_url.is_none() {
            bail!("store = \"redis\" requires redis_url (or {ENV_REDIS_URL})");
        }
        self.weights.validate()
    }

    /// Requested page size, defaulted and capped.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .min(self.max_limit)
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("invalid {key} value `{raw}`: {e}")),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = TrendingConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, TrendingConfig::default());
        assert_eq!(cfg.window(), Duration::from_secs(21_600));
        assert_eq!(cfg.recompute_interval(), Duration::from_secs(60));
    }

    #[test]
    fn partial_weights_keep_other_defaults() {
        let cfg = TrendingConfig::from_toml_str(
            r#"
window_secs = 3600

[weights]
likes = 4.0
"#,
        )
        .unwrap();
        assert_eq!(cfg.window_secs, 3600);
        assert_eq!(cfg.weights.likes, 4.0);
        assert_eq!(cfg.weights.views, 1.0);
        assert_eq!(cfg.weights.comments, 5.0);
        assert!(!cfg.dev_log);
        assert_eq!(cfg.log_filter, "trending=debug,info");
    }

    #[test]
    fn logging_keys_parse() {
        let cfg = TrendingConfig::from_toml_str(
            "dev_log = true\nlog_filter = \"trending=trace,tower_http=debug\"\n",
        )
        .unwrap();
        assert!(cfg.dev_log);
        assert_eq!(cfg.log_filter, "trending=trace,tower_http=debug");
        assert!(TrendingConfig::from_toml_str("log_filter = \"  \"").is_err());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(TrendingConfig::from_toml_str("window_secs = 0").is_err());
        assert!(TrendingConfig::from_toml_str("[weights]\nviews = -1.0").is_err());
        assert!(TrendingConfig::from_toml_str("default_limit = 50\nmax_limit = 10").is_err());
        assert!(TrendingConfig::from_toml_str("store = \"redis\"").is_err());
        assert!(TrendingConfig::from_toml_str("store = \"cassandra\"").is_err());
    }

    #[test]
    fn clamp_limit_defaults_and_caps() {
        let cfg = TrendingConfig::default();
        assert_eq!(cfg.clamp_limit(None), 20);
        assert_eq!(cfg.clamp_limit(Some(5)), 5);
        assert_eq!(cfg.clamp_limit(Some(10_000)), 100);
    }
}
