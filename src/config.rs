//! Runtime configuration
//!
//! Optional TOML file at the platform config dir
//! (`~/.config/lookthru/config.toml` on Linux). A missing file means
//! defaults; a malformed file is a fatal startup error rather than a
//! silent fallback.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::scraping::FetchSettings;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Retry budget per fund fetch.
    pub max_attempts: u32,
    /// Backoff before the first retry; doubles per retry.
    pub backoff_base_ms: u64,
    /// Bounded wait for the holdings table to render.
    pub table_timeout_secs: u64,
    /// Settle delay after flipping a holdings page.
    pub page_settle_ms: u64,
    pub headless: bool,
    /// Dropped-row fraction above which a fund's holdings are rejected.
    pub max_dropped_fraction: f64,
    /// Default number of top holdings in the summary.
    pub top_n: usize,
    /// Override for the holdings cache directory.
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 1000,
            table_timeout_secs: 20,
            page_settle_ms: 2000,
            headless: true,
            max_dropped_fraction: 0.2,
            top_n: 10,
            cache_dir: None,
        }
    }
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dir_spec::config_home().map(|dir| dir.join("lookthru").join("config.toml"))
    }

    /// Load the config file if present, defaults otherwise.
    pub fn load() -> Result<Self> {
        let Some(path) = Self::config_path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            max_attempts: self.max_attempts,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            table_timeout: Duration::from_secs(self.table_timeout_secs),
            page_settle: Duration::from_millis(self.page_settle_ms),
            headless: self.headless,
            max_dropped_fraction: self.max_dropped_fraction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_retry_policy() {
        let config = Config::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff_base_ms, 1000);
        assert_eq!(config.top_n, 10);
        assert!(config.headless);
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn partial_toml_overrides_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            max_attempts = 5
            top_n = 25
            cache_dir = "/tmp/lookthru-test"
            "#,
        )
        .unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.top_n, 25);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/lookthru-test")));
        // untouched knobs keep their defaults
        assert_eq!(config.table_timeout_secs, 20);
    }

    #[test]
    fn fetch_settings_carry_the_configured_durations() {
        let config = Config {
            backoff_base_ms: 250,
            table_timeout_secs: 5,
            ..Config::default()
        };
        let settings = config.fetch_settings();
        assert_eq!(settings.backoff_base, Duration::from_millis(250));
        assert_eq!(settings.table_timeout, Duration::from_secs(5));
        assert_eq!(settings.max_attempts, 3);
    }
}
