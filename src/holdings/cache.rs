//! Persistent fund-holdings cache
//!
//! One JSON document per fund identifier under the platform cache dir
//! (`~/.cache/lookthru/holdings/` on Linux). Entries have no TTL: a cached
//! fund is reused across runs until `cache clear` or `--refresh` discards
//! it. The storage backend is injected through [`HoldingsStore`] so the
//! cache logic stays testable without touching the real filesystem layout.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::holdings::{FundHoldings, HoldingsOrigin};
use crate::scraping::HoldingsProvider;

/// Keyed storage for fund holdings snapshots.
pub trait HoldingsStore: Send + Sync {
    fn get(&self, fund_id: &str) -> Result<Option<FundHoldings>>;
    fn put(&self, holdings: &FundHoldings) -> Result<()>;
}

/// Get-or-fetch cache over an injected store.
pub struct HoldingsCache {
    store: Box<dyn HoldingsStore>,
    refresh: bool,
}

impl HoldingsCache {
    pub fn new(store: Box<dyn HoldingsStore>) -> Self {
        Self {
            store,
            refresh: false,
        }
    }

    /// When set, cached entries are ignored on read (they are still
    /// overwritten by the fresh fetch).
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Return the cached holdings for `fund_id`, or delegate to `source`
    /// and persist the result. Fetch failures propagate unchanged and are
    /// never cached.
    pub async fn get_or_fetch(
        &self,
        fund_id: &str,
        source: &dyn HoldingsProvider,
    ) -> Result<FundHoldings, FetchError> {
        if !self.refresh {
            match self.store.get(fund_id) {
                Ok(Some(mut cached)) => {
                    debug!(
                        "{}: using cached holdings ({} rows, fetched {})",
                        fund_id,
                        cached.rows.len(),
                        cached.fetched_at
                    );
                    cached.origin = HoldingsOrigin::Cache;
                    return Ok(cached);
                }
                Ok(None) => {}
                Err(err) => {
                    // Corrupt entry: fall through to a live fetch that
                    // overwrites it on success.
                    warn!("{}: unreadable cache entry ({:#}), refetching", fund_id, err);
                }
            }
        }

        let fetched = source.fetch(fund_id).await?;
        if let Err(err) = self.store.put(&fetched) {
            warn!(
                "{}: holdings fetched but not persisted to cache: {:#}",
                fund_id, err
            );
        }
        Ok(fetched)
    }
}

/// One pretty-printed JSON file per fund.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Platform cache location for holdings files.
    pub fn default_dir() -> Result<PathBuf> {
        let cache_dir =
            dir_spec::cache_home().ok_or_else(|| anyhow!("Could not determine cache directory"))?;
        Ok(cache_dir.join("lookthru").join("holdings"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, fund_id: &str) -> PathBuf {
        self.dir.join(entry_file_name(fund_id))
    }

    /// Fund identifiers with a cached entry, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut funds = Vec::new();
        for entry in fs::read_dir(&self.dir).context("Failed to read cache directory")? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    funds.push(stem.to_string());
                }
            }
        }
        funds.sort();
        Ok(funds)
    }

    /// Delete one fund's entry, or the whole cache directory.
    pub fn clear(&self, fund_id: Option<&str>) -> Result<()> {
        if !self.dir.exists() {
            return Ok(());
        }
        match fund_id {
            Some(fund) => {
                let path = self.entry_path(fund);
                if path.exists() {
                    fs::remove_file(&path).context("Failed to delete cache file")?;
                    info!("Deleted cached holdings for {}", fund.to_ascii_uppercase());
                }
            }
            None => {
                fs::remove_dir_all(&self.dir).context("Failed to remove cache directory")?;
                info!("Cleared all cached holdings");
            }
        }
        Ok(())
    }
}

impl HoldingsStore for JsonFileStore {
    fn get(&self, fund_id: &str) -> Result<Option<FundHoldings>> {
        let path = self.entry_path(fund_id);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache entry {}", path.display()))?;
        let holdings: FundHoldings = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse cache entry {}", path.display()))?;
        Ok(Some(holdings))
    }

    fn put(&self, holdings: &FundHoldings) -> Result<()> {
        fs::create_dir_all(&self.dir).context("Failed to create cache directory")?;
        let path = self.entry_path(&holdings.fund_id);
        let json =
            serde_json::to_string_pretty(holdings).context("Failed to serialize holdings")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write cache entry {}", path.display()))?;
        debug!(
            "{}: cached {} holdings rows at {}",
            holdings.fund_id,
            holdings.rows.len(),
            path.display()
        );
        Ok(())
    }
}

/// Deterministic file name per fund: uppercased, filesystem-safe.
fn entry_file_name(fund_id: &str) -> String {
    let safe: String = fund_id
        .trim()
        .to_ascii_uppercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.json", safe)
}
