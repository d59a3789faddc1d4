//! Fund holdings data model
//!
//! A fund's holdings are the list of underlying companies it reports
//! owning, each with a percentage weight. Holdings are fetched once per
//! fund, normalized into [`HoldingRow`]s and persisted by the cache; the
//! same serde shape is used for the on-disk cache entries.

pub mod cache;
pub mod normalize;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One underlying company reported by the fund provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingRow {
    pub company_name: String,
    /// Provider ticker, uppercased; absent for unlisted instruments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    /// Percentage of the fund, in [0,100].
    pub weight_pct: Decimal,
    /// Reported market value of the position inside the fund, when the
    /// provider exposes it. Used to derive weights for 0.00% rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_value: Option<Decimal>,
}

/// Where a [`FundHoldings`] snapshot came from in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoldingsOrigin {
    #[default]
    Live,
    Cache,
}

impl HoldingsOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldingsOrigin::Live => "live",
            HoldingsOrigin::Cache => "cache",
        }
    }
}

/// A fund's normalized holdings table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundHoldings {
    pub fund_id: String,
    pub rows: Vec<HoldingRow>,
    pub fetched_at: DateTime<Utc>,
    /// Observed sum of `weight_pct` over all rows; kept for diagnostics
    /// (a healthy fund sums to roughly 100).
    pub weight_sum: Decimal,
    /// Run-local provenance, not persisted: entries loaded from disk are
    /// tagged `Cache` by the cache layer.
    #[serde(skip)]
    pub origin: HoldingsOrigin,
}
