// Holdings acquisition from the fund provider's rendered pages.

pub mod vanguard;

pub use vanguard::{FetchSettings, VanguardSource};

use async_trait::async_trait;

use crate::error::FetchError;
use crate::holdings::FundHoldings;

/// A source of per-fund holdings tables.
///
/// The production implementation drives a headless browser; tests inject
/// canned providers. Implementations never write the cache — that is the
/// caller's job.
#[async_trait]
pub trait HoldingsProvider: Send + Sync {
    async fn fetch(&self, fund_id: &str) -> Result<FundHoldings, FetchError>;

    fn name(&self) -> &str;
}
