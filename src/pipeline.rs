//! The sequential look-through pipeline
//!
//! Positions are processed one at a time, in the order supplied:
//! get-or-fetch the fund's holdings, fold them into the aggregator
//! weighted by the position value, then move on. A failed fund never
//! aborts the run — it is excluded from the aggregate and surfaced in the
//! outcome so the report can say so.

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::{FetchError, Result};
use crate::holdings::cache::HoldingsCache;
use crate::holdings::HoldingsOrigin;
use crate::positions::{validate_positions, Position};
use crate::reports::{build_report, PortfolioAggregator, PortfolioReport};
use crate::scraping::HoldingsProvider;

/// One successfully processed position.
#[derive(Debug, Clone)]
pub struct PositionOutcome {
    pub fund_id: String,
    pub shares: Decimal,
    pub price: Decimal,
    pub position_value: Decimal,
    pub origin: HoldingsOrigin,
    pub holdings_count: usize,
}

/// A fund excluded from the aggregate.
#[derive(Debug)]
pub struct FailedFund {
    pub fund_id: String,
    pub error: FetchError,
}

/// Everything a caller needs to render the run: the report plus the
/// per-fund bookkeeping around it.
#[derive(Debug)]
pub struct LookthroughOutcome {
    pub processed: Vec<PositionOutcome>,
    pub failed: Vec<FailedFund>,
    pub report: PortfolioReport,
}

/// Drive the whole pipeline over a validated position set.
///
/// Validation runs first: a malformed position is a fatal configuration
/// error raised before any fetching begins.
pub async fn run_lookthrough(
    positions: &[Position],
    cache: &HoldingsCache,
    source: &dyn HoldingsProvider,
    top_n: usize,
) -> Result<LookthroughOutcome> {
    validate_positions(positions)?;

    let mut aggregator = PortfolioAggregator::new();
    let mut processed = Vec::new();
    let mut failed = Vec::new();

    for position in positions {
        let position_value = position.value();
        info!(
            "{}: processing position ({} shares @ {}, value {})",
            position.fund_id, position.shares, position.price, position_value
        );

        match cache.get_or_fetch(&position.fund_id, source).await {
            Ok(holdings) => {
                info!(
                    "{}: {} holdings rows ({})",
                    position.fund_id,
                    holdings.rows.len(),
                    holdings.origin.as_str()
                );
                aggregator.add(&holdings, position_value);
                processed.push(PositionOutcome {
                    fund_id: position.fund_id.clone(),
                    shares: position.shares,
                    price: position.price,
                    position_value,
                    origin: holdings.origin,
                    holdings_count: holdings.rows.len(),
                });
            }
            Err(error) => {
                warn!("{}: excluded from aggregate: {}", position.fund_id, error);
                failed.push(FailedFund {
                    fund_id: position.fund_id.clone(),
                    error,
                });
            }
        }
    }

    let report = build_report(aggregator.finalize(), top_n);
    Ok(LookthroughOutcome {
        processed,
        failed,
        report,
    })
}
