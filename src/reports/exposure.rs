//! Company-level exposure across the whole portfolio
//!
//! Each fund's holdings are weighted by the investor's position value and
//! folded into one table keyed by company identity: the ticker when the
//! provider reports one, otherwise the normalized company name. The same
//! company held through several funds merges into a single row.

use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::holdings::FundHoldings;

/// One underlying company's total dollar exposure across all funds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedHolding {
    pub company_name: String,
    pub ticker: Option<String>,
    pub total_value: Decimal,
    pub contributing_funds: BTreeSet<String>,
}

/// Identity key for merging holding rows across funds: ticker when present
/// and non-empty, else the normalized company name.
///
/// Name-only identities can merge distinct companies whose normalized
/// names coincide; that approximation is accepted rather than guessed
/// around.
pub fn resolve_identity(ticker: Option<&str>, company_name: &str) -> String {
    match ticker.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => t.to_ascii_uppercase(),
        None => normalize_company_name(company_name),
    }
}

/// NFKD-decompose, strip combining marks, casefold, collapse whitespace.
fn normalize_company_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        out.extend(ch.to_lowercase());
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Accumulates weighted exposure, one `add` per processed position.
#[derive(Debug, Default)]
pub struct PortfolioAggregator {
    holdings: HashMap<String, AggregatedHolding>,
}

impl PortfolioAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one fund's holdings in, weighted by the position's value.
    /// Rows are consumed in the order received.
    pub fn add(&mut self, fund: &FundHoldings, position_value: Decimal) {
        for row in &fund.rows {
            let contribution = position_value * row.weight_pct / Decimal::ONE_HUNDRED;
            let identity = resolve_identity(row.ticker.as_deref(), &row.company_name);
            let entry = self
                .holdings
                .entry(identity)
                .or_insert_with(|| AggregatedHolding {
                    company_name: row.company_name.clone(),
                    ticker: row.ticker.clone(),
                    total_value: Decimal::ZERO,
                    contributing_funds: BTreeSet::new(),
                });
            entry.total_value += contribution;
            entry.contributing_funds.insert(fund.fund_id.clone());
        }
    }

    /// Snapshot of the accumulated table. Read-only: calling it repeatedly
    /// (or continuing to `add` afterwards) is fine.
    pub fn finalize(&self) -> HashMap<String, AggregatedHolding> {
        self.holdings.clone()
    }
}

/// The final consolidated report. Built once; immutable.
#[derive(Debug, Serialize)]
pub struct PortfolioReport {
    pub holdings: HashMap<String, AggregatedHolding>,
    /// Full table sorted by descending value, name tie-break ascending.
    pub ranked: Vec<AggregatedHolding>,
    pub top_n: Vec<AggregatedHolding>,
    pub total_portfolio_value: Decimal,
}

/// Sort the consolidated table and compute the summary. Pure: no I/O.
pub fn build_report(
    holdings: HashMap<String, AggregatedHolding>,
    top_n: usize,
) -> PortfolioReport {
    let total_portfolio_value: Decimal = holdings.values().map(|h| h.total_value).sum();

    let ranked: Vec<AggregatedHolding> = holdings
        .values()
        .cloned()
        .sorted_by(|a, b| {
            b.total_value.cmp(&a.total_value).then_with(|| {
                a.company_name
                    .to_lowercase()
                    .cmp(&b.company_name.to_lowercase())
            })
        })
        .collect();

    let top_n = ranked.iter().take(top_n).cloned().collect();

    PortfolioReport {
        holdings,
        ranked,
        top_n,
        total_portfolio_value,
    }
}
