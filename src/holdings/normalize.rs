//! Raw provider rows -> canonical [`HoldingRow`]s
//!
//! The provider table arrives as untyped cell vectors straight out of the
//! rendered markup. Every row is classified exactly once here; nothing
//! untyped leaks past this module. Footer/caption furniture ("Total" rows,
//! disclaimers) is detected structurally via a missing or non-numeric
//! weight cell, never by matching locale-specific labels.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::NormalizationError;
use crate::holdings::HoldingRow;

// Column layout of the provider's holdings table:
// ticker | holdings (name) | CUSIP | SEDOL | % of fund | shares | market value
const TICKER_COL: usize = 0;
const NAME_COL: usize = 1;
const WEIGHT_COL: usize = 4;
const MARKET_VALUE_COL: usize = 6;

/// Weight sums outside this band trigger a parse-drift warning.
const WEIGHT_SUM_LOW: Decimal = Decimal::from_parts(95, 0, 0, false, 0);
const WEIGHT_SUM_HIGH: Decimal = Decimal::from_parts(105, 0, 0, false, 0);

static NUMERIC_CLEANUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[$,%\s]+").expect("valid cleanup pattern"));

/// A raw row resolved into exactly one of: a usable holding, expected
/// table furniture, or a diagnosed bad row.
#[derive(Debug)]
enum ClassifiedRow {
    Holding(HoldingRow),
    Artifact { reason: &'static str },
    Invalid(NormalizationError),
}

/// Result of normalizing one fund's raw table.
#[derive(Debug)]
pub struct NormalizedHoldings {
    pub rows: Vec<HoldingRow>,
    /// Observed sum of weights after zero-weight derivation.
    pub weight_sum: Decimal,
    /// Rows dropped with a diagnostic (artifacts are not counted).
    pub dropped: usize,
}

/// Strip currency/percent adornment and parse a table cell as a Decimal.
fn parse_numeric_cell(cell: &str) -> Option<Decimal> {
    let cleaned = NUMERIC_CLEANUP.replace_all(cell.trim(), "");
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

fn classify_row(index: usize, cells: &[String]) -> ClassifiedRow {
    if cells.len() <= WEIGHT_COL {
        return ClassifiedRow::Artifact {
            reason: "short row",
        };
    }

    let weight_cell = cells[WEIGHT_COL].trim();
    if !weight_cell.chars().any(|c| c.is_ascii_digit()) {
        // Footer/total/caption rows carry no numeric weight.
        return ClassifiedRow::Artifact {
            reason: "non-numeric weight cell",
        };
    }

    let company_name = cells[NAME_COL].trim();
    if company_name.is_empty() {
        return ClassifiedRow::Invalid(NormalizationError::EmptyCompanyName { row: index });
    }

    let weight_pct = match parse_numeric_cell(weight_cell) {
        Some(w) if w >= Decimal::ZERO && w <= Decimal::ONE_HUNDRED => w,
        _ => {
            return ClassifiedRow::Invalid(NormalizationError::InvalidWeight {
                row: index,
                value: weight_cell.to_string(),
            })
        }
    };

    let ticker = cells
        .get(TICKER_COL)
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty());

    let market_value = cells
        .get(MARKET_VALUE_COL)
        .and_then(|v| parse_numeric_cell(v));

    ClassifiedRow::Holding(HoldingRow {
        company_name: company_name.to_string(),
        ticker,
        weight_pct,
        market_value,
    })
}

/// Rows reported at 0.00% but carrying a positive market value get a
/// weight derived from their share of the fund's total market value, so
/// sub-threshold holdings still contribute to the aggregate.
fn derive_zero_weights(rows: &mut [HoldingRow]) {
    let total_market_value: Decimal = rows.iter().filter_map(|r| r.market_value).sum();
    if total_market_value <= Decimal::ZERO {
        return;
    }

    for row in rows.iter_mut() {
        if row.weight_pct.is_zero() {
            if let Some(mv) = row.market_value.filter(|mv| *mv > Decimal::ZERO) {
                row.weight_pct = mv / total_market_value * Decimal::ONE_HUNDRED;
            }
        }
    }
}

/// Normalize one fund's raw table into canonical holding rows.
///
/// Invalid rows are dropped with a diagnostic; the whole fund is rejected
/// with `ExcessiveDrops` once the dropped fraction of candidate rows
/// exceeds `max_dropped_fraction`.
pub fn normalize_rows(
    fund_id: &str,
    raw: &[Vec<String>],
    max_dropped_fraction: f64,
) -> Result<NormalizedHoldings, NormalizationError> {
    let mut rows = Vec::new();
    let mut dropped = 0usize;

    for (index, cells) in raw.iter().enumerate() {
        match classify_row(index, cells) {
            ClassifiedRow::Holding(row) => rows.push(row),
            ClassifiedRow::Artifact { reason } => {
                debug!("{}: skipping row {} ({})", fund_id, index, reason);
            }
            ClassifiedRow::Invalid(diag) => {
                warn!("{}: dropping row {}: {}", fund_id, index, diag);
                dropped += 1;
            }
        }
    }

    let candidates = rows.len() + dropped;
    if candidates > 0 && dropped as f64 / candidates as f64 > max_dropped_fraction {
        return Err(NormalizationError::ExcessiveDrops {
            dropped,
            total: candidates,
        });
    }

    derive_zero_weights(&mut rows);

    let weight_sum: Decimal = rows.iter().map(|r| r.weight_pct).sum();
    if !rows.is_empty() && !(WEIGHT_SUM_LOW..=WEIGHT_SUM_HIGH).contains(&weight_sum) {
        warn!(
            "{}: holdings weights sum to {:.2}%, expected roughly 100% (parse drift?)",
            fund_id, weight_sum
        );
    }

    Ok(NormalizedHoldings {
        rows,
        weight_sum,
        dropped,
    })
}
