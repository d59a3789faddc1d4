//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating the
//! concerns of data calculation from presentation. The pipeline returns a
//! [`LookthroughOutcome`]; everything here is rendering.

use anyhow::{Context, Result};
use colored::Colorize;
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use crate::pipeline::LookthroughOutcome;
use crate::utils::format_currency;

/// Format the outcome for terminal display: top-N table, totals and any
/// failed-fund warnings.
pub fn format_outcome_table(outcome: &LookthroughOutcome) -> String {
    let mut output = String::new();
    let report = &outcome.report;

    if report.ranked.is_empty() {
        output.push_str(&format!(
            "{} No holdings to aggregate\n",
            "ℹ".blue().bold()
        ));
        push_failures(&mut output, outcome);
        return output;
    }

    output.push_str(&format!(
        "\n{} Portfolio look-through — top {} of {} holdings\n\n",
        "📊".cyan().bold(),
        report.top_n.len(),
        report.ranked.len()
    ));

    #[derive(Tabled)]
    struct HoldingRowDisplay {
        #[tabled(rename = "Company")]
        company: String,
        #[tabled(rename = "Ticker")]
        ticker: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "% of total")]
        pct: String,
        #[tabled(rename = "Funds")]
        funds: String,
    }

    let rows: Vec<HoldingRowDisplay> = report
        .top_n
        .iter()
        .map(|h| {
            let pct = if report.total_portfolio_value > Decimal::ZERO {
                h.total_value / report.total_portfolio_value * Decimal::ONE_HUNDRED
            } else {
                Decimal::ZERO
            };
            HoldingRowDisplay {
                company: h.company_name.clone(),
                ticker: h.ticker.clone().unwrap_or_default(),
                value: format_currency(h.total_value),
                pct: format!("{:.2}%", pct),
                funds: h.contributing_funds.iter().join(", "),
            }
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    // Right-align the numeric columns
    table.modify(Columns::new(2..4), Alignment::right());
    output.push_str(&table.to_string());

    // Summary
    output.push_str(&format!("\n\n{} Summary", "━".repeat(80).bright_black()));
    output.push_str(&format!(
        "\n{:<28} {}",
        "Total portfolio value:".bold(),
        format_currency(report.total_portfolio_value).green()
    ));
    output.push_str(&format!(
        "\n{:<28} {}",
        "Distinct holdings:".bold(),
        report.ranked.len()
    ));

    let cached = outcome
        .processed
        .iter()
        .filter(|p| p.origin == crate::holdings::HoldingsOrigin::Cache)
        .count();
    output.push_str(&format!(
        "\n{:<28} {} ({} from cache)\n",
        "Funds aggregated:".bold(),
        outcome.processed.len(),
        cached
    ));

    push_failures(&mut output, outcome);
    output
}

fn push_failures(output: &mut String, outcome: &LookthroughOutcome) {
    if outcome.failed.is_empty() {
        return;
    }
    output.push('\n');
    for failure in &outcome.failed {
        output.push_str(&format!(
            "{} {} excluded: {}\n",
            "⚠".yellow().bold(),
            failure.fund_id.to_uppercase().yellow(),
            failure.error
        ));
    }
}

/// Format the outcome for JSON output
pub fn format_outcome_json(outcome: &LookthroughOutcome) -> String {
    #[derive(Serialize)]
    struct JsonHolding {
        company_name: String,
        ticker: Option<String>,
        total_value: String,
        contributing_funds: Vec<String>,
    }

    #[derive(Serialize)]
    struct JsonPosition {
        fund_id: String,
        shares: String,
        price: String,
        position_value: String,
        source: String,
        holdings: usize,
    }

    #[derive(Serialize)]
    struct JsonFailure {
        fund_id: String,
        error: String,
    }

    #[derive(Serialize)]
    struct JsonOutcome {
        total_portfolio_value: String,
        positions: Vec<JsonPosition>,
        failed: Vec<JsonFailure>,
        top_n: Vec<JsonHolding>,
        holdings: Vec<JsonHolding>,
    }

    let to_json_holding = |h: &crate::reports::AggregatedHolding| JsonHolding {
        company_name: h.company_name.clone(),
        ticker: h.ticker.clone(),
        total_value: h.total_value.to_string(),
        contributing_funds: h.contributing_funds.iter().cloned().collect(),
    };

    let json_outcome = JsonOutcome {
        total_portfolio_value: outcome.report.total_portfolio_value.to_string(),
        positions: outcome
            .processed
            .iter()
            .map(|p| JsonPosition {
                fund_id: p.fund_id.clone(),
                shares: p.shares.to_string(),
                price: p.price.to_string(),
                position_value: p.position_value.to_string(),
                source: p.origin.as_str().to_string(),
                holdings: p.holdings_count,
            })
            .collect(),
        failed: outcome
            .failed
            .iter()
            .map(|f| JsonFailure {
                fund_id: f.fund_id.clone(),
                error: f.error.to_string(),
            })
            .collect(),
        top_n: outcome.report.top_n.iter().map(to_json_holding).collect(),
        holdings: outcome.report.ranked.iter().map(to_json_holding).collect(),
    };

    serde_json::to_string_pretty(&json_outcome)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

/// Write the consolidated table as CSV: a position-summary section, a
/// blank line, then the full ranked table.
pub fn write_outcome_csv(outcome: &LookthroughOutcome, path: &Path) -> Result<()> {
    let mut buffer = Vec::new();

    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        writer.write_record(["Fund", "Shares", "Price", "Value"])?;
        for position in &outcome.processed {
            writer.write_record([
                position.fund_id.to_uppercase().as_str(),
                position.shares.to_string().as_str(),
                position.price.to_string().as_str(),
                position.position_value.to_string().as_str(),
            ])?;
        }
        writer.flush()?;
    }

    buffer.push(b'\n');

    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        writer.write_record(["Company", "Ticker", "Total value", "Contributing funds"])?;
        for holding in &outcome.report.ranked {
            writer.write_record([
                holding.company_name.as_str(),
                holding.ticker.as_deref().unwrap_or(""),
                holding.total_value.to_string().as_str(),
                holding.contributing_funds.iter().join("+").as_str(),
            ])?;
        }
        writer.flush()?;
    }

    std::fs::write(path, buffer)
        .with_context(|| format!("Failed to write CSV report to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::holdings::HoldingsOrigin;
    use crate::pipeline::{FailedFund, PositionOutcome};
    use crate::reports::{build_report, AggregatedHolding};
    use rust_decimal_macros::dec;
    use std::collections::{BTreeSet, HashMap};

    fn sample_outcome() -> LookthroughOutcome {
        let mut holdings = HashMap::new();
        holdings.insert(
            "AAPL".to_string(),
            AggregatedHolding {
                company_name: "Apple Inc.".to_string(),
                ticker: Some("AAPL".to_string()),
                total_value: dec!(850),
                contributing_funds: BTreeSet::from(["VOO".to_string(), "VTI".to_string()]),
            },
        );
        holdings.insert(
            "MSFT".to_string(),
            AggregatedHolding {
                company_name: "Microsoft Corp.".to_string(),
                ticker: Some("MSFT".to_string()),
                total_value: dec!(400),
                contributing_funds: BTreeSet::from(["VOO".to_string()]),
            },
        );

        LookthroughOutcome {
            processed: vec![PositionOutcome {
                fund_id: "VOO".to_string(),
                shares: dec!(2.5),
                price: dec!(400),
                position_value: dec!(1000),
                origin: HoldingsOrigin::Cache,
                holdings_count: 2,
            }],
            failed: vec![FailedFund {
                fund_id: "vxyz".to_string(),
                error: FetchError::NotFound {
                    fund_id: "vxyz".to_string(),
                },
            }],
            report: build_report(holdings, 10),
        }
    }

    #[test]
    fn table_contains_holdings_and_totals() {
        let rendered = format_outcome_table(&sample_outcome());
        assert!(rendered.contains("Apple Inc."));
        assert!(rendered.contains("$850.00"));
        assert!(rendered.contains("$1,250.00"));
        assert!(rendered.contains("VXYZ"));
        assert!(rendered.contains("not recognized"));
    }

    #[test]
    fn empty_report_has_friendly_message() {
        let outcome = LookthroughOutcome {
            processed: vec![],
            failed: vec![],
            report: build_report(HashMap::new(), 10),
        };
        let rendered = format_outcome_table(&outcome);
        assert!(rendered.contains("No holdings to aggregate"));
    }

    #[test]
    fn json_output_parses_back() {
        let rendered = format_outcome_json(&sample_outcome());
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["total_portfolio_value"], "1250");
        assert_eq!(value["top_n"][0]["company_name"], "Apple Inc.");
        assert_eq!(value["failed"][0]["fund_id"], "vxyz");
    }

    #[test]
    fn csv_export_has_both_sections() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("report.csv");
        write_outcome_csv(&sample_outcome(), &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("Fund,Shares,Price,Value\n"));
        assert!(contents.contains("VOO,2.5,400,1000"));
        assert!(contents.contains("Company,Ticker,Total value,Contributing funds"));
        assert!(contents.contains("Apple Inc.,AAPL,850,VOO+VTI"));
        // section break between the two tables
        assert!(contents.contains("\n\n"));
    }
}
