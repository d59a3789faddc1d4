//! End-to-end CLI tests
//!
//! These run the built binary against a pre-seeded holdings cache, so no
//! browser or network is involved: every fund resolves from cache.

use assert_cmd::{cargo, prelude::*};
use chrono::Utc;
use lookthru::holdings::cache::{HoldingsStore, JsonFileStore};
use lookthru::holdings::{FundHoldings, HoldingRow, HoldingsOrigin};
use predicates::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::io::Write;
use std::process::Command;
use tempfile::TempDir;

fn seed_fund(dir: &TempDir, fund_id: &str, rows: &[(&str, &str, Decimal)]) {
    let store = JsonFileStore::new(dir.path());
    store
        .put(&FundHoldings {
            fund_id: fund_id.to_string(),
            rows: rows
                .iter()
                .map(|(name, ticker, weight)| HoldingRow {
                    company_name: name.to_string(),
                    ticker: Some(ticker.to_string()),
                    weight_pct: *weight,
                    market_value: None,
                })
                .collect(),
            fetched_at: Utc::now(),
            weight_sum: rows.iter().map(|(_, _, w)| *w).sum(),
            origin: HoldingsOrigin::Live,
        })
        .expect("seed cache entry");
}

fn seed_standard_cache(dir: &TempDir) {
    seed_fund(
        dir,
        "VOO",
        &[
            ("Apple Inc.", "AAPL", dec!(60)),
            ("Microsoft Corp.", "MSFT", dec!(40)),
        ],
    );
    seed_fund(
        dir,
        "VTI",
        &[
            ("Apple Inc.", "AAPL", dec!(50)),
            ("Alphabet Inc.", "GOOG", dec!(50)),
        ],
    );
}

fn write_positions(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp positions file");
    file.write_all(json.as_bytes()).expect("write positions");
    file
}

const STANDARD_POSITIONS: &str = r#"{
    "VOO": {"shares": 10, "price": 100},
    "VTI": {"shares": 5, "price": 100}
}"#;

#[test]
fn run_reports_aggregate_from_seeded_cache() {
    let cache = TempDir::new().unwrap();
    seed_standard_cache(&cache);
    let positions = write_positions(STANDARD_POSITIONS);

    let mut cmd = Command::new(cargo::cargo_bin!("lookthru"));
    cmd.arg("--no-color")
        .arg("run")
        .arg("--positions")
        .arg(positions.path())
        .arg("--cache-dir")
        .arg(cache.path())
        .arg("--top")
        .arg("2");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Apple Inc."))
        .stdout(predicate::str::contains("$850.00"))
        .stdout(predicate::str::contains("$1,500.00"))
        .stdout(predicate::str::contains("2 from cache"))
        .stdout(predicate::str::contains("\u{001b}[").not());
}

#[test]
fn run_json_output_is_machine_readable() {
    let cache = TempDir::new().unwrap();
    seed_standard_cache(&cache);
    let positions = write_positions(STANDARD_POSITIONS);

    let mut cmd = Command::new(cargo::cargo_bin!("lookthru"));
    cmd.arg("--no-color")
        .arg("--json")
        .arg("run")
        .arg("--positions")
        .arg(positions.path())
        .arg("--cache-dir")
        .arg(cache.path());

    let output = cmd.assert().success().get_output().stdout.clone();
    let value: serde_json::Value = serde_json::from_slice(&output).expect("valid JSON output");
    assert_eq!(value["total_portfolio_value"], "1500");
    assert_eq!(value["failed"].as_array().unwrap().len(), 0);
    assert_eq!(value["holdings"].as_array().unwrap().len(), 3);
}

#[test]
fn run_writes_csv_report() {
    let cache = TempDir::new().unwrap();
    seed_standard_cache(&cache);
    let positions = write_positions(STANDARD_POSITIONS);
    let out_dir = TempDir::new().unwrap();
    let csv_path = out_dir.path().join("aggregated.csv");

    let mut cmd = Command::new(cargo::cargo_bin!("lookthru"));
    cmd.arg("--no-color")
        .arg("run")
        .arg("--positions")
        .arg(positions.path())
        .arg("--cache-dir")
        .arg(cache.path())
        .arg("--output")
        .arg(&csv_path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Report saved to"));

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert!(csv.starts_with("Fund,Shares,Price,Value\n"));
    assert!(csv.contains("Apple Inc.,AAPL,850,VOO+VTI"));
}

#[test]
fn malformed_positions_fail_fast() {
    let cache = TempDir::new().unwrap();
    let positions = write_positions(r#"{"VOO": {"shares": 0, "price": 100}}"#);

    let mut cmd = Command::new(cargo::cargo_bin!("lookthru"));
    cmd.arg("--no-color")
        .arg("run")
        .arg("--positions")
        .arg(positions.path())
        .arg("--cache-dir")
        .arg(cache.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("shares must be positive"));
}

#[test]
fn missing_positions_file_is_an_error() {
    let mut cmd = Command::new(cargo::cargo_bin!("lookthru"));
    cmd.arg("--no-color")
        .arg("run")
        .arg("--positions")
        .arg("/nonexistent/positions.json");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not readable"));
}

#[test]
fn cache_list_and_clear_manage_entries() {
    let cache = TempDir::new().unwrap();
    seed_standard_cache(&cache);

    let mut list_cmd = Command::new(cargo::cargo_bin!("lookthru"));
    list_cmd
        .arg("--no-color")
        .arg("cache")
        .arg("list")
        .arg("--cache-dir")
        .arg(cache.path());
    list_cmd
        .assert()
        .success()
        .stdout(predicate::str::contains("VOO"))
        .stdout(predicate::str::contains("VTI"));

    let mut clear_cmd = Command::new(cargo::cargo_bin!("lookthru"));
    clear_cmd
        .arg("--no-color")
        .arg("cache")
        .arg("clear")
        .arg("VOO")
        .arg("--cache-dir")
        .arg(cache.path());
    clear_cmd
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared cached holdings for VOO"));

    let mut relist_cmd = Command::new(cargo::cargo_bin!("lookthru"));
    relist_cmd
        .arg("--no-color")
        .arg("cache")
        .arg("list")
        .arg("--cache-dir")
        .arg(cache.path());
    relist_cmd
        .assert()
        .success()
        .stdout(predicate::str::contains("VOO").not())
        .stdout(predicate::str::contains("VTI"));
}

#[test]
fn cache_list_on_empty_dir_is_friendly() {
    let cache = TempDir::new().unwrap();

    let mut cmd = Command::new(cargo::cargo_bin!("lookthru"));
    cmd.arg("--no-color")
        .arg("cache")
        .arg("list")
        .arg("--cache-dir")
        .arg(cache.path().join("never-created"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No cached holdings"));
}
