//! Investor positions
//!
//! A position is the investor's own stake in a fund (shares held and
//! market price per share); its value weights that fund's holdings in the
//! aggregate. Positions come from a JSON object mapping fund identifier to
//! `{"shares": n, "price": n}` and are processed in file order.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PositionError;

#[derive(Debug, Clone, Deserialize)]
struct PositionEntry {
    shares: Decimal,
    price: Decimal,
}

/// One fund position, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub fund_id: String,
    pub shares: Decimal,
    pub price: Decimal,
}

impl Position {
    /// Dollar value of the stake: shares * price.
    pub fn value(&self) -> Decimal {
        self.shares * self.price
    }
}

/// Load and validate positions. Any malformed entry is a fatal
/// configuration error, reported before any fetching begins.
pub fn load_positions(path: &Path) -> Result<Vec<Position>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Positions file '{}' not readable", path.display()))?;
    let entries: IndexMap<String, PositionEntry> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse positions file '{}'", path.display()))?;

    let positions: Vec<Position> = entries
        .into_iter()
        .map(|(fund_id, entry)| Position {
            fund_id,
            shares: entry.shares,
            price: entry.price,
        })
        .collect();

    validate_positions(&positions)?;
    Ok(positions)
}

/// Reject non-positive shares/prices and empty fund identifiers.
pub fn validate_positions(positions: &[Position]) -> Result<(), PositionError> {
    for position in positions {
        if position.fund_id.trim().is_empty() {
            return Err(PositionError::EmptyFundId);
        }
        if position.shares <= Decimal::ZERO {
            return Err(PositionError::NonPositiveShares {
                fund_id: position.fund_id.clone(),
                value: position.shares.to_string(),
            });
        }
        if position.price <= Decimal::ZERO {
            return Err(PositionError::NonPositivePrice {
                fund_id: position.fund_id.clone(),
                value: position.price.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_positions(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(json.as_bytes()).expect("write positions");
        file
    }

    #[test]
    fn loads_positions_in_file_order() {
        let file = write_positions(
            r#"{
                "VTI": {"shares": 10, "price": 250.5},
                "VOO": {"shares": 2.5, "price": 400}
            }"#,
        );
        let positions = load_positions(file.path()).unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].fund_id, "VTI");
        assert_eq!(positions[1].fund_id, "VOO");
        assert_eq!(positions[0].shares, dec!(10));
        assert_eq!(positions[1].price, dec!(400));
    }

    #[test]
    fn position_value_is_shares_times_price() {
        let position = Position {
            fund_id: "VOO".to_string(),
            shares: dec!(2.5),
            price: dec!(400),
        };
        assert_eq!(position.value(), dec!(1000));
    }

    #[test]
    fn non_positive_shares_are_fatal() {
        let file = write_positions(r#"{"VOO": {"shares": 0, "price": 400}}"#);
        let err = load_positions(file.path()).unwrap_err();
        assert!(err.to_string().contains("shares must be positive"));
        assert!(err.to_string().contains("VOO"));
    }

    #[test]
    fn negative_price_is_fatal() {
        let file = write_positions(r#"{"VOO": {"shares": 1, "price": -1}}"#);
        let err = load_positions(file.path()).unwrap_err();
        assert!(err.to_string().contains("price must be positive"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_positions(Path::new("/nonexistent/positions.json")).unwrap_err();
        assert!(err.to_string().contains("not readable"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let file = write_positions("{not json");
        let err = load_positions(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn missing_field_is_an_error() {
        let file = write_positions(r#"{"VOO": {"shares": 1}}"#);
        assert!(load_positions(file.path()).is_err());
    }
}
