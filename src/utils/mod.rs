//! Utility functions for formatting and common operations
//!
//! Centralized formatting utilities for consistent display of currency
//! values throughout the application.

use rust_decimal::Decimal;

/// Currency symbol options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Include "$" prefix (US dollar)
    Usd,
    /// No currency symbol (for table cells, calculations display)
    None,
}

/// Core formatting function with full control over output.
///
/// Formats a Decimal using US conventions: `,` thousands separator,
/// `.` decimal separator, two decimal places.
///
/// # Examples
/// ```
/// use lookthru::utils::{format_currency_with_width, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234.56), 0, CurrencySymbol::Usd),
///     "$1,234.56"
/// );
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234), 12, CurrencySymbol::None),
///     "    1,234.00"
/// );
/// ```
pub fn format_currency_with_width(value: Decimal, width: usize, symbol: CurrencySymbol) -> String {
    let is_negative = value < Decimal::ZERO;
    let abs_value = value.abs();

    // Round to 2 decimal places and format
    let formatted = format!("{:.2}", abs_value);
    let parts: Vec<&str> = formatted.split('.').collect();

    let integer_part = parts[0];
    let decimal_part = parts.get(1).unwrap_or(&"00");

    // Add thousands separators (,) to integer part
    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec![',', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let sign = if is_negative { "-" } else { "" };
    let prefix = match symbol {
        CurrencySymbol::Usd => "$",
        CurrencySymbol::None => "",
    };

    let result = format!("{}{}{}.{}", prefix, sign, with_separators, decimal_part);

    // Apply width padding (right-align)
    if width > 0 && result.len() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

/// Format as US dollars with symbol: "$1,234.56"
///
/// # Examples
/// ```
/// use lookthru::utils::format_currency;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_currency(dec!(1234.56)), "$1,234.56");
/// assert_eq!(format_currency(dec!(-500)), "$-500.00");
/// ```
pub fn format_currency(value: Decimal) -> String {
    format_currency_with_width(value, 0, CurrencySymbol::Usd)
}

/// Format number only (no symbol): "1,234.56"
pub fn format_decimal(value: Decimal) -> String {
    format_currency_with_width(value, 0, CurrencySymbol::None)
}
