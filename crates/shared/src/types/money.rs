//! Display helpers for raw amounts and settlement amounts.
//!
//! CRITICAL: Never use floating-point for money. Everything here formats
//! `rust_decimal::Decimal` values directly.

use rust_decimal::Decimal;

/// Settlement currency label shown to operators.
pub const SETTLEMENT_CURRENCY: &str = "USDT";

/// Formats a settlement amount with exactly two decimals, e.g. `5.88 USDT`.
#[must_use]
pub fn format_usdt(amount: Decimal) -> String {
    format!("{:.2} {SETTLEMENT_CURRENCY}", amount)
}

/// Formats a raw amount without insignificant trailing zeros (`1000.00` -> `1000`).
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    amount.normalize().to_string()
}

/// Converts a number to unicode superscript digits, used to show fee rates
/// inline in chat summaries (`10` -> `¹⁰`, `7.5` -> `⁷·⁵`).
#[must_use]
pub fn to_superscript(value: impl std::fmt::Display) -> String {
    value
        .to_string()
        .chars()
        .map(|c| match c {
            '0' => '⁰',
            '1' => '¹',
            '2' => '²',
            '3' => '³',
            '4' => '⁴',
            '5' => '⁵',
            '6' => '⁶',
            '7' => '⁷',
            '8' => '⁸',
            '9' => '⁹',
            '-' => '⁻',
            '.' => '·',
            other => other,
        })
        .collect()
}
