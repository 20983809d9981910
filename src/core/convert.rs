//! Amount conversion and display formatting.
//!
//! Every function here is total: input that cannot be parsed or arithmetic
//! that cannot be carried out renders as the zero display instead of failing.
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

pub const ZERO_DISPLAY: &str = "0.00";

/// Parses free-text user input as a finite decimal. The whole trimmed text
/// must be a number; trailing characters such as `"12abc"` are rejected.
pub fn parse_amount(amount: &str) -> Option<Decimal> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// Exact decimal for a stored rate, via its shortest `f64` rendering.
fn rate_to_decimal(rate: f64) -> Option<Decimal> {
    if !rate.is_finite() {
        return None;
    }
    Decimal::from_str(&rate.to_string()).ok()
}

fn format_money(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}

/// Converts `amount` at `rate`, rounded half away from zero to two places.
///
/// Amounts or products outside `Decimal`'s range (about 7.9e28, e.g. `"1e30"`)
/// render as the zero display like unparseable input.
pub fn convert(amount: &str, rate: f64) -> String {
    parse_amount(amount)
        .zip(rate_to_decimal(rate))
        .and_then(|(amount, rate)| amount.checked_mul(rate))
        .map_or_else(|| ZERO_DISPLAY.to_string(), format_money)
}

/// USD to HKD for JCB settlement: `usd / hkd_rate`.
pub fn jcb_hkd(usd_amount: &str, hkd_rate: Option<f64>) -> String {
    let Some(usd) = parse_amount(usd_amount) else {
        return ZERO_DISPLAY.to_string();
    };
    let Some(hkd) = hkd_rate.and_then(rate_to_decimal) else {
        return ZERO_DISPLAY.to_string();
    };
    if hkd.is_zero() {
        return ZERO_DISPLAY.to_string();
    }
    usd.checked_div(hkd)
        .map_or_else(|| ZERO_DISPLAY.to_string(), format_money)
}

/// Renders a rate the way the rate tables show it.
pub fn format_rate(rate: f64) -> String {
    format!("{rate:.5}")
}
