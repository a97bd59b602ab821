//! Exact conversion between major-unit decimal strings and the chain's smallest unit.

use alloy_primitives::{
    utils::{ParseUnits, Unit},
    U256,
};
use shared::error::DappError;

/// Decimals of the native currency (CELO, like ETH, uses 18).
pub const NATIVE_DECIMALS: usize = 18;

/// Parses a human-entered amount such as `"1.5"` into its smallest-unit integer.
pub fn parse_major_units(input: &str) -> Result<U256, DappError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DappError::invalid_amount(input, "amount is empty"));
    }
    if trimmed.starts_with('-') {
        return Err(DappError::invalid_amount(input, "amount must not be negative"));
    }

    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(DappError::invalid_amount(input, "amount has no digits"));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(DappError::invalid_amount(input, "not a decimal number"));
    }
    if fraction.len() > NATIVE_DECIMALS {
        return Err(DappError::invalid_amount(
            input,
            format!("more than {NATIVE_DECIMALS} fractional digits"),
        ));
    }

    let whole = if whole.is_empty() { "0" } else { whole };
    let normalized = if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    };

    match ParseUnits::parse_units(&normalized, Unit::ETHER) {
        Ok(ParseUnits::U256(value)) => Ok(value),
        Ok(ParseUnits::I256(_)) => Err(DappError::invalid_amount(
            input,
            "amount must not be negative",
        )),
        Err(err) => Err(DappError::invalid_amount(input, err.to_string())),
    }
}

/// Shortest exact decimal rendering of a smallest-unit value (`1500000000000000000` → `"1.5"`).
pub fn format_major_units(value: U256) -> String {
    let formatted = ParseUnits::U256(value).format_units(Unit::ETHER);
    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                whole.to_string()
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => formatted,
    }
}

#[cfg(test)]
#[path = "tests/units_tests.rs"]
mod tests;
