// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Conversion between human decimal strings and token base units.

use alloy::primitives::U256;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is required")]
    Empty,
    #[error("invalid amount format: {0}")]
    Invalid(String),
    #[error("too many decimal places (max {max})")]
    TooManyDecimals { max: u8 },
    #[error("amount overflow")]
    Overflow,
    #[error("amount must be greater than zero")]
    NotPositive,
}

/// Parse a human-readable amount into base units.
///
/// # Arguments
/// * `amount` - Amount as a string (e.g., "1.5")
/// * `decimals` - Number of decimals (6 for sUSDT)
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountError::Invalid(amount.to_string()));
    }
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) {
        return Err(AmountError::Invalid(amount.to_string()));
    }
    if fraction.len() > decimals as usize {
        return Err(AmountError::TooManyDecimals { max: decimals });
    }

    let whole_units = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).map_err(|_| AmountError::Overflow)?
    };
    // Pad with zeros to match decimals
    let padded = format!("{:0<width$}", fraction, width = decimals as usize);
    let fraction_units = if padded.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&padded, 10).map_err(|_| AmountError::Overflow)?
    };

    let multiplier = U256::from(10u64).pow(U256::from(decimals));
    whole_units
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(fraction_units))
        .ok_or(AmountError::Overflow)
}

/// Like [`parse_amount`] but rejects zero.
pub fn parse_positive_amount(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let units = parse_amount(amount, decimals)?;
    if units.is_zero() {
        return Err(AmountError::NotPositive);
    }
    Ok(units)
}

/// Format base units as a decimal string without trailing zeros.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        format!("{whole}.{trimmed}")
    }
}
