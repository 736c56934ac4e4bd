//! Conversion between human ether strings and base-unit (wei) integers.

use alloy_primitives::{
    utils::{format_ether, parse_ether},
    U256,
};

/// Fractional digits of the ledger's native currency.
pub const DECIMALS: usize = 18;

/// 10^18.
pub const WEI_PER_ETHER: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Errors while parsing a human amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    Empty,
    Negative,
    /// Anything other than digits with at most one `.`.
    Malformed,
    /// More fractional digits than the base unit can represent.
    TooManyDecimals,
    Overflow,
}

/// Parse a non-negative decimal ether string into wei.
///
/// Accepts `"1"`, `"1.5"`, `".5"` and `"1."`. Surrounding whitespace is ignored. Signs, exponents
/// and more than [`DECIMALS`] fractional digits are rejected rather than rounded.
pub fn to_base_unit(input: &str) -> Result<U256, AmountError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(AmountError::Empty);
    }
    if s.starts_with('-') {
        return Err(AmountError::Negative);
    }

    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(AmountError::Malformed);
    }
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(AmountError::Malformed);
    }
    if frac_part.len() > DECIMALS {
        return Err(AmountError::TooManyDecimals);
    }

    // Pad to the full scale so alloy only parses digits and never rescales.
    let whole = if int_part.is_empty() { "0" } else { int_part };
    parse_ether(&format!("{whole}.{frac_part:0<width$}", width = DECIMALS))
        .map_err(|_| AmountError::Overflow)
}

/// Render wei as an ether string with trailing fractional zeros trimmed (`"0.0005"`, `"1.0"`).
pub fn from_base_unit(amount: U256) -> String {
    let full = format_ether(amount);
    let trimmed = full.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}
