//! Fixed-point token amounts.
//!
//! Amounts travel on-chain as `U256` base units with 18 decimals. The
//! dashboards accept and display decimal text; these helpers convert between
//! the two without floating point.

use primitive_types::U256;

use crate::errors::AmountParseError;

/// Token quantity in base units.
pub type Amount = U256;

/// Decimals of the bounty token and of the native currency.
pub const TOKEN_DECIMALS: usize = 18;

/// Parse decimal text (`"1.5"`, `"20"`, `".25"`) into base units.
///
/// Rejects empty input, signs, exponents, more fractional digits than
/// `decimals`, and values that overflow 256 bits.
pub fn parse_units(text: &str, decimals: usize) -> Result<Amount, AmountParseError> {
    let trimmed = text.trim();
    let invalid = || AmountParseError::Invalid(text.to_string());

    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac.len() > decimals {
        return Err(AmountParseError::TooManyDecimals {
            value: text.to_string(),
            decimals,
        });
    }

    let mut digits = String::with_capacity(whole.len() + decimals);
    digits.push_str(whole);
    digits.push_str(frac);
    digits.extend(std::iter::repeat('0').take(decimals - frac.len()));

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_dec_str(digits).map_err(|_| AmountParseError::Overflow(text.to_string()))
}

/// Render base units as decimal text, always with a fractional part
/// (`"1.0"`, `"0.25"`).
pub fn format_units(amount: Amount, decimals: usize) -> String {
    let unit = U256::exp10(decimals);
    let whole = amount / unit;
    let frac = amount % unit;

    if decimals == 0 {
        return format!("{}.0", whole);
    }

    let frac_digits = format!("{:0>width$}", frac.to_string(), width = decimals);
    let frac_digits = frac_digits.trim_end_matches('0');
    if frac_digits.is_empty() {
        format!("{}.0", whole)
    } else {
        format!("{}.{}", whole, frac_digits)
    }
}
