//! Conversion between human-decimal and atomic token amounts.
//!
//! Token amounts travel through the protocol as atomic integers scaled by
//! `10^decimals`, carried as decimal strings. The codec here is purely
//! lexical: it operates on digit strings and never parses a full amount into
//! a native integer, so values beyond the 64-bit range survive unharmed.
//!
//! [`MoneyAmount`] handles free-form user input (`"$10.50"`, `"1,000"`)
//! ahead of the codec; the codec itself accepts plain decimal strings only.

use regex::Regex;
use rust_decimal::Decimal;
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

/// Error returned when an amount string cannot be converted.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid amount: {0}")]
pub struct AmountError(pub String);

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn trim_leading_zeros(s: &str) -> &str {
    let trimmed = s.trim_start_matches('0');
    if trimmed.is_empty() { "0" } else { trimmed }
}

/// Converts a plain decimal string into atomic units.
///
/// The fractional part is right-padded with zeros to exactly `decimals`
/// digits; excess fractional digits are truncated buyer-favorably.
///
/// ```
/// use x402_solana_pay::amount::to_atomic;
///
/// assert_eq!(to_atomic("0.01", 6).unwrap(), "10000");
/// assert_eq!(to_atomic("1", 6).unwrap(), "1000000");
/// ```
pub fn to_atomic(decimal: &str, decimals: u8) -> Result<String, AmountError> {
    let decimal = decimal.trim();
    let (whole, fraction) = match decimal.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (decimal, ""),
    };
    if !all_digits(whole) {
        return Err(AmountError(decimal.to_string()));
    }
    if !fraction.is_empty() && !all_digits(fraction) {
        return Err(AmountError(decimal.to_string()));
    }
    let mut padded = String::from(fraction);
    padded.truncate(decimals as usize);
    while padded.len() < decimals as usize {
        padded.push('0');
    }
    let mut atomic = String::with_capacity(whole.len() + padded.len());
    atomic.push_str(whole);
    atomic.push_str(&padded);
    Ok(trim_leading_zeros(&atomic).to_string())
}

/// Converts atomic units back into a plain decimal string.
///
/// Trailing fractional zeros are trimmed; the decimal point is omitted
/// entirely when the fraction is zero.
///
/// ```
/// use x402_solana_pay::amount::to_decimal;
///
/// assert_eq!(to_decimal("10000", 6).unwrap(), "0.01");
/// assert_eq!(to_decimal("1000000", 6).unwrap(), "1");
/// ```
pub fn to_decimal(atomic: &str, decimals: u8) -> Result<String, AmountError> {
    let atomic = atomic.trim();
    if !all_digits(atomic) {
        return Err(AmountError(atomic.to_string()));
    }
    let atomic = trim_leading_zeros(atomic);
    let decimals = decimals as usize;
    let (whole, fraction) = if atomic.len() > decimals {
        let (whole, fraction) = atomic.split_at(atomic.len() - decimals);
        (whole.to_string(), fraction.to_string())
    } else {
        ("0".to_string(), format!("{atomic:0>decimals$}"))
    };
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        Ok(whole)
    } else {
        Ok(format!("{whole}.{fraction}"))
    }
}

/// A monetary amount parsed from free-form user input.
///
/// Currency symbols, thousand separators, and whitespace are stripped before
/// parsing. The result is a non-negative decimal suitable for [`to_atomic`].
#[derive(Debug, Clone, PartialEq)]
pub struct MoneyAmount(pub Decimal);

/// Errors that can occur when parsing a monetary amount.
#[derive(Debug, thiserror::Error)]
pub enum MoneyAmountParseError {
    /// The input string could not be parsed as a number.
    #[error("Invalid number format")]
    InvalidFormat,
    /// The value is outside the allowed range.
    #[error(
        "Amount must be between {} and {}",
        constants::MIN_STR,
        constants::MAX_STR
    )]
    OutOfRange,
    /// Negative values are not allowed.
    #[error("Negative value is not allowed")]
    Negative,
}

mod constants {
    use super::*;
    use std::sync::LazyLock;

    pub const MIN_STR: &str = "0.000000001";
    pub const MAX_STR: &str = "999999999";

    pub static MIN: LazyLock<Decimal> =
        LazyLock::new(|| Decimal::from_str(MIN_STR).expect("valid decimal"));
    pub static MAX: LazyLock<Decimal> =
        LazyLock::new(|| Decimal::from_str(MAX_STR).expect("valid decimal"));
}

impl MoneyAmount {
    /// Parses a human-readable currency string into a [`MoneyAmount`].
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed as a number, the
    /// value is negative, or the value is outside the allowed range.
    pub fn parse(input: &str) -> Result<Self, MoneyAmountParseError> {
        // Remove anything that isn't digit, dot, minus
        let cleaned = Regex::new(r"[^\d\.\-]+")
            .unwrap()
            .replace_all(input, "")
            .to_string();

        let parsed =
            Decimal::from_str(&cleaned).map_err(|_| MoneyAmountParseError::InvalidFormat)?;

        if parsed.is_sign_negative() {
            return Err(MoneyAmountParseError::Negative);
        }

        if parsed < *constants::MIN || parsed > *constants::MAX {
            return Err(MoneyAmountParseError::OutOfRange);
        }

        Ok(MoneyAmount(parsed))
    }

    /// Converts this amount into atomic units at the given token precision.
    pub fn to_atomic(&self, decimals: u8) -> Result<String, AmountError> {
        to_atomic(&self.to_string(), decimals)
    }
}

impl FromStr for MoneyAmount {
    type Err = MoneyAmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MoneyAmount::parse(s)
    }
}

impl Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}
