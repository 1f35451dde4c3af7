//! Amount type for the magnitude of a transaction.
//!
//! Money direction is carried separately by `Transaction::is_income`, so an `Amount` is always
//! non-negative. Parsing accepts the shapes that show up in bank messages, with or without a
//! currency sign and thousands separators.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// A non-negative monetary magnitude.
///
/// # Examples
///
/// ```
/// # use sms_ledger::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("$1,250.50").unwrap();
/// let b = Amount::from_str("-1250.5").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "$1,250.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Creates an `Amount` from the absolute value of `value`.
    pub fn new(value: Decimal) -> Self {
        Self(value.abs().normalize())
    }

    /// Creates an `Amount` from a floating point value, such as the numeric amount extracted from
    /// an SMS. Returns `None` for NaN or infinite input.
    pub fn from_f64(value: f64) -> Option<Self> {
        Decimal::from_f64(value).map(Self::new)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Adds two amounts, returning `None` if the result does not fit.
    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount::new)
    }

    /// Parses an amount as bank messages display it, e.g. `$20.000`, `COP 1.234.567,89` or
    /// `$1,500.50`. Either `.` or `,` may group thousands; a trailing separator followed by exactly
    /// two digits marks the cents. Returns `None` for text that does not have that shape.
    pub fn from_display(s: &str) -> Option<Amount> {
        let trimmed = s.trim();
        let unsigned = trimmed.strip_prefix('-').unwrap_or(trimmed);
        let number = unsigned
            .strip_prefix('$')
            .or_else(|| unsigned.strip_prefix("COP"))
            .unwrap_or(unsigned)
            .trim_start();

        let parts: Vec<&str> = number.split(['.', ',']).collect();
        if parts
            .iter()
            .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
        {
            return None;
        }

        let (groups, cents) = match parts.split_last() {
            Some((last, rest)) if !rest.is_empty() && last.len() == 2 => (rest, Some(*last)),
            _ => (parts.as_slice(), None),
        };
        if groups.len() > 1 {
            let (first, rest) = groups.split_first()?;
            if first.len() > 3 || rest.iter().any(|g| g.len() != 3) {
                return None;
            }
        }

        let mut digits = groups.concat();
        if let Some(cents) = cents {
            digits.push('.');
            digits.push_str(cents);
        }
        Decimal::from_str(&digits).ok().map(Amount::new)
    }

    /// A lossy floating point view, for callers that chart or sum approximately.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError(rust_decimal::Error);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Amount::ZERO);
        }

        let unsigned = trimmed.strip_prefix('-').unwrap_or(trimmed);
        let unsigned = unsigned.strip_prefix('$').unwrap_or(unsigned).trim_start();
        let digits = unsigned.replace(',', "");

        let value = Decimal::from_str(&digits).map_err(AmountError)?;
        Ok(Amount::new(value))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "${}", format_num::format_num!(",.2", self.to_f64()))
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Plain decimal text keeps full precision, unlike the display form.
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_with_dollar_sign_and_commas() {
        let amount = Amount::from_str("$1,234,567.89").unwrap();
        assert_eq!(amount.value(), dec("1234567.89"));
    }

    #[test]
    fn test_parse_negative_becomes_magnitude() {
        assert_eq!(Amount::from_str("-$50.00").unwrap().value(), dec("50"));
        assert_eq!(Amount::from_str("-50.00").unwrap().value(), dec("50"));
    }

    #[test]
    fn test_parse_empty_and_whitespace() {
        assert!(Amount::from_str("").unwrap().is_zero());
        assert_eq!(Amount::from_str("  $ 50.00  ").unwrap().value(), dec("50"));
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(Amount::from_str("fifty").is_err());
    }

    #[test]
    fn test_from_f64() {
        let amount = Amount::from_f64(-12.5).unwrap();
        assert_eq!(amount.value(), dec("12.5"));
        assert!(Amount::from_f64(f64::NAN).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(Amount::new(dec("60000")).to_string(), "$60,000.00");
        assert_eq!(Amount::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn test_serde_keeps_precision() {
        let amount = Amount::from_str("1234.5678").unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"1234.5678\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
    }

    #[test]
    fn test_equality_ignores_trailing_zeros() {
        assert_eq!(
            Amount::from_str("50.00").unwrap(),
            Amount::from_str("50").unwrap()
        );
    }

    #[test]
    fn test_checked_add() {
        let a = Amount::from_str("1.50").unwrap();
        let b = Amount::from_str("2.25").unwrap();
        assert_eq!(a.checked_add(b).unwrap().value(), dec("3.75"));

        let max = Amount::from_str("79228162514264337593543950335").unwrap();
        assert!(max.checked_add(max).is_none());
    }

    #[test]
    fn test_from_display_dot_groups_thousands() {
        let amount = |s: &str| Amount::from_display(s).unwrap().value();
        assert_eq!(amount("$20.000"), dec("20000"));
        assert_eq!(amount("COP 1.234.567"), dec("1234567"));
        assert_eq!(amount("$1.234.567,89"), dec("1234567.89"));
    }

    #[test]
    fn test_from_display_comma_groups_thousands() {
        let amount = |s: &str| Amount::from_display(s).unwrap().value();
        assert_eq!(amount("$1,500"), dec("1500"));
        assert_eq!(amount("$1,500.50"), dec("1500.5"));
        assert_eq!(amount("-$35"), dec("35"));
        assert_eq!(amount("$15,00"), dec("15"));
    }

    #[test]
    fn test_from_display_rejects_other_shapes() {
        for s in ["", "$", "n/a", "$12.5", "$1.2345", "$12345.678", "$1..000", "+5"] {
            assert!(Amount::from_display(s).is_none(), "{s} should not parse");
        }
    }
}
