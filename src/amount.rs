//! Monetary amounts with exactly two decimal places.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An amount of money held in minor units (cents).
///
/// Parsing rounds to two decimal places, half away from zero. Both `.` and the
/// Slovak decimal comma are accepted as separators.
///
/// # Example
///
/// ```rust
/// use paybysquare::Amount;
///
/// let amount: Amount = "1234,565".parse().unwrap();
/// assert_eq!(amount.to_string(), "1234.57");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "RawAmount", into = "String")]
pub struct Amount(i64);

impl Amount {
    /// Zero, the amount of an unpriced order.
    pub const ZERO: Amount = Amount(0);

    /// Creates an amount from a number of cents.
    pub const fn from_minor(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents.
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Converts a float through its shortest decimal form, so `1.005` rounds
    /// the same way as the string `"1.005"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAmount`] for NaN, infinities and values that do
    /// not fit in 64 bits of cents.
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::InvalidAmount(value.to_string()));
        }
        value.to_string().parse()
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidAmount(s.to_string());
        let text = s.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (whole, fraction) = match digits.find(|c: char| c == '.' || c == ',') {
            Some(at) => (&digits[..at], &digits[at + 1..]),
            None => (digits, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let mut cents: i64 = 0;
        for b in whole.bytes() {
            cents = cents
                .checked_mul(10)
                .and_then(|c| c.checked_add(i64::from(b - b'0')))
                .ok_or_else(invalid)?;
        }
        let mut frac = fraction.bytes().map(|b| i64::from(b - b'0'));
        let tenths = frac.next().unwrap_or(0);
        let hundredths = frac.next().unwrap_or(0);
        let round_up = frac.next().is_some_and(|d| d >= 5);
        cents = cents
            .checked_mul(100)
            .and_then(|c| c.checked_add(tenths * 10 + hundredths + i64::from(round_up)))
            .ok_or_else(invalid)?;

        Ok(Self(if negative { -cents } else { cents }))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl TryFrom<f64> for Amount {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Self::from_f64(value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}

/// Wire form accepted in JSON input: either a number or a decimal string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

impl TryFrom<RawAmount> for Amount {
    type Error = Error;

    fn try_from(raw: RawAmount) -> Result<Self> {
        match raw {
            RawAmount::Number(n) => Self::from_f64(n),
            RawAmount::Text(s) => s.parse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        assert_eq!("15".parse::<Amount>().unwrap().to_string(), "15.00");
        assert_eq!("15.5".parse::<Amount>().unwrap().to_string(), "15.50");
        assert_eq!("0,99".parse::<Amount>().unwrap().to_string(), "0.99");
        assert_eq!(".5".parse::<Amount>().unwrap().to_string(), "0.50");
        assert_eq!(" 7.00 ".parse::<Amount>().unwrap().minor(), 700);
        assert_eq!("-3.1".parse::<Amount>().unwrap().to_string(), "-3.10");
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        assert_eq!("1.005".parse::<Amount>().unwrap().to_string(), "1.01");
        assert_eq!("1.0049".parse::<Amount>().unwrap().to_string(), "1.00");
        assert_eq!("-1.005".parse::<Amount>().unwrap().to_string(), "-1.01");
        assert_eq!(Amount::from_f64(2.5).unwrap().to_string(), "2.50");
        assert_eq!(Amount::from_f64(0.125).unwrap().to_string(), "0.13");
    }

    #[test]
    fn test_float_rounds_like_its_decimal_text() {
        assert_eq!(Amount::from_f64(1.005).unwrap().to_string(), "1.01");
        assert_eq!(Amount::from_f64(-1.005).unwrap().to_string(), "-1.01");
        assert_eq!(Amount::from_f64(19.99).unwrap().minor(), 1999);
        assert!(matches!(Amount::from_f64(1e300), Err(Error::InvalidAmount(_))));

        let number: Amount = serde_json::from_str("1.005").unwrap();
        let text: Amount = serde_json::from_str("\"1.005\"").unwrap();
        assert_eq!(number, text);
        assert_eq!(number.to_string(), "1.01");
    }

    #[test]
    fn test_rejects_non_numeric() {
        for bad in ["", "abc", "1.2.3", "12a", "-", ".", "1 000"] {
            assert!(
                matches!(bad.parse::<Amount>(), Err(Error::InvalidAmount(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(Amount::from_f64(f64::NAN).is_err());
        assert!(Amount::from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn test_deserialize_number_or_string() {
        let a: Amount = serde_json::from_str("15").unwrap();
        let b: Amount = serde_json::from_str("\"15.00\"").unwrap();
        assert_eq!(a, b);
        assert!(serde_json::from_str::<Amount>("\"x\"").is_err());
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"15.00\"");
    }
}
