//! Monetary deal value
//!
//! Amounts are stored as integer minor units (cents) to keep persistence and
//! comparison exact. Free-text input is accepted in both `1,234.56` and
//! `1.234,56` shapes; the parser decides which separator is the decimal one
//! from position and digit count.

use crate::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Rough shape gate: digits optionally interleaved with `.` and `,`
static MONEY_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9][0-9.,]*$").unwrap_or_else(|e| panic!("invalid money shape regex: {e}"))
});

/// Monetary amount in minor units (cents), always non-negative
///
/// # Invariants
/// - `minor_units >= 0`
/// - Construction validates; the inner value is never exposed mutably
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero amount
    pub const ZERO: Money = Money(0);

    /// Create from minor units (cents)
    ///
    /// # Errors
    /// Returns [`ValidationError::NegativeMoney`] for negative input
    pub fn from_minor_units(units: i64) -> Result<Self, ValidationError> {
        if units < 0 {
            return Err(ValidationError::NegativeMoney);
        }
        Ok(Self(units))
    }

    /// Create from whole major units (e.g. whole euros)
    ///
    /// # Errors
    /// Returns an error for negative input or amounts beyond the
    /// representable range
    pub fn from_major_units(units: i64) -> Result<Self, ValidationError> {
        if units < 0 {
            return Err(ValidationError::NegativeMoney);
        }
        units
            .checked_mul(100)
            .map(Self)
            .ok_or_else(|| ValidationError::MoneyOutOfRange(units.to_string()))
    }

    /// Minor units (cents)
    #[inline]
    #[must_use]
    pub fn minor_units(&self) -> i64 {
        self.0
    }

    /// Parse free-text numeric input
    ///
    /// Accepted shapes (whitespace around the number is ignored):
    /// - `1234` / `1234.56` / `1234,56`
    /// - `1,234.56` (comma grouping, dot decimal)
    /// - `1.234,56` (dot grouping, comma decimal)
    /// - `0,5` (single fraction digit, scaled to cents)
    ///
    /// A single separator followed by exactly three digits is read as a
    /// grouping separator, so `1.234` and `1,234` both mean 1234 whole units.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] for empty input, negative amounts,
    /// malformed grouping, more than two fraction digits, or overflow
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let text = input.trim();
        if text.starts_with('-') {
            return Err(ValidationError::NegativeMoney);
        }
        if text.is_empty() || !MONEY_SHAPE.is_match(text) {
            return Err(ValidationError::InvalidMoney(input.trim().to_string()));
        }

        let (integer_part, fraction_part) = split_separators(text)
            .ok_or_else(|| ValidationError::InvalidMoney(text.to_string()))?;
        if fraction_part.len() > 2 {
            return Err(ValidationError::TooPreciseMoney(text.to_string()));
        }

        let whole: i64 = integer_part
            .parse()
            .map_err(|_| ValidationError::MoneyOutOfRange(text.to_string()))?;
        let cents = match fraction_part.len() {
            0 => 0,
            1 => {
                let tenths: i64 = fraction_part
                    .parse()
                    .map_err(|_| ValidationError::InvalidMoney(text.to_string()))?;
                tenths * 10
            }
            _ => fraction_part
                .parse()
                .map_err(|_| ValidationError::InvalidMoney(text.to_string()))?,
        };

        whole
            .checked_mul(100)
            .and_then(|units| units.checked_add(cents))
            .map(Self)
            .ok_or_else(|| ValidationError::MoneyOutOfRange(text.to_string()))
    }
}

/// Split `text` into (integer digits, fraction digits), resolving which
/// separator is decimal and which is grouping.
///
/// Returns `None` when the separator layout is malformed.
fn split_separators(text: &str) -> Option<(String, String)> {
    let dots = text.matches('.').count();
    let commas = text.matches(',').count();

    let (group_sep, decimal_at) = match (dots, commas) {
        (0, 0) => return Some((text.to_string(), String::new())),
        // Both present: the rightmost separator kind is the decimal one and
        // must occur exactly once.
        (d, c) if d > 0 && c > 0 => {
            let last_dot = text.rfind('.')?;
            let last_comma = text.rfind(',')?;
            if last_dot > last_comma {
                if d != 1 {
                    return None;
                }
                (Some(','), Some(last_dot))
            } else {
                if c != 1 {
                    return None;
                }
                (Some('.'), Some(last_comma))
            }
        }
        // One separator kind. A single occurrence followed by exactly three
        // digits is grouping; one or two digits is a decimal point.
        (1, 0) | (0, 1) => {
            let sep = if dots == 1 { '.' } else { ',' };
            let at = text.find(sep)?;
            let tail_len = text.len() - at - 1;
            match tail_len {
                1 | 2 => (None, Some(at)),
                3 => (Some(sep), None),
                _ => return None,
            }
        }
        // Repeated single-kind separators are always grouping.
        _ => {
            let sep = if dots > 0 { '.' } else { ',' };
            (Some(sep), None)
        }
    };

    let (integer_text, fraction) = match decimal_at {
        Some(at) => (&text[..at], text[at + 1..].to_string()),
        None => (text, String::new()),
    };
    if fraction.contains('.') || fraction.contains(',') {
        return None;
    }

    let integer = match group_sep {
        Some(sep) => {
            let groups: Vec<&str> = integer_text.split(sep).collect();
            let (first, rest) = groups.split_first()?;
            if first.is_empty() || first.len() > 3 {
                return None;
            }
            if rest.is_empty() || rest.iter().any(|g| g.len() != 3) {
                return None;
            }
            groups.concat()
        }
        None => {
            if integer_text.contains('.') || integer_text.contains(',') {
                return None;
            }
            integer_text.to_string()
        }
    };
    if integer.is_empty() {
        return None;
    }
    Some((integer, fraction))
}

impl std::str::FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Money {
    /// Renders with a dot decimal and two fraction digits, e.g. `1234.56`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn parses_plain_integer() {
        assert_eq!(Money::parse("1200"), Money::from_minor_units(120_000));
    }

    #[test]
    fn parses_dot_decimal() {
        assert_eq!(Money::parse("1234.56"), Money::from_minor_units(123_456));
    }

    #[test]
    fn parses_comma_decimal() {
        assert_eq!(Money::parse("1234,56"), Money::from_minor_units(123_456));
    }

    #[test]
    fn parses_us_grouping() {
        assert_eq!(Money::parse("1,234.56"), Money::from_minor_units(123_456));
    }

    #[test]
    fn parses_european_grouping() {
        assert_eq!(Money::parse("1.234,56"), Money::from_minor_units(123_456));
    }

    #[test]
    fn parses_single_fraction_digit_as_tenths() {
        assert_eq!(Money::parse("0,5"), Money::from_minor_units(50));
        assert_eq!(Money::parse("0.5"), Money::from_minor_units(50));
    }

    #[test]
    fn single_separator_with_three_digits_is_grouping() {
        assert_eq!(Money::parse("1.234"), Money::from_minor_units(123_400));
        assert_eq!(Money::parse("1,234"), Money::from_minor_units(123_400));
    }

    #[test]
    fn multi_group_without_decimal() {
        assert_eq!(
            Money::parse("1.234.567"),
            Money::from_minor_units(123_456_700)
        );
    }

    #[test]
    fn rejects_negative() {
        assert_eq!(Money::parse("-5"), Err(ValidationError::NegativeMoney));
        assert_eq!(
            Money::from_minor_units(-1),
            Err(ValidationError::NegativeMoney)
        );
    }

    #[test]
    fn rejects_three_fraction_digits_with_mixed_separators() {
        assert!(Money::parse("1,234.5678").is_err());
    }

    #[test]
    fn rejects_malformed_grouping() {
        assert!(Money::parse("12,34.56").is_err());
        assert!(Money::parse("1..2").is_err());
        assert!(Money::parse("1,,2").is_err());
        assert!(Money::parse("12.").is_err());
        assert!(Money::parse(".5").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(Money::parse("").is_err());
        assert!(Money::parse("abc").is_err());
        assert!(Money::parse("12a").is_err());
        assert!(Money::parse("1 234").is_err());
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(Money::parse("  42.00 "), Money::from_minor_units(4200));
    }

    #[test]
    fn display_round_trips() {
        let amount = Money::from_minor_units(123_456).unwrap();
        assert_eq!(amount.to_string(), "1234.56");
        assert_eq!(Money::parse(&amount.to_string()), Ok(amount));
    }

    #[test]
    fn overflow_is_an_error() {
        assert!(matches!(
            Money::parse("92233720368547758079"),
            Err(ValidationError::MoneyOutOfRange(_))
        ));
    }

    proptest! {
        #[test]
        fn parse_never_panics(input in ".*") {
            let _ = Money::parse(&input);
        }

        #[test]
        fn display_parse_round_trip(units in 0i64..=i64::MAX / 200) {
            let amount = Money::from_minor_units(units).unwrap();
            prop_assert_eq!(Money::parse(&amount.to_string()), Ok(amount));
        }
    }
}
