//! Arbitrary-precision decimal-string comparison.
//!
//! Number cells store decimal strings, and users do paste values past the
//! range where f64 comparison stays exact. The comparator works on the
//! digit strings directly so equality and ordering never drift for large
//! integers.

use std::cmp::Ordering;

/// A parsed decimal: sign plus normalized digit strings. `int` carries no
/// leading zeros, `frac` no trailing zeros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    negative: bool,
    int: String,
    frac: String,
}

impl Decimal {
    /// Parse a decimal literal: optional sign, digits, optional fraction.
    /// Anything else, including the empty string, is not a number.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (negative, digits) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw.strip_prefix('+').unwrap_or(raw)),
        };
        if digits.is_empty() {
            return None;
        }

        let (int_part, frac_part) = match digits.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }

        let int = int_part.trim_start_matches('0');
        let frac = frac_part.trim_end_matches('0');
        let mut decimal = Decimal {
            negative,
            int: int.to_string(),
            frac: frac.to_string(),
        };
        // Normalize -0 to 0 so sign comparison stays total.
        if decimal.int.is_empty() && decimal.frac.is_empty() {
            decimal.negative = false;
        }
        Some(decimal)
    }

    fn magnitude_cmp(&self, other: &Self) -> Ordering {
        self.int
            .len()
            .cmp(&other.int.len())
            .then_with(|| self.int.cmp(&other.int))
            .then_with(|| {
                let width = self.frac.len().max(other.frac.len());
                let a = pad_right(&self.frac, width);
                let b = pad_right(&other.frac, width);
                a.cmp(&b)
            })
    }
}

fn pad_right(digits: &str, width: usize) -> String {
    let mut padded = String::with_capacity(width);
    padded.push_str(digits);
    while padded.len() < width {
        padded.push('0');
    }
    padded
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.magnitude_cmp(other),
            (true, true) => other.magnitude_cmp(self),
        }
    }
}

/// Compare two decimal strings. `None` when either side fails to parse;
/// the filter engine fails closed on that.
pub fn compare(a: &str, b: &str) -> Option<Ordering> {
    Some(Decimal::parse(a)?.cmp(&Decimal::parse(b)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_large_integers_compare_exactly() {
        // Adjacent values that collapse to the same f64.
        let a = "9007199254740993";
        let b = "9007199254740992";
        assert_eq!(compare(a, b), Some(Ordering::Greater));
        assert_eq!(compare(a, a), Some(Ordering::Equal));
    }

    #[test]
    fn test_fractions_and_signs() {
        assert_eq!(compare("1.5", "1.50"), Some(Ordering::Equal));
        assert_eq!(compare("-2", "1"), Some(Ordering::Less));
        assert_eq!(compare("-2", "-3"), Some(Ordering::Greater));
        assert_eq!(compare("0", "-0"), Some(Ordering::Equal));
        assert_eq!(compare("0.1", "0.09"), Some(Ordering::Greater));
        assert_eq!(compare("10", "9"), Some(Ordering::Greater));
    }

    #[test]
    fn test_non_numeric_fails_to_parse() {
        assert_eq!(compare("abc", "1"), None);
        assert_eq!(compare("", "1"), None);
        assert_eq!(compare("1.2.3", "1"), None);
        assert_eq!(compare("1e5", "1"), None);
    }
}
