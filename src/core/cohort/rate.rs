//! Percentage rates in fixed point

use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::Add;

/// A percentage with two decimals, stored as hundredths of a percent.
///
/// `Rate::from_hundredths(3333)` is `33.33 %`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rate(i64);

impl Rate {
    /// `0.00`
    pub const ZERO: Self = Self(0);

    /// Build from hundredths of a percent
    #[must_use]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Self(hundredths)
    }

    /// Hundredths of a percent
    #[must_use]
    pub const fn hundredths(self) -> i64 {
        self.0
    }

    /// Rendered with a trailing percent sign: `33.33 %`
    #[must_use]
    pub fn percent_label(self) -> String {
        format!("{self} %")
    }
}

/// `numerator * 100 / denominator`, rounded half away from zero to two
/// decimals. A non-positive denominator yields zero.
#[must_use]
pub fn rate(numerator: i64, denominator: i64) -> Rate {
    if denominator <= 0 {
        return Rate::ZERO;
    }
    let scaled = i128::from(numerator) * 10_000;
    let denominator = i128::from(denominator);
    let quotient = scaled / denominator;
    let remainder = scaled % denominator;
    let rounded = if remainder.abs() * 2 >= denominator {
        quotient + scaled.signum()
    } else {
        quotient
    };
    Rate(i64::try_from(rounded).unwrap_or(if rounded > 0 { i64::MAX } else { i64::MIN }))
}

/// [`rate`] over unsigned counts, the usual case for populations
#[must_use]
pub fn count_rate(numerator: usize, denominator: usize) -> Rate {
    rate(
        i64::try_from(numerator).unwrap_or(i64::MAX),
        i64::try_from(denominator).unwrap_or(i64::MAX),
    )
}

impl Add for Rate {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl std::iter::Sum for Rate {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_in_three() {
        assert_eq!(rate(1, 3).to_string(), "33.33");
        assert_eq!(rate(2, 3).to_string(), "66.67");
        assert_eq!(rate(1, 3).percent_label(), "33.33 %");
    }

    #[test]
    fn zero_denominator_is_zero() {
        assert_eq!(rate(5, 0), Rate::ZERO);
        assert_eq!(rate(0, 0).to_string(), "0.00");
        assert_eq!(rate(3, -2), Rate::ZERO);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        // 1/8 = 12.5 %, exact; 1/16 = 6.25 %; 1/1600 = 0.0625 % -> 0.06
        assert_eq!(rate(1, 8).hundredths(), 1250);
        assert_eq!(rate(1, 1600).hundredths(), 6);
        // 1/800 = 0.125 % -> 0.13
        assert_eq!(rate(1, 800).hundredths(), 13);
        assert_eq!(rate(-1, 800).hundredths(), -13);
        assert_eq!(rate(-1, 3).to_string(), "-33.33");
    }

    #[test]
    fn bounded_for_valid_fractions() {
        for d in 1..=40 {
            for n in 0..=d {
                let r = rate(n, d).hundredths();
                assert!((0..=10_000).contains(&r), "{n}/{d} gave {r}");
            }
        }
        assert_eq!(rate(7, 7).to_string(), "100.00");
    }

    #[test]
    fn serializes_as_string() {
        assert_eq!(
            serde_json::to_string(&rate(1, 3)).expect("json"),
            "\"33.33\""
        );
        let total: Rate = [rate(1, 3), rate(1, 3)].into_iter().sum();
        assert_eq!(total.to_string(), "66.66");
    }
}
