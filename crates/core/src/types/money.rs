//! Money amounts in Chilean pesos.
//!
//! CLP has no fractional sub-units, so amounts are whole `i64` pesos.
//! Percentage math (the client discount) goes through [`rust_decimal`] and
//! rounds half away from zero back to whole pesos.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An amount of Chilean pesos.
///
/// Displays in the local convention: `$12.500 CLP`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero pesos.
    pub const ZERO: Self = Self(0);

    /// Create an amount from whole pesos.
    #[must_use]
    pub const fn new(pesos: i64) -> Self {
        Self(pesos)
    }

    /// Get the amount in whole pesos.
    #[must_use]
    pub const fn amount(self) -> i64 {
        self.0
    }

    /// Whether this amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Take a fraction of this amount, rounding half away from zero to
    /// whole pesos. Used for the percentage-based client discount.
    #[must_use]
    pub fn fraction(self, rate: Decimal) -> Self {
        let exact = Decimal::from(self.0) * rate;
        let rounded = exact.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        Self(rounded.to_i64().unwrap_or_default())
    }

    /// Subtract, clamping at zero. Monetary totals are never negative.
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        let diff = self.0 - other.0;
        if diff < 0 { Self::ZERO } else { Self(diff) }
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self {
        Self(self.0 * i64::from(quantity))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}${} CLP", group_thousands(self.0.unsigned_abs()))
    }
}

/// Group digits in threes with `.` separators (es-CL convention).
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - offset) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // 0.05
    fn five_percent() -> Decimal {
        Decimal::new(5, 2)
    }

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::new(0).to_string(), "$0 CLP");
        assert_eq!(Money::new(500).to_string(), "$500 CLP");
        assert_eq!(Money::new(3000).to_string(), "$3.000 CLP");
        assert_eq!(Money::new(25_000).to_string(), "$25.000 CLP");
        assert_eq!(Money::new(1_234_567).to_string(), "$1.234.567 CLP");
    }

    #[test]
    fn test_display_negative() {
        assert_eq!(Money::new(-1500).to_string(), "-$1.500 CLP");
    }

    #[test]
    fn test_fraction_rounds_half_away_from_zero() {
        // 5% of 10_000 is exactly 500
        assert_eq!(Money::new(10_000).fraction(five_percent()), Money::new(500));
        // 5% of 12_345 is 617.25 -> 617
        assert_eq!(Money::new(12_345).fraction(five_percent()), Money::new(617));
        // 5% of 12_350 is 617.5 -> 618
        assert_eq!(Money::new(12_350).fraction(five_percent()), Money::new(618));
    }

    #[test]
    fn test_saturating_sub_clamps_at_zero() {
        assert_eq!(
            Money::new(100).saturating_sub(Money::new(300)),
            Money::ZERO
        );
        assert_eq!(
            Money::new(300).saturating_sub(Money::new(100)),
            Money::new(200)
        );
    }

    #[test]
    fn test_arithmetic() {
        let subtotal: Money = [Money::new(1000), Money::new(2500)].into_iter().sum();
        assert_eq!(subtotal, Money::new(3500));
        assert_eq!(Money::new(990) * 3, Money::new(2970));
    }
}
