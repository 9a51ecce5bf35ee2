//! Lossless fixed-point amount type backed by rust_decimal.
//!
//! Every balance, share, and fund in the engine is a `Decimal`. Amounts are
//! truncated to a pool-wide scale (decimal places) so that splits and
//! dispersals stay exact and conservation can be checked with `==`.

use rust_decimal::prelude::RoundingStrategy;
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

/// Lossless decimal numeric type for pool accounting.
///
/// Serializes to its canonical string so stored documents never pass
/// through `f64`. Deserializes from either a string or a JSON number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct Decimal(RustDecimal);

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl Decimal {
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Decimal)
    }

    /// Format without exponent notation and without trailing zeros.
    pub fn to_canonical_string(&self) -> String {
        let normalized = self.0.normalize();
        format!("{}", normalized)
    }

    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    pub fn hundred() -> Self {
        Decimal(RustDecimal::ONE_HUNDRED)
    }

    pub fn from_int(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }

    /// The smallest representable amount at `scale` decimal places (10^-scale).
    pub fn unit(scale: u32) -> Self {
        Decimal(RustDecimal::new(1, scale))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    /// Truncate toward zero at `scale` decimal places.
    pub fn truncate_to(&self, scale: u32) -> Self {
        Decimal(self.0.round_dp_with_strategy(scale, RoundingStrategy::ToZero))
    }

    /// True when the value has no non-zero digits beyond `scale` decimal places.
    pub fn is_representable_at(&self, scale: u32) -> bool {
        self.truncate_to(scale) == *self
    }

    /// `self * percent / 100`, truncated at `scale`. `None` on overflow.
    pub fn percent_of(&self, percent: Decimal, scale: u32) -> Option<Self> {
        self.checked_mul(percent)
            .map(|product| (product / Decimal::hundred()).truncate_to(scale))
    }

    pub fn checked_add(self, rhs: Decimal) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Decimal)
    }

    pub fn checked_mul(self, rhs: Decimal) -> Option<Self> {
        self.0.checked_mul(rhs.0).map(Decimal)
    }

    /// `10^exponent`, or `None` past the 28-digit range.
    pub fn pow10(exponent: u32) -> Option<Self> {
        (0..exponent)
            .try_fold(RustDecimal::ONE, |acc, _| acc.checked_mul(RustDecimal::TEN))
            .map(Decimal)
    }

    /// `self / count`, truncated at `scale`. Never overshoots the exact quotient.
    pub fn split_evenly(&self, count: u64, scale: u32) -> Self {
        let divisor = Decimal(RustDecimal::from(count));
        let mut share = (*self / divisor).truncate_to(scale);
        if share * divisor > *self {
            share = share - Decimal::unit(scale);
        }
        share
    }

    /// `self / denominator * 100` rounded to 4 places; `None` when the denominator is zero.
    pub fn ratio_percent(self, denominator: Decimal) -> Option<Decimal> {
        if denominator.is_zero() {
            return None;
        }
        Some(Decimal((self.0 / denominator.0 * RustDecimal::ONE_HUNDRED).round_dp(4)))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl From<u64> for Decimal {
    fn from(value: u64) -> Self {
        Decimal(RustDecimal::from(value))
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::SubAssign for Decimal {
    fn sub_assign(&mut self, rhs: Decimal) {
        self.0 -= rhs.0;
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 / rhs.0)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

impl Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Self {
        iter.fold(Decimal::zero(), |acc, d| acc + d)
    }
}
