use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const LOCAL_CURRENCY_CODE: &str = "ARS";
pub const USD_CURRENCY_CODE: &str = "USD";

//--------------------------------------       Money       -----------------------------------------------------------
/// A monetary amount in hundredths of the local currency unit (centavos).
///
/// All monetary columns in the database use this representation, so every value that reaches storage has already
/// been quantised to two decimal places. The persistence layer stores at most [`Money::MAX_STORED`], so amounts
/// derived from floating-point intermediates must go through [`Money::clamped`] before being written.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a monetary amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<f64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(MoneyConversionError(format!("{value} is not a finite number")));
        }
        if value.abs() > Self::MAX_STORED.to_f64() {
            return Err(MoneyConversionError(format!("{value} exceeds the maximum storable amount")));
        }
        Ok(Self((value * 100.0).round() as i64))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let units = self.0 as f64 / 100.0;
        write!(f, "{units:0.2} {LOCAL_CURRENCY_CODE}")
    }
}

impl Money {
    /// The largest magnitude that fits in the database's DECIMAL(10, 2) match columns.
    pub const MAX_STORED: Money = Money(9_999_999_999);

    /// The amount in hundredths.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// The amount in whole currency units.
    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    /// Quantise a floating-point amount to two decimal places, clamping the magnitude to [`Money::MAX_STORED`].
    ///
    /// Corrupt or overflowed intermediates (NaN, infinities) collapse to zero. The sign is preserved.
    pub fn clamped(value: f64) -> Self {
        if !value.is_finite() {
            return Self(0);
        }
        let bounded = value.clamp(-Self::MAX_STORED.to_f64(), Self::MAX_STORED.to_f64());
        Self((bounded * 100.0).round() as i64)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Money::from(15_000);
        let b = Money::from(1_150);
        assert_eq!((a + b).value(), 16_150);
        assert_eq!((a - b).value(), 13_850);
        assert_eq!((-b).value(), -1_150);
        assert_eq!((b * 3).value(), 3_450);
    }

    #[test]
    fn clamping_preserves_sign_and_bounds() {
        assert_eq!(Money::clamped(150.0).value(), 15_000);
        assert_eq!(Money::clamped(-138.5).value(), -13_850);
        assert_eq!(Money::clamped(1e12), Money::MAX_STORED);
        assert_eq!(Money::clamped(-1e12), -Money::MAX_STORED);
        assert_eq!(Money::clamped(f64::NAN).value(), 0);
        assert_eq!(Money::clamped(f64::INFINITY).value(), 0);
    }

    #[test]
    fn try_from_rejects_overflow() {
        assert!(Money::try_from(1e12).is_err());
        assert!(Money::try_from(f64::NAN).is_err());
        assert_eq!(Money::try_from(138.5).unwrap().value(), 13_850);
    }

    #[test]
    fn display_renders_local_currency() {
        assert_eq!(Money::from(13_850).to_string(), "138.50 ARS");
    }
}
