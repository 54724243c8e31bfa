//! Exact decimal numeric type backed by bigdecimal.
//!
//! Division and square roots are only available through fixed-scale helpers
//! that truncate at a known number of fractional digits, so every result is a
//! pure function of its inputs. Serializes to a canonical JSON string.

use bigdecimal::{BigDecimal, ParseBigDecimalError};
use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Fractional digits kept by `checked_div`, `sqrt` and `inverse`.
pub const DIVISION_SCALE: i64 = 50;

/// `10^exp` as a BigInt.
pub fn pow10(exp: u32) -> BigInt {
    BigInt::from(10u32).pow(exp)
}

/// Arbitrary-precision decimal for on-chain and reward arithmetic.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Decimal(BigDecimal);

impl Decimal {
    /// Create a Decimal from a BigDecimal.
    pub fn new(value: BigDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, ParseBigDecimalError> {
        BigDecimal::from_str(s.trim()).map(Decimal)
    }

    /// Format the Decimal as a canonical string (no exponent, no trailing zeros).
    pub fn to_canonical_string(&self) -> String {
        let normalized = self.0.normalized();
        let (_, scale) = normalized.as_bigint_and_exponent();
        if scale < 0 {
            format!("{}", normalized.with_scale(0))
        } else {
            format!("{}", normalized)
        }
    }

    /// Get the underlying BigDecimal.
    pub fn inner(&self) -> &BigDecimal {
        &self.0
    }

    pub fn from_bigint(value: BigInt) -> Self {
        Decimal(BigDecimal::new(value, 0))
    }

    pub fn from_biguint(value: &BigUint) -> Self {
        Self::from_bigint(BigInt::from_biguint(Sign::Plus, value.clone()))
    }

    pub fn from_i64(value: i64) -> Self {
        Self::from_bigint(BigInt::from(value))
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal(BigDecimal::zero())
    }

    /// The multiplicative identity (1).
    pub fn one() -> Self {
        Decimal(BigDecimal::one())
    }

    /// Returns true if the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        self.0.sign() == Sign::Plus
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        self.0.sign() == Sign::Minus
    }

    /// Exact `(numerator, denominator)` pair with a positive denominator.
    pub fn to_ratio(&self) -> (BigInt, BigInt) {
        let (digits, scale) = self.0.as_bigint_and_exponent();
        if scale >= 0 {
            (digits, pow10(scale as u32))
        } else {
            (digits * pow10((-scale) as u32), BigInt::one())
        }
    }

    /// `floor(numerator / denominator)` truncated to `scale` fractional digits.
    ///
    /// Returns None when the denominator is zero.
    pub fn from_ratio_floor(numerator: &BigInt, denominator: &BigInt, scale: i64) -> Option<Self> {
        if denominator.is_zero() {
            return None;
        }
        let (numerator, denominator) = if denominator.sign() == Sign::Minus {
            (-numerator, -denominator)
        } else {
            (numerator.clone(), denominator.clone())
        };
        let digits = (numerator * pow10(scale as u32)).div_floor(&denominator);
        Some(Decimal(BigDecimal::new(digits, scale)))
    }

    /// Division truncated to `DIVISION_SCALE` fractional digits.
    pub fn checked_div(&self, rhs: &Decimal) -> Option<Decimal> {
        self.div_with_scale(rhs, DIVISION_SCALE)
    }

    /// Division truncated (towards negative infinity) to `scale` digits.
    pub fn div_with_scale(&self, rhs: &Decimal, scale: i64) -> Option<Decimal> {
        let (n1, d1) = self.to_ratio();
        let (n2, d2) = rhs.to_ratio();
        Self::from_ratio_floor(&(n1 * d2), &(d1 * n2), scale)
    }

    /// `1 / self` at `DIVISION_SCALE`.
    pub fn inverse(&self) -> Option<Decimal> {
        Decimal::one().checked_div(self)
    }

    /// Square root truncated to `DIVISION_SCALE` fractional digits.
    ///
    /// Returns None for negative inputs.
    pub fn sqrt(&self) -> Option<Decimal> {
        if self.is_negative() {
            return None;
        }
        let (numerator, denominator) = self.to_ratio();
        let radicand = (numerator * pow10(2 * DIVISION_SCALE as u32)).div_floor(&denominator);
        Some(Decimal(BigDecimal::new(radicand.sqrt(), DIVISION_SCALE)))
    }

    /// Largest integer `<= self`.
    pub fn floor(&self) -> BigInt {
        let (numerator, denominator) = self.to_ratio();
        numerator.div_floor(&denominator)
    }

    /// Smallest integer `>= self`.
    pub fn ceil(&self) -> BigInt {
        let (numerator, denominator) = self.to_ratio();
        let (quotient, remainder) = numerator.div_mod_floor(&denominator);
        if remainder.is_zero() {
            quotient
        } else {
            quotient + 1
        }
    }

    /// `ceil(self / rhs)` computed exactly. None when `rhs` is zero.
    pub fn div_ceil_int(&self, rhs: &Decimal) -> Option<BigInt> {
        let (n1, d1) = self.to_ratio();
        let (n2, d2) = rhs.to_ratio();
        let (numerator, denominator) = (n1 * d2, d1 * n2);
        if denominator.is_zero() {
            return None;
        }
        let (numerator, denominator) = if denominator.sign() == Sign::Minus {
            (-numerator, -denominator)
        } else {
            (numerator, denominator)
        };
        let (quotient, remainder) = numerator.div_mod_floor(&denominator);
        Some(if remainder.is_zero() {
            quotient
        } else {
            quotient + 1
        })
    }

    /// Round down to `scale` fractional digits.
    pub fn floor_to_scale(&self, scale: i64) -> Decimal {
        let (numerator, denominator) = self.to_ratio();
        // denominator is never zero here
        Self::from_ratio_floor(&numerator, &denominator, scale).unwrap_or_default()
    }

    /// Round up to `scale` fractional digits.
    pub fn ceil_to_scale(&self, scale: i64) -> Decimal {
        let shifted = self * &Decimal::from_bigint(pow10(scale as u32));
        Decimal(BigDecimal::new(shifted.ceil(), scale))
    }

    /// Integer value at `scale` fractional digits, truncating: `floor(self * 10^scale)`.
    pub fn to_scaled_int(&self, scale: i64) -> BigInt {
        (self * &Decimal::from_bigint(pow10(scale as u32))).floor()
    }

    pub fn from_scaled_int(value: BigInt, scale: i64) -> Decimal {
        Decimal(BigDecimal::new(value, scale))
    }

    /// Integer power, negative exponents go through `inverse`.
    pub fn powi(&self, exp: i32) -> Option<Decimal> {
        let mut result = Decimal::one();
        for _ in 0..exp.unsigned_abs() {
            result = &result * self;
        }
        if exp < 0 {
            result.inverse()
        } else {
            Some(result)
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = ParseBigDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<BigDecimal> for Decimal {
    fn from(value: BigDecimal) -> Self {
        Decimal(value)
    }
}

impl From<BigInt> for Decimal {
    fn from(value: BigInt) -> Self {
        Decimal::from_bigint(value)
    }
}

impl From<&BigUint> for Decimal {
    fn from(value: &BigUint) -> Self {
        Decimal::from_biguint(value)
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Decimal::from_str_canonical(&s).map_err(serde::de::Error::custom)
    }
}

// Arithmetic operations
impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl<'a> std::ops::Add<&'a Decimal> for &'a Decimal {
    type Output = Decimal;

    fn add(self, rhs: &'a Decimal) -> Decimal {
        Decimal(&self.0 + &rhs.0)
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl<'a> std::ops::Sub<&'a Decimal> for &'a Decimal {
    type Output = Decimal;

    fn sub(self, rhs: &'a Decimal) -> Decimal {
        Decimal(&self.0 - &rhs.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl<'a> std::ops::Mul<&'a Decimal> for &'a Decimal {
    type Output = Decimal;

    fn mul(self, rhs: &'a Decimal) -> Decimal {
        Decimal(&self.0 * &rhs.0)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

impl std::iter::Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Decimal {
        iter.fold(Decimal::zero(), |acc, d| acc + d)
    }
}
