//! `Real`: a rounded arbitrary-precision decimal
//!
//! Each arithmetic result is rounded to [`PRECISION_DIGITS`] significant
//! digits. Multiplication chains therefore never grow without bound, and
//! the relative error of one operation stays near 10^-80.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Sub, SubAssign};
use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_traits::{One, Signed, ToPrimitive, Zero};
use thiserror::Error;

/// Significant decimal digits kept after every operation.
pub const PRECISION_DIGITS: u64 = 80;

/// Default absolute tolerance for "close enough to a boundary" checks.
pub const DEFAULT_TOLERANCE: &str = "1e-18";

/// Failure to build a [`Real`] from text or a float.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseRealError {
    /// Input text is not a decimal number.
    #[error("invalid decimal literal '{0}'")]
    InvalidLiteral(String),

    /// NaN or infinite floats have no decimal value.
    #[error("non-finite value {0}")]
    NonFinite(f64),
}

/// Extended-precision real number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Real(BigDecimal);

impl Real {
    fn rounded(value: BigDecimal) -> Self {
        Real(value.with_prec(PRECISION_DIGITS))
    }

    /// 0
    pub fn zero() -> Self {
        Real(BigDecimal::zero())
    }

    /// 1
    pub fn one() -> Self {
        Real(BigDecimal::one())
    }

    /// 1/2
    pub fn half() -> Self {
        Real(BigDecimal::new(5.into(), 1))
    }

    /// Tolerance used when no other tolerance is configured.
    pub fn default_tolerance() -> Self {
        DEFAULT_TOLERANCE
            .parse()
            .unwrap_or_else(|_| Real(BigDecimal::new(1.into(), 18)))
    }

    /// `num / den`, rounded to working precision.
    ///
    /// Panics if `den` is zero.
    pub fn ratio(num: u64, den: u64) -> Self {
        assert!(den != 0, "ratio with zero denominator");
        Real::from(num) / Real::from(den)
    }

    /// Division that yields `None` instead of panicking on a zero divisor.
    pub fn checked_div(&self, rhs: &Real) -> Option<Real> {
        if rhs.is_zero() {
            None
        } else {
            Some(self / rhs)
        }
    }

    /// `1 - self`
    pub fn complement(&self) -> Real {
        &Real::one() - self
    }

    /// `|self - other| < tolerance`
    pub fn approx_eq(&self, other: &Real, tolerance: &Real) -> bool {
        (&self.0 - &other.0).abs() < tolerance.0
    }

    /// Exact zero test.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Strictly below zero.
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Absolute value.
    pub fn abs(&self) -> Real {
        Real(self.0.abs())
    }

    /// Lossy conversion for reporting; values below `f64` range become 0.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    /// Borrow the underlying decimal.
    pub fn as_decimal(&self) -> &BigDecimal {
        &self.0
    }

    /// `2^bits`, exact while it fits the working precision.
    pub fn pow2(bits: u32) -> Real {
        (0..bits).fold(Real::one(), |acc, _| &acc + &acc)
    }

    /// `index / 2^bits`
    pub fn dyadic(index: u64, bits: u32) -> Real {
        Real::from(index) / Real::pow2(bits)
    }

    /// `floor(self * 2^bits)` for non-negative values, saturating at the
    /// ends of the `u64` range.
    pub fn floor_scaled(&self, bits: u32) -> u64 {
        if self.is_negative() {
            return 0;
        }
        let scaled = &self.0 * &Real::pow2(bits).0;
        scaled.with_scale(0).to_u64().unwrap_or(u64::MAX)
    }
}

impl Default for Real {
    fn default() -> Self {
        Real::zero()
    }
}

impl From<u64> for Real {
    fn from(value: u64) -> Self {
        Real(BigDecimal::from(value))
    }
}

impl From<u32> for Real {
    fn from(value: u32) -> Self {
        Real(BigDecimal::from(value))
    }
}

impl From<BigDecimal> for Real {
    fn from(value: BigDecimal) -> Self {
        Real::rounded(value)
    }
}

impl TryFrom<f64> for Real {
    type Error = ParseRealError;

    /// Uses the shortest decimal that round-trips to `value`, so `0.2`
    /// becomes exactly 2/10 rather than the nearest binary fraction.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(ParseRealError::NonFinite(value));
        }
        value.to_string().parse()
    }
}

impl FromStr for Real {
    type Err = ParseRealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigDecimal::from_str(s.trim())
            .map(Real::rounded)
            .map_err(|_| ParseRealError::InvalidLiteral(s.to_string()))
    }
}

impl fmt::Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(digits) => write!(f, "{:.*}", digits, self.to_f64()),
            None => write!(f, "{}", self.0.normalized()),
        }
    }
}

macro_rules! forward_binop {
    ($op:ident, $method:ident) => {
        impl<'a, 'b> $op<&'b Real> for &'a Real {
            type Output = Real;

            fn $method(self, rhs: &'b Real) -> Real {
                Real::rounded($op::$method(&self.0, &rhs.0))
            }
        }

        impl<'b> $op<&'b Real> for Real {
            type Output = Real;

            fn $method(self, rhs: &'b Real) -> Real {
                (&self).$method(rhs)
            }
        }

        impl<'a> $op<Real> for &'a Real {
            type Output = Real;

            fn $method(self, rhs: Real) -> Real {
                self.$method(&rhs)
            }
        }

        impl $op<Real> for Real {
            type Output = Real;

            fn $method(self, rhs: Real) -> Real {
                (&self).$method(&rhs)
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);
forward_binop!(Div, div);

impl AddAssign<&Real> for Real {
    fn add_assign(&mut self, rhs: &Real) {
        *self = &*self + rhs;
    }
}

impl SubAssign<&Real> for Real {
    fn sub_assign(&mut self, rhs: &Real) {
        *self = &*self - rhs;
    }
}

impl MulAssign<&Real> for Real {
    fn mul_assign(&mut self, rhs: &Real) {
        *self = &*self * rhs;
    }
}
