//! The reference-counted rational value type used only at I/O boundaries.
//! It is never used on the solve path; the tableau works exclusively in
//! the `(denominator, numerators)` row convention of [`crate::tableau`].
//!
//! Encodes NaN as `0/0`, `+∞` as `n/0` (n > 0) and `-∞` as `n/0` (n < 0),
//! normalized so that `gcd(|numer|, denom) = 1` and `denom >= 0`.

use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, Zero};

#[derive(Debug, Clone)]
pub struct Value {
    numer: BigInt,
    denom: BigInt,
}

impl Value {
    pub fn new(numer: BigInt, denom: BigInt) -> Self {
        Self { numer, denom }.normalized()
    }

    pub fn from_integer(n: BigInt) -> Self {
        Self { numer: n, denom: BigInt::from(1) }
    }

    pub fn nan() -> Self {
        Self { numer: BigInt::zero(), denom: BigInt::zero() }
    }

    pub fn infinity() -> Self {
        Self { numer: BigInt::from(1), denom: BigInt::zero() }
    }

    pub fn neg_infinity() -> Self {
        Self { numer: BigInt::from(-1), denom: BigInt::zero() }
    }

    pub fn is_nan(&self) -> bool {
        self.denom.is_zero() && self.numer.is_zero()
    }

    pub fn is_infinite(&self) -> bool {
        self.denom.is_zero() && !self.numer.is_zero()
    }

    pub fn is_finite(&self) -> bool {
        !self.denom.is_zero()
    }

    pub fn numer(&self) -> &BigInt {
        &self.numer
    }

    pub fn denom(&self) -> &BigInt {
        &self.denom
    }

    /// Restores `gcd(|numer|, denom) = 1` and `denom >= 0`, without touching
    /// the NaN/∞ encodings (which have `denom == 0` by construction).
    fn normalized(mut self) -> Self {
        if self.denom.is_negative() {
            self.numer = -self.numer;
            self.denom = -self.denom;
        }
        if self.denom.is_zero() {
            // NaN / ±∞: collapse the numerator to its sign only.
            self.numer = if self.numer.is_zero() {
                BigInt::zero()
            } else if self.numer.is_positive() {
                BigInt::from(1)
            } else {
                BigInt::from(-1)
            };
            return self;
        }
        let g = self.numer.gcd(&self.denom);
        if !g.is_zero() && g != BigInt::from(1) {
            self.numer /= &g;
            self.denom /= &g;
        }
        self
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if self.is_nan() || other.is_nan() {
            return false;
        }
        self.numer == other.numer && self.denom == other.denom
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.is_nan() || other.is_nan() {
            return None;
        }
        // Cross-multiply; both denominators are non-negative after normalization.
        let lhs = &self.numer * &other.denom;
        let rhs = &other.numer * &self.denom;
        Some(lhs.cmp(&rhs))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nan() {
            return write!(f, "NaN");
        }
        if self.is_infinite() {
            return write!(f, "{}", if self.numer.is_positive() { "+inf" } else { "-inf" });
        }
        if self.denom == BigInt::from(1) {
            write!(f, "{}", self.numer)
        } else {
            write!(f, "{}/{}", self.numer, self.denom)
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::from_integer(BigInt::from(n))
    }
}

impl From<(i64, i64)> for Value {
    fn from((n, d): (i64, i64)) -> Self {
        Value::new(BigInt::from(n), BigInt::from(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_gcd_and_sign() {
        let v = Value::new(BigInt::from(-4), BigInt::from(-6));
        assert_eq!(v.numer(), &BigInt::from(2));
        assert_eq!(v.denom(), &BigInt::from(3));
    }

    #[test]
    fn encodes_nan_and_infinities() {
        assert!(Value::nan().is_nan());
        assert!(Value::infinity().is_infinite());
        assert!(Value::neg_infinity().is_infinite());
        assert!(Value::from(3i64).is_finite());
    }

    #[test]
    fn displays_integer_and_fraction_forms() {
        assert_eq!(Value::from(3i64).to_string(), "3");
        assert_eq!(Value::from((1, 2)).to_string(), "1/2");
        assert_eq!(Value::nan().to_string(), "NaN");
    }

    #[test]
    fn ordering_ignores_nan() {
        assert_eq!(Value::from((1, 2)).partial_cmp(&Value::from((2, 4))), Some(Ordering::Equal));
        assert_eq!(Value::nan().partial_cmp(&Value::from(1i64)), None);
    }
}
