//! Symbolic big-M column helpers. `M` is treated as a value larger than
//! any concrete integer, so a value pair `(non_m_part, m_coef)` orders
//! with `m_coef` dominant: any positive `m_coef` outranks every finite
//! `non_m_part`.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::Zero;

/// Compares `a = a_non_m/d_a + a_m*M` against `b = b_non_m/d_b + b_m*M`,
/// both over positive denominators, `M` dominant.
pub fn cmp_with_m(a_non_m: &BigInt, d_a: &BigInt, a_m: &BigInt, b_non_m: &BigInt, d_b: &BigInt, b_m: &BigInt) -> Ordering {
    let m_cmp = (a_m * d_b).cmp(&(b_m * d_a));
    if m_cmp != Ordering::Equal {
        return m_cmp;
    }
    (a_non_m * d_b).cmp(&(b_non_m * d_a))
}

/// True if a constant (`non_m`, `d`, `m_coef`) is obviously negative: the
/// big-M coefficient is negative, or it is zero and the rational part is
/// negative.
pub fn is_obviously_negative(non_m: &BigInt, m_coef: &BigInt) -> bool {
    if !m_coef.is_zero() {
        return m_coef < &BigInt::zero();
    }
    non_m < &BigInt::zero()
}

pub fn is_obviously_nonneg(non_m: &BigInt, m_coef: &BigInt) -> bool {
    if !m_coef.is_zero() {
        return m_coef > &BigInt::zero();
    }
    non_m >= &BigInt::zero()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn m_coefficient_dominates_ordering() {
        let one = BigInt::from(1);
        let big_non_m = BigInt::from(1_000_000);
        let ord = cmp_with_m(&big_non_m, &one, &BigInt::zero(), &BigInt::from(-1), &one, &BigInt::from(1));
        assert_eq!(ord, Ordering::Less);
    }

    #[test]
    fn zero_m_falls_back_to_rational_part() {
        let one = BigInt::from(1);
        let ord = cmp_with_m(&BigInt::from(2), &one, &BigInt::zero(), &BigInt::from(3), &one, &BigInt::zero());
        assert_eq!(ord, Ordering::Less);
    }
}
