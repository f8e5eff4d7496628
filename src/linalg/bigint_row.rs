//! Row/vector operations over arbitrary-precision integers: inner product,
//! scale-down-by-gcd, normalize, first-nonzero index. The tableau keeps
//! its coefficient rows as plain `Vec<BigInt>`, so these are free
//! functions over slices rather than methods on a generic matrix type,
//! since an operator-overload arithmetic container would need `T: Copy`, which
//! `BigInt` cannot satisfy.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

/// Greatest common divisor of every entry in `row`, `0` for an all-zero row.
pub fn gcd_of(row: &[BigInt]) -> BigInt {
    let mut g = BigInt::zero();
    for v in row {
        g = g.gcd(v);
    }
    g
}

/// Divides every entry of `row` by the gcd of the whole vector. No-op on
/// an all-zero row or one already in lowest terms.
pub fn scale_down_by_gcd(row: &mut [BigInt]) {
    let g = gcd_of(row);
    if g.is_zero() || g.is_one() {
        return;
    }
    for v in row.iter_mut() {
        *v /= &g;
    }
}

/// Index of the first nonzero entry of `row`, or `None` if it is all zero.
pub fn first_nonzero(row: &[BigInt]) -> Option<usize> {
    row.iter().position(|v| !v.is_zero())
}

/// `sum(a[i] * b[i])` over the common length of `a` and `b`.
pub fn inner_product(a: &[BigInt], b: &[BigInt]) -> BigInt {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Canonicalizes a tableau row's `(denom, numerators...)` pair: divides out
/// the gcd of the whole row (denom included) and flips every sign if the
/// denominator came out negative, restoring `d > 0`.
pub fn canonicalize_row(row: &mut [BigInt]) {
    scale_down_by_gcd(row);
    if row[0].is_negative() {
        for v in row.iter_mut() {
            *v = -v.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(vals: &[i64]) -> Vec<BigInt> {
        vals.iter().map(|&x| BigInt::from(x)).collect()
    }

    #[test]
    fn scale_down_by_gcd_reduces_to_lowest_terms() {
        let mut row = v(&[4, 6, -2]);
        scale_down_by_gcd(&mut row);
        assert_eq!(row, v(&[2, 3, -1]));
    }

    #[test]
    fn first_nonzero_finds_leading_index() {
        assert_eq!(first_nonzero(&v(&[0, 0, 5, 1])), Some(2));
        assert_eq!(first_nonzero(&v(&[0, 0])), None);
    }

    #[test]
    fn inner_product_is_dot_product() {
        assert_eq!(inner_product(&v(&[1, 2, 3]), &v(&[4, 5, 6])), BigInt::from(32));
    }

    #[test]
    fn canonicalize_row_flips_negative_denominator() {
        let mut row = v(&[-2, 4]);
        canonicalize_row(&mut row);
        assert_eq!(row, v(&[2, -4]));
    }
}
