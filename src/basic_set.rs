//! Basic-set / basic-map containers with `(n_eq, n_ineq, n_div)`
//! bookkeeping, append, swap-divs, Gaussian reduction, normalization,
//! finalization, copy, dimension extension, emptiness, and div-equality
//! detection.
//!
//! The narrowest implementation the core actually needs, not a general
//! polyhedral library. Every row is `[c0, a_1 .. a_n]` over the region's
//! `1 + n_param + n_div` dimensions, read as `c0 + sum(a_i * y_i) {=,>=} 0`.

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use std::fmt;

/// An integer division `q = floor((c0 + sum a_i y_i) / denom)` introduced
/// into a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Div {
    pub coeffs: Vec<BigInt>,
    pub denom: BigInt,
}

impl Div {
    pub fn new(coeffs: Vec<BigInt>, denom: BigInt) -> Self {
        debug_assert!(denom.is_positive());
        Self { coeffs, denom }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BasicSet {
    pub n_param: usize,
    pub divs: Vec<Div>,
    pub eqs: Vec<Vec<BigInt>>,
    pub ineqs: Vec<Vec<BigInt>>,
}

fn normalize_row(row: &mut [BigInt]) {
    crate::linalg::bigint_row::scale_down_by_gcd(row);
}

impl BasicSet {
    pub fn new(n_param: usize) -> Self {
        Self { n_param, divs: Vec::new(), eqs: Vec::new(), ineqs: Vec::new() }
    }

    /// Width of every constraint/div-coefficient row: constant + params + divs.
    pub fn width(&self) -> usize {
        1 + self.n_param + self.divs.len()
    }

    pub fn add_eq(&mut self, mut row: Vec<BigInt>) {
        debug_assert_eq!(row.len(), self.width());
        normalize_row(&mut row);
        self.eqs.push(row);
    }

    pub fn add_ineq(&mut self, mut row: Vec<BigInt>) {
        debug_assert_eq!(row.len(), self.width());
        normalize_row(&mut row);
        self.ineqs.push(row);
    }

    /// Appends a new division, extending every existing row with a zero
    /// coefficient in the new slot, and returns the new div's index.
    pub fn add_div(&mut self, div: Div) -> usize {
        for row in self.eqs.iter_mut().chain(self.ineqs.iter_mut()) {
            row.push(BigInt::zero());
        }
        for d in self.divs.iter_mut() {
            d.coeffs.push(BigInt::zero());
        }
        self.divs.push(div);
        self.divs.len() - 1
    }

    pub fn swap_divs(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        self.divs.swap(i, j);
        let col = |k: usize| 1 + self.n_param + k;
        for row in self.eqs.iter_mut().chain(self.ineqs.iter_mut()) {
            row.swap(col(i), col(j));
        }
        for d in self.divs.iter_mut() {
            d.coeffs.swap(col(i).saturating_sub(1), col(j).saturating_sub(1));
        }
    }

    /// Finds an existing div with identical defining coefficients and
    /// denominator.
    pub fn find_div(&self, div: &Div) -> Option<usize> {
        self.divs.iter().position(|d| d == div)
    }

    /// Divides every row by the gcd of its entries. Does not attempt
    /// dimension-reducing Gaussian elimination on the equalities; that
    /// step belongs to the finalizer applied when a piece is emitted.
    pub fn normalize(&mut self) {
        for row in self.eqs.iter_mut().chain(self.ineqs.iter_mut()) {
            normalize_row(row);
        }
    }

    /// Cheap, partial Gaussian reduction: uses any equality with a unit
    /// coefficient on a param/div to substitute that dimension out of every
    /// other row, shrinking the live constraint set. Leaves the dimension
    /// count unchanged.
    pub fn gaussian_reduce(&mut self) {
        let mut i = 0;
        while i < self.eqs.len() {
            let w = self.width();
            let pivot_col = (1..w).find(|&c| self.eqs[i][c] == BigInt::one() || self.eqs[i][c] == -BigInt::one());
            let Some(c) = pivot_col else {
                i += 1;
                continue;
            };
            let sign = if self.eqs[i][c] == BigInt::one() { BigInt::one() } else { -BigInt::one() };
            let pivot_row = self.eqs[i].clone();
            for (idx, row) in self.eqs.iter_mut().enumerate().chain(self.ineqs.iter_mut().enumerate().map(|(j, r)| (j + usize::MAX / 2, r))) {
                if idx == i {
                    continue;
                }
                let factor = &row[c] * &sign;
                if factor.is_zero() {
                    continue;
                }
                for k in 0..w {
                    row[k] -= &factor * &pivot_row[k];
                }
            }
            i += 1;
        }
        self.normalize();
    }

    /// Finalization pass applied right before a piece is emitted: normalize,
    /// reduce, and drop exact duplicate rows.
    pub fn finalize(&mut self) {
        self.gaussian_reduce();
        dedup_rows(&mut self.eqs);
        dedup_rows(&mut self.ineqs);
    }

    /// Structural emptiness check: true if any row is a manifestly violated
    /// pure constant. This is a cheap necessary condition, not sufficient;
    /// exact feasibility is decided by `context_is_feasible` driving a
    /// tableau, which is the actual authority the core relies on.
    pub fn is_structurally_empty(&self) -> bool {
        let is_pure_negative_const =
            |row: &Vec<BigInt>| row[1..].iter().all(Zero::is_zero) && row[0].is_negative();
        let is_pure_nonzero_const =
            |row: &Vec<BigInt>| row[1..].iter().all(Zero::is_zero) && !row[0].is_zero();
        self.ineqs.iter().any(is_pure_negative_const) || self.eqs.iter().any(is_pure_nonzero_const)
    }

    pub fn extend_params(&mut self, extra: usize) {
        let insert_at = 1 + self.n_param;
        for row in self.eqs.iter_mut().chain(self.ineqs.iter_mut()) {
            for _ in 0..extra {
                row.insert(insert_at, BigInt::zero());
            }
        }
        self.n_param += extra;
    }
}

fn dedup_rows(rows: &mut Vec<Vec<BigInt>>) {
    let mut seen: Vec<Vec<BigInt>> = Vec::new();
    rows.retain(|r| {
        if seen.contains(r) {
            false
        } else {
            seen.push(r.clone());
            true
        }
    });
}

impl fmt::Display for BasicSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        let mut first = true;
        for row in &self.eqs {
            if !first {
                write!(f, " and ")?;
            }
            write!(f, "{} = 0", fmt_row(row))?;
            first = false;
        }
        for row in &self.ineqs {
            if !first {
                write!(f, " and ")?;
            }
            write!(f, "{} >= 0", fmt_row(row))?;
            first = false;
        }
        if first {
            write!(f, "true")?;
        }
        write!(f, " }}")
    }
}

fn fmt_row(row: &[BigInt]) -> String {
    let mut parts = Vec::new();
    if !row[0].is_zero() {
        parts.push(row[0].to_string());
    }
    for (i, c) in row[1..].iter().enumerate() {
        if c.is_zero() {
            continue;
        }
        parts.push(format!("{}*y{}", c, i));
    }
    if parts.is_empty() {
        "0".to_string()
    } else {
        parts.join(" + ")
    }
}

/// An affine piece of an emitted solution: a basic-map whose domain is a
/// region of parameter (+ context-div) space and whose output columns are
/// affine expressions over the same space.
#[derive(Debug, Clone)]
pub struct BasicMap {
    pub domain: BasicSet,
    /// One row per output variable: `(denom, c0, coeffs over params+divs)`,
    /// meaning `denom * x_i = c0 + sum(coeffs_i * y_i)`.
    pub out: Vec<(BigInt, Vec<BigInt>)>,
}

impl BasicMap {
    pub fn new(domain: BasicSet, n_out: usize) -> Self {
        Self { domain, out: Vec::with_capacity(n_out) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(vals: &[i64]) -> Vec<BigInt> {
        vals.iter().map(|&v| BigInt::from(v)).collect()
    }

    #[test]
    fn normalize_divides_by_gcd() {
        let mut bs = BasicSet::new(1);
        bs.add_ineq(row(&[4, 6])); // 4 + 6p >= 0 -> 2 + 3p >= 0
        assert_eq!(bs.ineqs[0], row(&[2, 3]));
    }

    #[test]
    fn add_div_extends_existing_rows() {
        let mut bs = BasicSet::new(1);
        bs.add_ineq(row(&[1, 1]));
        let idx = bs.add_div(Div::new(row(&[0, 1]), BigInt::from(2)));
        assert_eq!(idx, 0);
        assert_eq!(bs.ineqs[0].len(), 3);
        assert_eq!(bs.ineqs[0][2], BigInt::zero());
    }

    #[test]
    fn structural_emptiness_catches_negative_constant() {
        let mut bs = BasicSet::new(0);
        bs.add_ineq(row(&[-1]));
        assert!(bs.is_structurally_empty());
    }

    #[test]
    fn find_div_matches_identical_definition() {
        let mut bs = BasicSet::new(1);
        let d = Div::new(row(&[0, 1]), BigInt::from(2));
        bs.add_div(d.clone());
        assert_eq!(bs.find_div(&d), Some(0));
        assert_eq!(bs.find_div(&Div::new(row(&[1, 1]), BigInt::from(2))), None);
    }
}
