//! Pivot, row materialization and redundancy detection.

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::error::{PilpError, PilpResult};

use super::{Loc, RowSign, Tableau, UndoEntry, VarRef};

/// A row split into its three rational parts: constant, big-M coefficient
/// (zero when the tableau has no M column), and one entry per live column.
struct RationalRow {
    c0: BigRational,
    m: BigRational,
    cols: Vec<BigRational>,
}

impl Tableau {
    fn row_to_rational(&self, r: usize) -> RationalRow {
        let off = self.off();
        let row = &self.rows[r];
        let d = row[0].clone();
        let c0 = BigRational::new(row[1].clone(), d.clone());
        let m = if self.has_m { BigRational::new(row[2].clone(), d.clone()) } else { BigRational::zero() };
        let cols = (0..self.n_col()).map(|c| BigRational::new(row[off + c].clone(), d.clone())).collect();
        RationalRow { c0, m, cols }
    }

    /// Converts an accumulated rational row back to the canonical integer
    /// form: a common positive denominator and integer numerators with
    /// `gcd(d, numerators) = 1`.
    fn rational_row_to_row(&self, r: &RationalRow) -> Vec<BigInt> {
        let off = self.off();
        let mut denom = BigInt::one();
        for v in std::iter::once(&r.c0).chain(std::iter::once(&r.m)).chain(r.cols.iter()) {
            denom = denom.lcm(v.denom());
        }
        let mut out = vec![BigInt::zero(); off + self.n_col()];
        out[0] = denom.clone();
        out[1] = (&r.c0 * &denom).to_integer();
        if self.has_m {
            out[2] = (&r.m * &denom).to_integer();
        }
        for (c, v) in r.cols.iter().enumerate() {
            out[off + c] = (v * &denom).to_integer();
        }
        crate::linalg::bigint_row::canonicalize_row(&mut out);
        out
    }

    /// Materializes a constraint given over the tracked variables (indices
    /// `0..n_var`, i.e. params, problem vars, context-divs in that order)
    /// into the current column basis, substituting the row expression of
    /// every variable that is currently basic.
    pub fn materialize(&self, var_coeffs: &[BigInt], c0: &BigInt, d: &BigInt, m_coef: &BigInt) -> PilpResult<Vec<BigInt>> {
        if d.is_zero() {
            return Err(PilpError::InvalidInput("zero denominator in constraint".into()));
        }
        let sign = if d.is_negative() { -BigInt::one() } else { BigInt::one() };
        let d = d.abs();
        let mut acc = RationalRow {
            c0: BigRational::new(&sign * c0, d.clone()),
            m: BigRational::new(&sign * m_coef, d.clone()),
            cols: vec![BigRational::zero(); self.n_col()],
        };
        for (i, coeff) in var_coeffs.iter().enumerate() {
            if coeff.is_zero() {
                continue;
            }
            if i >= self.vars.len() {
                return Err(PilpError::InvalidInput("coefficient for untracked variable".into()));
            }
            let contrib = BigRational::new(&sign * coeff, d.clone());
            match self.vars[i].loc {
                Loc::Col(c) => acc.cols[c] += &contrib,
                Loc::Row(r) => {
                    let basic = self.row_to_rational(r);
                    acc.c0 += &contrib * &basic.c0;
                    acc.m += &contrib * &basic.m;
                    for (k, v) in basic.cols.iter().enumerate() {
                        acc.cols[k] += &contrib * v;
                    }
                }
            }
        }
        Ok(self.rational_row_to_row(&acc))
    }

    /// Allocates a new row for `new_row` and a tracking "con" variable for
    /// it, returning the con id. `is_nonneg` is `true` for an inequality
    /// slot, `false` for an equality (no sign constraint on the slot).
    fn push_row(&mut self, new_row: Vec<BigInt>, is_nonneg: bool) -> usize {
        let row_idx = self.n_row();
        self.rows.push(new_row);
        let con_id = self.cons.len();
        self.cons.push(super::VarRecord { loc: Loc::Row(row_idx), is_nonneg, frozen: false });
        self.journal.push(UndoEntry::AllocCon);
        self.row_owner.push(VarRef::Con(con_id));
        self.row_sign.push(RowSign::Unknown);
        con_id
    }

    /// Adds an inequality `(c0 + sum var_coeffs·vars)/d + m_coef·M ≥ 0` as a
    /// new row, returning its con id. Does not attempt elimination; that
    /// belongs to equality handling (`add_equality_row` in `lexmin`).
    pub fn add_inequality(&mut self, var_coeffs: &[BigInt], c0: &BigInt, d: &BigInt, m_coef: &BigInt) -> PilpResult<usize> {
        let row = self.materialize(var_coeffs, c0, d, m_coef)?;
        Ok(self.push_row(row, true))
    }

    /// Adds an already-materialized row (in current-column form) directly,
    /// used by the cut engine which builds rows from existing tableau
    /// state rather than from tracked-variable coefficients.
    pub fn add_materialized_inequality(&mut self, row: Vec<BigInt>) -> usize {
        self.push_row(row, true)
    }

    pub fn add_materialized_equality(&mut self, row: Vec<BigInt>) -> usize {
        self.push_row(row, false)
    }

    /// Appends a fresh context-div variable as a new non-basic column,
    /// returning its var id.
    pub fn add_div_var(&mut self) -> usize {
        let col = self.n_col();
        for row in self.rows.iter_mut() {
            row.push(BigInt::zero());
        }
        let id = self.vars.len();
        self.col_owner.push(VarRef::Var(id));
        self.vars.push(super::VarRecord::column(col, false));
        self.n_div += 1;
        self.journal.push(UndoEntry::AllocVar { is_con: false });
        id
    }

    /// The var id of the `k`-th context-div (0-indexed in introduction
    /// order), valid for both main and context tableaux since divs are
    /// always appended to both in lockstep.
    pub fn div_var(&self, k: usize) -> usize {
        self.n_param + self.n_pvar + k
    }

    /// Row `r` is identically zero after reduction.
    pub fn row_is_zero(&self, r: usize) -> bool {
        self.rows[r][1..].iter().all(Zero::is_zero)
    }

    pub fn mark_redundant(&mut self, r: usize) {
        if r >= self.n_redundant {
            self.swap_rows(self.n_redundant, r);
            self.journal.push(UndoEntry::MarkRedundant { row: self.n_redundant });
            self.n_redundant += 1;
        }
    }

    /// Marks every live row that reduced to identically zero as redundant:
    /// it holds no information, can never be violated and never needs a
    /// cut. Run after each `restore_lexmin` settle, since a pivot is the
    /// only thing that can zero out a row that wasn't already.
    pub fn sweep_redundant(&mut self) {
        let mut r = self.n_redundant;
        while r < self.n_row() {
            if self.row_is_zero(r) {
                self.mark_redundant(r);
            }
            r += 1;
        }
    }

    fn swap_rows(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        self.rows.swap(i, j);
        self.row_owner.swap(i, j);
        self.row_sign.swap(i, j);
        retarget(self, self.row_owner[i], i);
        retarget(self, self.row_owner[j], j);
    }

    /// The classical dense simplex pivot: the basic variable of row `r`
    /// exchanges places with the non-basic variable of column `c`.
    pub fn pivot(&mut self, r: usize, c: usize) -> PilpResult<()> {
        let off = self.off();
        if self.rows[r][off + c].is_zero() {
            return Err(PilpError::InternalInvariant(format!("pivot on zero element at ({r},{c})")));
        }
        let old_rows = self.rows.clone();
        let old_row_owner = self.row_owner[r];
        let old_col_owner = self.col_owner[c];

        let pivot_rat = self.row_to_rational(r);
        let pivot_val = pivot_rat.cols[c].clone();
        debug_assert!(!pivot_val.is_zero());

        // Row r solved for the entering variable (the one that was non-basic
        // in column c): `basic_r = c0 + m*M + sum a_j*col_j` rearranges to
        // `col_c = -c0/a_c - (m/a_c)*M - sum_{j!=c} (a_j/a_c)*col_j + (1/a_c)*basic_r`,
        // where `basic_r` (the vacated row owner) now occupies column c.
        let mut new_r = RationalRow {
            c0: -(&pivot_rat.c0 / &pivot_val),
            m: -(&pivot_rat.m / &pivot_val),
            cols: pivot_rat.cols.iter().map(|v| -(v / &pivot_val)).collect(),
        };
        new_r.cols[c] = BigRational::new(BigInt::one(), BigInt::one()) / &pivot_val;

        let mut new_rows_rat: Vec<RationalRow> = Vec::with_capacity(self.n_row());
        for i in 0..self.n_row() {
            if i == r {
                continue;
            }
            let row_i = self.row_to_rational(i);
            let factor = row_i.cols[c].clone();
            if factor.is_zero() {
                new_rows_rat.push(row_i);
                continue;
            }
            // row_i's old column-c entry (== factor) is entirely superseded
            // by substituting col_c = new_r; it must not also survive as a
            // leftover additive term.
            let combined = RationalRow {
                c0: &row_i.c0 + &factor * &new_r.c0,
                m: &row_i.m + &factor * &new_r.m,
                cols: row_i
                    .cols
                    .iter()
                    .zip(new_r.cols.iter())
                    .enumerate()
                    .map(|(j, (a, b))| if j == c { &factor * b } else { a + &factor * b })
                    .collect(),
            };
            new_rows_rat.push(combined);
        }

        let mut canon = Vec::with_capacity(self.n_row());
        let mut it = new_rows_rat.into_iter();
        for i in 0..self.n_row() {
            let rat = if i == r { &new_r } else { it.next().as_ref().unwrap() };
            canon.push(self.rational_row_to_row(rat));
        }
        self.rows = canon;

        let old_row_var = self.var_record_of(old_row_owner);
        let old_col_var = self.var_record_of(old_col_owner);
        self.row_owner[r] = old_col_owner;
        self.col_owner[c] = old_row_owner;
        *self.record_of_mut(old_col_owner) = super::VarRecord { loc: Loc::Row(r), ..old_col_var };
        *self.record_of_mut(old_row_owner) = super::VarRecord { loc: Loc::Col(c), ..old_row_var };

        self.journal.push(UndoEntry::PivotRowCol {
            row: r,
            col: c,
            old_rows,
            old_row_owner,
            old_col_owner,
            old_row_var,
            old_col_var,
        });
        Ok(())
    }

    fn var_record_of(&self, which: VarRef) -> super::VarRecord {
        *self.record_of(which)
    }
}

fn retarget(t: &mut Tableau, owner: VarRef, row: usize) {
    t.record_of_mut(owner).loc = Loc::Row(row);
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn i(v: i64) -> BigInt {
        BigInt::from(v)
    }

    #[test]
    fn add_inequality_on_fresh_tableau_is_identity_substitution() {
        // x >= 0, with a single problem variable x (no params).
        let mut t = Tableau::new(0, 1, false, false, false, &[true]);
        let con = t.add_inequality(&[i(1)], &i(0), &i(1), &i(0)).unwrap();
        assert_eq!(t.n_row(), 1);
        assert_eq!(t.rows[0][0], i(1)); // d
        assert_eq!(t.rows[0][1], i(0)); // c0
        assert!(t.cons[con].is_nonneg);
    }

    #[test]
    fn pivot_exchanges_row_and_column_owners() {
        let mut t = Tableau::new(0, 1, false, false, false, &[true]);
        // row: x - 5 >= 0  i.e. con = x - 5, so x is column 0 with coeff 1.
        t.add_inequality(&[i(1)], &i(-5), &i(1), &i(0)).unwrap();
        assert!(matches!(t.vars[0].loc, Loc::Col(0)));
        t.pivot(0, 0).unwrap();
        assert!(matches!(t.vars[0].loc, Loc::Row(0)));
        // x = 5 now (the con variable moved to column 0).
        assert_eq!(t.rows[0][1], i(5));
        assert_eq!(t.rows[0][0], i(1));
    }
}
