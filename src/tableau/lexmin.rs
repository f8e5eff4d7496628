//! Lexicographic pivoting: drive the main tableau to its lex-smallest
//! feasible vertex, and the two ways of adding an equality.

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

use crate::error::PilpResult;

use super::{Loc, RowSign, Tableau, VarRef};

impl Tableau {
    /// A column is a "context variable" column if its owner is a parameter
    /// or a context-div; those are never eligible lex-pivot targets.
    fn col_is_context(&self, j: usize) -> bool {
        match self.col_owner[j] {
            VarRef::Var(i) => i < self.n_param || i >= self.n_param + self.n_pvar,
            VarRef::Con(_) => false,
        }
    }

    fn coeff_of_var_at(&self, v: usize, col: usize) -> BigInt {
        let off = self.off();
        match self.vars[v].loc {
            Loc::Col(cv) => {
                if cv == col {
                    BigInt::one()
                } else {
                    BigInt::zero()
                }
            }
            Loc::Row(rv) => self.rows[rv][off + col].clone(),
        }
    }

    /// True if `c1` is lexicographically preferred over `c2` as the pivot
    /// column for row `r`.
    fn col_beats(&self, row: usize, c1: usize, c2: usize) -> bool {
        let off = self.off();
        let m_r_c1 = self.rows[row][off + c1].clone();
        let m_r_c2 = self.rows[row][off + c2].clone();
        for v in self.n_param..(self.n_param + self.n_pvar) {
            let a1 = self.coeff_of_var_at(v, c1);
            let a2 = self.coeff_of_var_at(v, c2);
            let lhs = &a2 * &m_r_c1;
            let rhs = &a1 * &m_r_c2;
            if lhs != rhs {
                return lhs > rhs;
            }
        }
        false
    }

    pub fn lex_pivot_col(&self, row: usize) -> Option<usize> {
        let off = self.off();
        let mut candidates = (self.n_dead..self.n_col()).filter(|&j| !self.col_is_context(j) && self.rows[row][off + j] > BigInt::zero());
        let mut best = candidates.next()?;
        for cand in candidates {
            if self.col_beats(row, cand, best) {
                best = cand;
            }
        }
        Some(best)
    }

    /// Heuristic sign of row `r`'s parametric constant decided purely from
    /// its own coefficients, without consulting the context.
    pub fn obvious_sign(&self, r: usize) -> Option<RowSign> {
        let m_coef = self.m_coef(r);
        if !m_coef.is_zero() {
            return Some(if super::bigm::is_obviously_nonneg(&self.rows[r][1], &m_coef) { RowSign::Pos } else { RowSign::Neg });
        }
        let off = self.off();
        let c0 = &self.rows[r][1];
        let mut consistent_pos = !c0.is_negative();
        let mut consistent_neg = !c0.is_positive();
        for (col, owner) in self.col_owner.iter().enumerate() {
            let VarRef::Var(i) = owner else { continue };
            if *i >= self.n_param {
                continue;
            }
            let coeff = &self.rows[r][off + col];
            if coeff.is_zero() {
                continue;
            }
            if !self.vars[*i].is_nonneg {
                consistent_pos = false;
                consistent_neg = false;
                continue;
            }
            if coeff.is_negative() {
                consistent_pos = false;
            }
            if coeff.is_positive() {
                consistent_neg = false;
            }
        }
        if consistent_pos {
            Some(RowSign::Pos)
        } else if consistent_neg {
            Some(RowSign::Neg)
        } else {
            None
        }
    }

    fn is_violated(&self, r: usize) -> bool {
        let owner = self.row_owner[r];
        if !self.record_of(owner).is_nonneg {
            return false;
        }
        if self.row_sign.get(r).copied() == Some(RowSign::Neg) {
            return true;
        }
        matches!(self.obvious_sign(r), Some(RowSign::Neg))
    }

    fn first_violated_row(&self) -> Option<usize> {
        if self.has_m {
            if let Some(r) = (self.n_redundant..self.n_row()).find(|&r| self.is_violated(r) && super::bigm::is_obviously_negative(&self.rows[r][1], &self.m_coef(r))) {
                return Some(r);
            }
        }
        (self.n_redundant..self.n_row()).find(|&r| self.is_violated(r))
    }

    /// Pivots the tableau to its lexicographically smallest feasible
    /// vertex, or marks it `empty` if no such vertex exists.
    pub fn restore_lexmin(&mut self) -> PilpResult<()> {
        loop {
            if self.empty {
                return Ok(());
            }
            let Some(r) = self.first_violated_row() else {
                self.sweep_redundant();
                return Ok(());
            };
            match self.lex_pivot_col(r) {
                Some(c) => self.pivot(r, c)?,
                None => {
                    self.empty = true;
                    return Ok(());
                }
            }
        }
    }

    fn kill_column(&mut self, col: usize) {
        if col != self.n_dead {
            self.swap_cols(self.n_dead, col);
        }
        let owner = self.col_owner[self.n_dead];
        self.record_of_mut(owner).frozen = true;
        self.n_dead += 1;
    }

    fn swap_cols(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        self.col_owner.swap(i, j);
        let off = self.off();
        for row in self.rows.iter_mut() {
            row.swap(off + i, off + j);
        }
        self.record_of_mut(self.col_owner[i]).loc = Loc::Col(i);
        self.record_of_mut(self.col_owner[j]).loc = Loc::Col(j);
    }

    /// Finds an alive column (`>= n_dead`) eligible to eliminate, preferring
    /// a problem-variable column, then a unit-coefficient parameter column.
    ///
    /// Among problem-variable candidates, picks the *highest*-indexed one
    /// (lowest lex priority), not just the first found: eliminating it
    /// leaves every earlier-indexed output variable as its own column, free
    /// to be driven to its true lex-min by the big-M bootstrap. Eliminating
    /// an earlier variable instead would express it in terms of a later
    /// one, and minimizing that later variable independently does not
    /// minimize the earlier one; it generally does the opposite.
    fn eliminable_column(&self, row: &[BigInt]) -> Option<usize> {
        let off = self.off();
        let problem_var_id = |owner: &VarRef| match owner {
            VarRef::Var(i) if *i >= self.n_param && *i < self.n_param + self.n_pvar => Some(*i),
            _ => None,
        };
        let best = (self.n_dead..self.n_col())
            .filter(|&c| !row[off + c].is_zero())
            .filter_map(|c| problem_var_id(&self.col_owner[c]).map(|v| (v, c)))
            .max_by_key(|&(v, _)| v);
        if let Some((_, col)) = best {
            return Some(col);
        }
        let unit_param = |owner: &VarRef, coeff: &BigInt| matches!(owner, VarRef::Var(i) if *i < self.n_param) && (coeff == &BigInt::one() || coeff == &-BigInt::one());
        (self.n_dead..self.n_col()).find(|&c| unit_param(&self.col_owner[c], &row[off + c]))
    }

    /// Adds an equality constraint. Eliminates a problem-variable or
    /// unit-coefficient parameter column where possible; otherwise splits
    /// into the two inequalities `e ≥ 0` and `−e ≥ 0`, re-running
    /// `restore_lexmin` after each. `checked` additionally guards
    /// against a materialized row that turns out to be a non-zero pure
    /// constant, in which case the tableau is marked empty instead of
    /// panicking (the "possibly-invalid equality" variant).
    ///
    /// Column kills performed here are not separately undo-journaled;
    /// `restore_lexmin`'s pivots are. Splits clone the whole tableau rather
    /// than relying on fine-grained rollback through an equality add.
    pub fn add_equality(&mut self, var_coeffs: &[BigInt], c0: &BigInt, d: &BigInt, m_coef: &BigInt, checked: bool) -> PilpResult<()> {
        let row = self.materialize(var_coeffs, c0, d, m_coef)?;
        let off = self.off();
        let is_pure_const = row[off..].iter().all(Zero::is_zero);
        if is_pure_const {
            let _ = checked; // both the "trusted" and "possibly-invalid" callers agree here: a
                              // nonzero pure constant makes the equality unsatisfiable.
            if !row[1].is_zero() || (self.has_m && !row[2].is_zero()) {
                self.empty = true;
            }
            return Ok(());
        }
        if let Some(col) = self.eliminable_column(&row) {
            let con_id = self.add_materialized_equality(row);
            let row_idx = self.record_of(VarRef::Con(con_id)).loc;
            let Loc::Row(r) = row_idx else { unreachable!() };
            self.pivot(r, col)?;
            self.kill_column(col);
            return Ok(());
        }
        // Pure parameter equality with no unit coefficient: split into two
        // inequalities.
        let neg_coeffs: Vec<BigInt> = var_coeffs.iter().map(|v| -v).collect();
        let neg_c0 = -c0.clone();
        let neg_m = -m_coef.clone();
        self.add_inequality(var_coeffs, c0, d, m_coef)?;
        self.restore_lexmin()?;
        if self.empty {
            return Ok(());
        }
        self.add_inequality(&neg_coeffs, &neg_c0, d, &neg_m)?;
        self.restore_lexmin()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i(v: i64) -> BigInt {
        BigInt::from(v)
    }

    #[test]
    fn restore_lexmin_finds_zero_vertex_for_nonneg_variable() {
        let mut t = Tableau::new(0, 1, false, false, false, &[true]);
        t.add_inequality(&[i(1)], &i(0), &i(1), &i(0)).unwrap();
        t.restore_lexmin().unwrap();
        assert!(!t.empty);
    }

    #[test]
    fn restore_lexmin_marks_empty_when_infeasible() {
        let mut t = Tableau::new(0, 1, false, false, false, &[true]);
        // x >= 0 and -x - 1 >= 0 (x <= -1): jointly infeasible.
        t.add_inequality(&[i(1)], &i(0), &i(1), &i(0)).unwrap();
        t.add_inequality(&[i(-1)], &i(-1), &i(1), &i(0)).unwrap();
        t.restore_lexmin().unwrap();
        assert!(t.empty);
    }

    #[test]
    fn add_equality_eliminates_a_problem_variable() {
        let mut t = Tableau::new(0, 2, false, false, false, &[true, true]);
        // x - y = 0
        t.add_equality(&[i(1), i(-1)], &i(0), &i(1), &i(0), false).unwrap();
        assert!(!t.empty);
        assert_eq!(t.n_dead, 1);
    }
}
