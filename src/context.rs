//! Context manager: a tableau over parameters and context-divs plus a
//! `BasicSet` shadow, used to validate, split and enumerate parameter
//! regions, and to maintain integer samples for the row-sign heuristic.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, Zero};

use crate::cuts;
use crate::error::PilpResult;
use crate::tableau::{RowSign, Snapshot, Tableau, UndoEntry};

pub struct Context {
    /// A tableau whose "problem variables" (in the `Tableau` sense) are the
    /// overall problem's parameters; its own `n_param` is always zero since
    /// nothing sits above a context. Divs are appended after the params.
    pub tableau: Tableau,
}

impl Context {
    pub fn new(n_param: usize, param_nonneg: &[bool]) -> Self {
        Self { tableau: Tableau::new(0, n_param, false, false, true, param_nonneg) }
    }

    pub fn n_param(&self) -> usize {
        self.tableau.n_pvar
    }

    pub fn n_div(&self) -> usize {
        self.tableau.n_div
    }

    pub fn snap(&self) -> Snapshot {
        self.tableau.snap()
    }

    pub fn rollback(&mut self, tok: Snapshot) {
        self.tableau.rollback(tok)
    }

    /// Adds `c0 + sum(coeffs·y) ≥ 0` (over params + divs) to both the
    /// context tableau and its `bset` shadow, dropping violated samples.
    pub fn add_ineq(&mut self, coeffs: &[BigInt], c0: &BigInt) -> PilpResult<()> {
        self.push_bset_row(coeffs, c0, false);
        self.drop_violating_samples(coeffs, c0, false);
        self.tableau.add_inequality(coeffs, c0, &BigInt::from(1), &BigInt::zero())?;
        self.tableau.restore_lexmin()
    }

    /// Adds `c0 + sum(coeffs·y) = 0` to both the context tableau and its
    /// `bset` shadow.
    pub fn add_eq(&mut self, coeffs: &[BigInt], c0: &BigInt) -> PilpResult<()> {
        self.push_bset_row(coeffs, c0, true);
        self.drop_violating_samples(coeffs, c0, true);
        self.tableau.add_equality(coeffs, c0, &BigInt::from(1), &BigInt::zero(), true)
    }

    fn push_bset_row(&mut self, coeffs: &[BigInt], c0: &BigInt, is_eq: bool) {
        if let Some(bset) = &mut self.tableau.bset {
            let mut row = Vec::with_capacity(1 + coeffs.len());
            row.push(c0.clone());
            row.extend_from_slice(coeffs);
            if is_eq {
                bset.add_eq(row);
                self.tableau.journal.push(UndoEntry::AddBsetEq);
            } else {
                bset.add_ineq(row);
                self.tableau.journal.push(UndoEntry::AddBsetIneq);
            }
        }
    }

    fn drop_violating_samples(&mut self, coeffs: &[BigInt], c0: &BigInt, is_eq: bool) {
        let mut i = self.tableau.n_outside;
        while i < self.tableau.samples.len() {
            let value = eval_sample(&self.tableau.samples[i], coeffs, c0);
            let violates = if is_eq { !value.is_zero() } else { value.is_negative() };
            if violates {
                let row = self.tableau.samples.remove(i);
                self.tableau.samples.insert(self.tableau.n_outside, row.clone());
                self.tableau.n_outside += 1;
                self.tableau.journal.push(UndoEntry::DropSample { row });
            } else {
                i += 1;
            }
        }
    }
}

fn eval_sample(sample: &[BigInt], coeffs: &[BigInt], c0: &BigInt) -> BigInt {
    let mut acc = c0.clone();
    for (a, s) in coeffs.iter().zip(sample.iter()) {
        acc += a * s;
    }
    acc
}

/// True if no coefficient on a problem-variable column exists for `row`.
fn no_pivot_column(main: &Tableau, row: usize) -> bool {
    main.lex_pivot_col(row).is_none()
}

/// True if the inequality is integrally "loose": the gcd of its parameter
/// and div coefficients divides the constant, so no integer point sits
/// strictly between `0` and the next attainable value. A pure constant row
/// (no coefficients at all) is trivially loose.
fn is_integer_loose(ineq: &[BigInt]) -> bool {
    let mut g = BigInt::zero();
    for c in &ineq[1..] {
        g = g.gcd(c);
    }
    if g.is_zero() {
        return true;
    }
    (&ineq[0] % &g).is_zero()
}

/// Classifies row `r` of the main tableau as `pos`/`neg`/`any` over the
/// current context. Caches the result in `main.row_sign[r]`.
pub fn row_sign(main: &mut Tableau, ctx: &mut Context, row: usize) -> PilpResult<RowSign> {
    if let Some(cached) = main.row_sign.get(row).copied() {
        if cached != RowSign::Unknown {
            return Ok(cached);
        }
    }
    if let Some(RowSign::Pos) = main.obvious_sign(row) {
        main.row_sign[row] = RowSign::Pos;
        return Ok(RowSign::Pos);
    }

    let ineq = main.parametric_constant(row);
    let m_coef = main.m_coef(row);
    for other in 0..main.n_row() {
        if other == row {
            continue;
        }
        let known = main.row_sign[other];
        if known == RowSign::Unknown {
            continue;
        }
        if main.parametric_constant(other) == ineq && main.m_coef(other) == m_coef {
            main.row_sign[row] = known;
            return Ok(known);
        }
    }

    let critical = no_pivot_column(main, row) || !is_integer_loose(&ineq);
    let (mut saw_pos, mut saw_neg) = (false, false);
    let n_outside = ctx.tableau.n_outside;
    for sample in &ctx.tableau.samples[n_outside..] {
        let value = eval_sample(sample, &ineq[1..], &ineq[0]);
        if value.is_zero() {
            if critical {
                saw_pos = true;
            } else {
                // zero stays ambiguous: it is consistent with either branch.
            }
        } else if value.is_positive() {
            saw_pos = true;
        } else {
            saw_neg = true;
        }
    }
    let mut guess = match (saw_pos, saw_neg) {
        (false, false) => RowSign::Unknown,
        (true, false) => RowSign::Pos,
        (false, true) => RowSign::Neg,
        (true, true) => RowSign::Any,
    };

    if matches!(guess, RowSign::Unknown | RowSign::Pos) {
        let neg_coeffs: Vec<BigInt> = ineq[1..].iter().map(|v| -v).collect();
        let neg_c0 = -&ineq[0] - BigInt::from(1);
        let snap = ctx.snap();
        ctx.add_ineq(&neg_coeffs, &neg_c0)?;
        let feasible = context_is_feasible(ctx)?;
        ctx.rollback(snap);
        guess = if !feasible {
            RowSign::Pos
        } else if guess == RowSign::Unknown {
            RowSign::Neg
        } else {
            RowSign::Any
        };
    }
    if guess == RowSign::Neg {
        let c0_for_test = if critical { &ineq[0] - BigInt::from(1) } else { ineq[0].clone() };
        let snap = ctx.snap();
        ctx.add_ineq(&ineq[1..], &c0_for_test)?;
        let feasible = context_is_feasible(ctx)?;
        ctx.rollback(snap);
        if feasible {
            guess = RowSign::Any;
        }
    }

    main.row_sign[row] = guess;
    Ok(guess)
}

/// Snapshots the context, closes it to an integer lex-min point, records
/// the point as a new sample if one exists, and rolls the tableau mutation
/// back (the sample itself survives the rollback).
pub fn context_is_feasible(ctx: &mut Context) -> PilpResult<bool> {
    let snap = ctx.snap();
    let sample = cuts::cut_to_integer_lexmin(&mut ctx.tableau)?;
    let feasible = sample.is_some();
    ctx.rollback(snap);
    if let Some(sample) = sample {
        ctx.tableau.samples.push(sample);
    }
    Ok(feasible)
}

/// Picks the split row that renders the most other `any`-classified
/// candidates non-`any` once added to the context, tie-breaking on the
/// earliest candidate.
pub fn best_split(main: &mut Tableau, ctx: &mut Context, candidates: &[usize]) -> PilpResult<usize> {
    debug_assert!(!candidates.is_empty());
    let mut best_idx = candidates[0];
    let mut best_score: i64 = -1;
    for &row in candidates {
        let pc = main.parametric_constant(row);
        let snap = ctx.snap();
        ctx.add_ineq(&pc[1..], &pc[0])?;
        let mut score = 0i64;
        if !ctx.tableau.empty {
            for &other in candidates {
                if other == row {
                    continue;
                }
                if row_sign(main, ctx, other)? != RowSign::Any {
                    score += 1;
                }
            }
        }
        for &other in candidates {
            if other != row {
                main.row_sign[other] = RowSign::Unknown;
            }
        }
        ctx.rollback(snap);
        if score > best_score {
            best_score = score;
            best_idx = row;
        }
    }
    Ok(best_idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i(v: i64) -> BigInt {
        BigInt::from(v)
    }

    #[test]
    fn add_ineq_updates_bset_and_tableau() {
        let mut ctx = Context::new(1, &[false]);
        ctx.add_ineq(&[i(1)], &i(0)).unwrap(); // n >= 0
        assert_eq!(ctx.tableau.bset.as_ref().unwrap().ineqs.len(), 1);
        assert!(!ctx.tableau.empty);
    }

    #[test]
    fn context_is_feasible_true_for_satisfiable_region() {
        let mut ctx = Context::new(1, &[false]);
        ctx.add_ineq(&[i(1)], &i(0)).unwrap(); // n >= 0
        assert!(context_is_feasible(&mut ctx).unwrap());
    }

    #[test]
    fn context_is_feasible_false_for_empty_region() {
        let mut ctx = Context::new(1, &[false]);
        ctx.add_ineq(&[i(1)], &i(-1)).unwrap(); // n >= 1
        ctx.add_ineq(&[i(-1)], &i(-1)).unwrap(); // -n - 1 >= 0  i.e. n <= -1
        assert!(ctx.tableau.empty);
    }
}
