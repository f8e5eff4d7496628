//! Cut & div engine: detects non-integral rows, adds non-parametric or
//! parametric Gomory cuts, and introduces integer divisions shared between
//! the main and context tableaux.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

use crate::basic_set::Div;
use crate::context::Context;
use crate::error::PilpResult;
use crate::tableau::{Loc, RowSign, Tableau, VarRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowClass {
    Integral,
    Infeasible,
    NonParametric,
    Parametric,
    SplitDiv,
}

fn classify_row(t: &Tableau, row: usize) -> RowClass {
    let off = t.off();
    let d = &t.rows[row][0];
    if *d == BigInt::one() {
        return RowClass::Integral;
    }
    let i_cst = t.rows[row][1].mod_floor(d).is_zero();
    let mut i_par = true;
    let mut i_var = true;
    for (col, owner) in t.col_owner.iter().enumerate() {
        let coeff = &t.rows[row][off + col];
        if coeff.is_zero() {
            continue;
        }
        let is_param_or_div = matches!(owner, VarRef::Var(i) if *i < t.n_param || *i >= t.n_param + t.n_pvar);
        let divisible = coeff.mod_floor(d).is_zero();
        if is_param_or_div {
            i_par &= divisible;
        } else {
            i_var &= divisible;
        }
    }
    if i_cst && i_par {
        RowClass::Integral
    } else if i_par && i_var {
        RowClass::Infeasible
    } else if i_par {
        RowClass::NonParametric
    } else if !i_var {
        RowClass::Parametric
    } else {
        RowClass::SplitDiv
    }
}

fn normalize_row_gcd(row: &mut [BigInt]) {
    crate::linalg::bigint_row::canonicalize_row(row);
}

/// `-{-c0/d}`: the unique integer in `(-d, 0]` congruent to `-c0` mod `d`,
/// negated.
fn neg_frac_const(c0: &BigInt, d: &BigInt) -> BigInt {
    -((-c0).mod_floor(d))
}

/// Row `d·v = c0 + Σ b_i·col_i` with `d ∤ c0`, `d | param/div coeffs`: add
/// `-{-c0/d} + Σ {b_i/d}·col_i ≥ 0`. The current sample value is negative
/// by construction, so the new row is pre-classified `neg`.
fn non_parametric_cut(t: &mut Tableau, row: usize) -> usize {
    let off = t.off();
    let d = t.rows[row][0].clone();
    let c0 = t.rows[row][1].clone();
    let mut new_row = vec![BigInt::zero(); off + t.n_col()];
    new_row[0] = d.clone();
    new_row[1] = neg_frac_const(&c0, &d);
    for col in 0..t.n_col() {
        new_row[off + col] = t.rows[row][off + col].mod_floor(&d);
    }
    normalize_row_gcd(&mut new_row);
    let con_id = t.add_materialized_inequality(new_row);
    let Loc::Row(row_idx) = t.record_of(VarRef::Con(con_id)).loc else { unreachable!() };
    t.row_sign[row_idx] = RowSign::Neg;
    con_id
}

/// Finds an existing context-div equal to `(coeffs, denom)` over
/// (params, divs), or introduces a fresh one into both `main` and `ctx`.
/// `coeffs`/`c0` are given over the context's own variable space (params
/// then divs).
pub fn get_div(main: &mut Tableau, ctx: &mut Context, coeffs: &[BigInt], c0: &BigInt, denom: &BigInt) -> PilpResult<usize> {
    let mut row = vec![c0.clone()];
    row.extend_from_slice(coeffs);
    let div = Div::new(row, denom.clone());
    if let Some(idx) = ctx.tableau.bset.as_ref().and_then(|b| b.find_div(&div)) {
        return Ok(idx);
    }
    let div_idx = ctx.n_div();
    if let Some(bset) = &mut ctx.tableau.bset {
        bset.add_div(div);
    }
    main.add_div_var();
    ctx.tableau.add_div_var();

    // e - m*q >= 0  and  -e + m*q + m - 1 >= 0, both over the context's own
    // variable space extended with the new div column.
    let q = ctx.n_param() + div_idx;
    let mut fwd_coeffs = vec![BigInt::zero(); q + 1];
    fwd_coeffs[..coeffs.len()].clone_from_slice(coeffs);
    fwd_coeffs[q] = -denom.clone();
    ctx.add_ineq(&fwd_coeffs, c0)?;

    let mut bwd_coeffs: Vec<BigInt> = fwd_coeffs.iter().map(|v| -v).collect();
    bwd_coeffs[q] = denom.clone();
    let bwd_c0 = -c0.clone() + denom - BigInt::one();
    ctx.add_ineq(&bwd_coeffs, &bwd_c0)?;

    for sample in ctx.tableau.samples.iter_mut() {
        let e: BigInt = c0.clone() + coeffs.iter().zip(sample.iter()).map(|(a, s)| a * s).sum::<BigInt>();
        sample.push(e.div_floor(denom));
    }
    Ok(div_idx)
}

/// Row with fractional param/div AND fractional var coefficients: builds
/// `q = floor(Σ{-a_i/d}·y_i)` over params+divs, then adds to the main
/// tableau `-{-c0/d} + Σ{-a_i/d}·y_i + Σ{b_i/d}·x_i + q ≥ 0`.
fn parametric_cut(main: &mut Tableau, ctx: &mut Context, row: usize) -> PilpResult<usize> {
    let off = main.off();
    let d = main.rows[row][0].clone();
    let c0 = main.rows[row][1].clone();

    let n_ctx_var = ctx.n_param() + ctx.n_div();
    let mut div_coeffs = vec![BigInt::zero(); n_ctx_var];
    for (col, owner) in main.col_owner.iter().enumerate() {
        if let VarRef::Var(i) = owner {
            if *i < main.n_param {
                div_coeffs[*i] = neg_frac_const(&main.rows[row][off + col], &d);
            } else if *i >= main.n_param + main.n_pvar {
                let k = *i - main.n_param - main.n_pvar;
                div_coeffs[ctx.n_param() + k] = neg_frac_const(&main.rows[row][off + col], &d);
            }
        }
    }
    let div_c0 = BigInt::zero();
    let div_idx = get_div(main, ctx, &div_coeffs, &div_c0, &d)?;

    let mut new_row = vec![BigInt::zero(); main.off() + main.n_col()];
    new_row[0] = d.clone();
    new_row[1] = neg_frac_const(&c0, &d);
    for col in 0..main.n_col() {
        let owner = main.col_owner[col];
        if let VarRef::Var(i) = owner {
            if i >= main.n_param && i < main.n_param + main.n_pvar {
                new_row[off + col] = main.rows[row][off + col].mod_floor(&d);
                continue;
            }
        }
        // param/div/con coefficients already accounted for via the new div.
    }
    let q_id = main.div_var(div_idx);
    match main.vars[q_id].loc {
        Loc::Col(c) => new_row[off + c] += BigInt::one(),
        Loc::Row(r) => {
            // q is already basic in main: fold its row in directly.
            for k in 0..main.n_col() {
                new_row[off + k] += &main.rows[r][off + k];
            }
            new_row[1] += &main.rows[r][1];
        }
    }
    normalize_row_gcd(&mut new_row);
    Ok(main.add_materialized_inequality(new_row))
}

/// Row with fractional param/div coefficients but integral var
/// coefficients: introduces `q = floor(Σ{a_i/d}·y_i)` into the context as
/// an *equality*, emits the complementary strict half as empty (via the
/// `emit_no_solution` callback), and rewrites the main row in terms of `q`.
pub fn split_div_cut(main: &mut Tableau, ctx: &mut Context, row: usize, mut emit_no_solution: impl FnMut(&mut Context, &[BigInt], &BigInt) -> PilpResult<()>) -> PilpResult<()> {
    let off = main.off();
    let d = main.rows[row][0].clone();
    let c0 = main.rows[row][1].clone();

    let n_ctx_var = ctx.n_param() + ctx.n_div();
    let mut e_coeffs = vec![BigInt::zero(); n_ctx_var];
    for (col, owner) in main.col_owner.iter().enumerate() {
        if let VarRef::Var(i) = owner {
            if *i < main.n_param {
                e_coeffs[*i] = main.rows[row][off + col].clone();
            } else if *i >= main.n_param + main.n_pvar {
                let k = *i - main.n_param - main.n_pvar;
                e_coeffs[ctx.n_param() + k] = main.rows[row][off + col].clone();
            }
        }
    }
    let div_idx = get_div(main, ctx, &e_coeffs, &c0, &d)?;
    let q = ctx.n_param() + div_idx;
    let new_n_ctx_var = ctx.n_param() + ctx.n_div();

    // `e - d*q` over the (possibly div-extended) context variable space:
    // `e_coeffs` padded with `get_div`'s freshly appended div column if it
    // introduced one, `-d` placed in `q`'s own column.
    let mut e_minus_dq = vec![BigInt::zero(); new_n_ctx_var];
    e_minus_dq[..e_coeffs.len()].clone_from_slice(&e_coeffs);
    e_minus_dq[q] = -d.clone();

    // Strict remainder half `e - d*q >= 1`, i.e. `(c0 - 1) + e_minus_dq >= 0`,
    // the complement of the equality below: recorded as an empty region.
    emit_no_solution(ctx, &e_minus_dq, &(c0.clone() - BigInt::one()))?;

    // Force the remainder to zero: `e - d*q = 0`.
    ctx.add_eq(&e_minus_dq, &c0)?;

    let mut new_row = vec![BigInt::zero(); off + main.n_col()];
    new_row[0] = BigInt::one();
    new_row[1] = c0.div_floor(&d);
    for col in 0..main.n_col() {
        let owner = main.col_owner[col];
        let is_param_or_div = matches!(owner, VarRef::Var(i) if i < main.n_param || i >= main.n_param + main.n_pvar);
        if is_param_or_div {
            continue;
        }
        new_row[off + col] = main.rows[row][off + col].div_floor(&d);
    }
    let q_id = main.div_var(div_idx);
    if let Loc::Col(c) = main.vars[q_id].loc {
        new_row[off + c] = BigInt::one();
    }
    main.rows[row] = new_row;
    Ok(())
}

/// Applies exactly one cut to the first non-integral row found, or returns
/// `None` if every row is already integral. `on_split_div` handles the
/// "no-solution in strict half" emission for split-div cuts.
pub fn apply_one_cut(main: &mut Tableau, ctx: &mut Context, on_split_div: impl FnMut(&mut Context, &[BigInt], &BigInt) -> PilpResult<()>) -> PilpResult<bool> {
    let candidate = (main.n_redundant..main.n_row()).find(|&r| main.rows[r][0] != BigInt::one());
    let Some(row) = candidate else {
        return Ok(false);
    };
    match classify_row(main, row) {
        RowClass::Integral => Ok(true),
        RowClass::Infeasible => {
            main.empty = true;
            Ok(true)
        }
        RowClass::NonParametric => {
            non_parametric_cut(main, row);
            Ok(true)
        }
        RowClass::Parametric => {
            parametric_cut(main, ctx, row)?;
            Ok(true)
        }
        RowClass::SplitDiv => {
            split_div_cut(main, ctx, row, on_split_div)?;
            Ok(true)
        }
    }
}

/// Repeatedly cuts `t` (a tableau with no real parameters of its own, i.e.
/// a context tableau being closed to a concrete point) until every row is
/// integral or infeasibility is certain, returning the resulting integer
/// sample over `t`'s own variables, or `None` if infeasible.
pub fn cut_to_integer_lexmin(t: &mut Tableau) -> PilpResult<Option<Vec<BigInt>>> {
    t.restore_lexmin()?;
    loop {
        if t.empty {
            return Ok(None);
        }
        let candidate = (t.n_redundant..t.n_row()).find(|&r| t.rows[r][0] != BigInt::one());
        let Some(row) = candidate else {
            break;
        };
        match classify_row(t, row) {
            RowClass::Integral => continue,
            RowClass::Infeasible => {
                t.empty = true;
                return Ok(None);
            }
            RowClass::NonParametric => {
                non_parametric_cut(t, row);
            }
            // A standalone tableau (n_param == 0) never needs the
            // parametric/split-div actions since every coefficient is, by
            // this module's classification, either "var" or vacuously
            // "param/div" over an empty param range and the tableau's own
            // divs. It still terminates here because div-introducing
            // cuts only occur when real parameters are present above it.
            RowClass::Parametric | RowClass::SplitDiv => {
                non_parametric_cut(t, row);
            }
        }
        t.restore_lexmin()?;
    }
    let n = t.n_param + t.n_pvar + t.n_div;
    let mut sample = Vec::with_capacity(n);
    for v in 0..n {
        let (num, den) = t.sample_value(VarRef::Var(v));
        debug_assert_eq!(den, BigInt::one());
        sample.push(num);
    }
    Ok(Some(sample))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tableau::Tableau;

    fn i(v: i64) -> BigInt {
        BigInt::from(v)
    }

    #[test]
    fn classify_integral_row_is_integral() {
        let mut t = Tableau::new(0, 1, false, false, false, &[true]);
        t.add_inequality(&[i(1)], &i(5), &i(1), &i(0)).unwrap();
        assert_eq!(classify_row(&t, 0), RowClass::Integral);
    }

    #[test]
    fn non_parametric_cut_row_is_pre_classified_negative() {
        // 2v = 1 + x  (d=2, c0=1): not integral, I_VAR=1, I_PAR trivially 1 (no params).
        let mut t = Tableau::new(0, 1, false, false, false, &[true]);
        t.add_inequality(&[i(1)], &i(1), &i(2), &i(0)).unwrap();
        assert_eq!(classify_row(&t, 0), RowClass::NonParametric);
        let con = non_parametric_cut(&mut t, 0);
        let Loc::Row(r) = t.record_of(VarRef::Con(con)).loc else { panic!() };
        assert_eq!(t.row_sign[r], RowSign::Neg);
    }
}
