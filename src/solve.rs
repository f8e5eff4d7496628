//! Top-level entry points and the recursive driver. `partial_lexopt` and
//! `foreach_lexopt` are the two public entry points; `solve_branch` is the
//! recursive "lex-pivot, check parameter signs, cut" loop run until a
//! branch is infeasible or settles on an integer vertex.

use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::basic_set::{BasicMap, BasicSet};
use crate::context::{self, Context};
use crate::cuts;
use crate::error::{PilpError, PilpResult};
use crate::sink::Sink;
use crate::tableau::{RowSign, Tableau, VarRef};

/// One constraint of an input system, given over a fixed variable order
/// (for a [`BMap`]: params then output variables; for a [`Domain`]: params
/// only).
#[derive(Debug, Clone)]
pub struct Constraint {
    pub coeffs: Vec<BigInt>,
    pub c0: BigInt,
    pub kind: ConKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConKind {
    Eq,
    Ineq,
}

impl Constraint {
    pub fn ineq(coeffs: Vec<BigInt>, c0: BigInt) -> Self {
        Self { coeffs, c0, kind: ConKind::Ineq }
    }

    pub fn eq(coeffs: Vec<BigInt>, c0: BigInt) -> Self {
        Self { coeffs, c0, kind: ConKind::Eq }
    }
}

/// The input relation: a system over `n_param` parameters followed by
/// `n_var` output variables. `var_nonneg` is a caller-supplied hint (not
/// itself a constraint) feeding the "obviously non-negative" heuristic;
/// most non-negativity actually comes from explicit `x >= 0` rows in
/// `constraints`.
#[derive(Debug, Clone)]
pub struct BMap {
    pub n_param: usize,
    pub n_var: usize,
    pub constraints: Vec<Constraint>,
    pub var_nonneg: Vec<bool>,
    /// Skip the cut phase and emit the rational lex-optimum instead of
    /// refining it to an integer one.
    pub rational: bool,
}

impl BMap {
    pub fn new(n_param: usize, n_var: usize) -> Self {
        Self { n_param, n_var, constraints: Vec::new(), var_nonneg: vec![false; n_var], rational: false }
    }

    pub fn add(&mut self, c: Constraint) {
        debug_assert_eq!(c.coeffs.len(), self.n_param + self.n_var);
        self.constraints.push(c);
    }
}

/// The input domain: a system over the same `n_param` parameters alone.
#[derive(Debug, Clone)]
pub struct Domain {
    pub n_param: usize,
    pub constraints: Vec<Constraint>,
    pub param_nonneg: Vec<bool>,
}

impl Domain {
    pub fn new(n_param: usize) -> Self {
        Self { n_param, constraints: Vec::new(), param_nonneg: vec![false; n_param] }
    }

    pub fn universe(n_param: usize) -> Self {
        Self::new(n_param)
    }

    pub fn add(&mut self, c: Constraint) {
        debug_assert_eq!(c.coeffs.len(), self.n_param);
        self.constraints.push(c);
    }
}

/// Ambient configuration threaded through a solve: an explicit options
/// struct rather than hidden globals.
#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Safety-valve cap on the number of cuts/splits a single solve may
    /// perform before giving up with `ArithmeticOverflow`. `None` = no cap.
    /// A guard against runaway recursion on malformed input.
    pub cut_budget: Option<usize>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self { cut_budget: None }
    }
}

/// The result of [`partial_lexopt`]: a disjoint relation of feasible
/// pieces plus the (optionally tracked) union of infeasible regions.
#[derive(Debug, Clone)]
pub struct Relation {
    pub pieces: Vec<BasicMap>,
    pub empty: Vec<BasicSet>,
}

fn check_compatible(bmap: &BMap, dom: &Domain) -> PilpResult<()> {
    if bmap.n_param != dom.n_param {
        return Err(PilpError::InvalidInput(format!(
            "bmap has {} parameters but dom has {}",
            bmap.n_param, dom.n_param
        )));
    }
    Ok(())
}

fn build_context(dom: &Domain) -> PilpResult<Context> {
    let mut ctx = Context::new(dom.n_param, &dom.param_nonneg);
    for c in &dom.constraints {
        match c.kind {
            ConKind::Eq => ctx.add_eq(&c.coeffs, &c.c0)?,
            ConKind::Ineq => ctx.add_ineq(&c.coeffs, &c.c0)?,
        }
        if ctx.tableau.empty {
            break;
        }
    }
    Ok(ctx)
}

/// Builds the main tableau over `(p, x)` for `bmap`, negating the output
/// (problem-variable) block of every constraint when `max` is set so the
/// driver always pivots toward a lex-*min*: negating every output
/// coefficient up front on the constraint side, and negating back in the
/// sink, is equivalent to maximizing directly.
///
/// A constraint whose output-variable block is entirely zero is purely
/// parametric; it says nothing about `x`, only about feasible `p`. Per
/// the "purely parametric equality" boundary, such an equality is also
/// fed to `ctx` directly, and the main-tableau row(s) it produced are
/// marked redundant since the context now enforces it on every branch.
fn build_main(bmap: &BMap, ctx: &mut Context, max: bool) -> PilpResult<Tableau> {
    let n_param = bmap.n_param;
    let n_var = bmap.n_var;
    let mut var_nonneg = vec![false; n_param + n_var];
    var_nonneg[n_param..].copy_from_slice(&bmap.var_nonneg);
    let mut main = Tableau::new(n_param, n_var, true, bmap.rational, false, &var_nonneg);

    for c in &bmap.constraints {
        let mut coeffs = c.coeffs.clone();
        if max {
            for v in coeffs[n_param..].iter_mut() {
                *v = -v.clone();
            }
        }
        let pure_param = c.kind == ConKind::Eq && c.coeffs[n_param..].iter().all(Zero::is_zero);
        let row_count_before = main.n_row();
        if pure_param {
            ctx.add_eq(&coeffs[..n_param], &c.c0)?;
        }
        match c.kind {
            ConKind::Eq => main.add_equality(&coeffs, &c.c0, &BigInt::one(), &BigInt::zero(), true)?,
            ConKind::Ineq => {
                main.add_inequality(&coeffs, &c.c0, &BigInt::one(), &BigInt::zero())?;
            }
        }
        if pure_param {
            for r in row_count_before..main.n_row() {
                main.mark_redundant(r);
            }
        }
        if main.empty || ctx.tableau.empty {
            break;
        }
    }
    Ok(main)
}

/// Seeds every output variable still free in a column to the big-M
/// bootstrap value `-M` by adding `x_i + M >= 0` and immediately pivoting
/// `x_i` into it. This gives the dual-simplex repair in `restore_lexmin` a
/// lex-smaller-than-everything
/// starting point to ascend *from*: each subsequent pivot, triggered by a
/// genuine constraint violation, only ever raises an output variable toward
/// a real bound, so the vertex `restore_lexmin` settles on is guaranteed
/// lex-minimal rather than merely "the first bound encountered". A variable
/// no constraint ever touches keeps `M`'s coefficient forever (never
/// pivoted again) and is rejected as unbounded in `sink::build_piece`.
fn seed_big_m(main: &mut Tableau) -> PilpResult<()> {
    for i in 0..main.n_pvar {
        let var_id = main.n_param + i;
        if let crate::tableau::Loc::Col(c) = main.vars[var_id].loc {
            let mut coeffs = vec![BigInt::zero(); main.n_var()];
            coeffs[var_id] = BigInt::one();
            let con_id = main.add_inequality(&coeffs, &BigInt::zero(), &BigInt::one(), &BigInt::one())?;
            let crate::tableau::Loc::Row(r) = main.cons[con_id].loc else {
                unreachable!("add_inequality always allocates a row")
            };
            main.pivot(r, c)?;
        }
    }
    Ok(())
}

struct Budget {
    remaining: Option<usize>,
}

impl Budget {
    fn tick(&mut self) -> PilpResult<()> {
        match &mut self.remaining {
            None => Ok(()),
            Some(0) => Err(PilpError::ArithmeticOverflow("cut/split budget exhausted".into())),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
        }
    }
}

/// The recursive driver: alternates lex-pivoting, parameter sign-checking,
/// and cutting until `main` is infeasible (emit empty) or settled to a
/// feasible rational/integer vertex (emit the piece). Splits clone `main`
/// for the positive half and mutate `ctx`/`main` in place for the negative
/// half, recursing on the positive branch before continuing.
fn solve_branch(main: &mut Tableau, ctx: &mut Context, max: bool, sink: &mut Sink, budget: &mut Budget) -> PilpResult<()> {
    loop {
        main.restore_lexmin()?;
        if main.empty {
            return sink.add(ctx, main, max);
        }

        let candidates: Vec<usize> = {
            let mut v = Vec::new();
            for r in main.n_redundant..main.n_row() {
                if !main.record_of(main.row_owner[r]).is_nonneg {
                    continue;
                }
                if context::row_sign(main, ctx, r)? == RowSign::Any {
                    v.push(r);
                }
            }
            v
        };

        if main.empty {
            return sink.add(ctx, main, max);
        }

        if !candidates.is_empty() {
            budget.tick()?;
            let split_row = context::best_split(main, ctx, &candidates)?;
            let pc = main.parametric_constant(split_row);

            let mut pos_main = main.clone();
            let snap = ctx.snap();
            ctx.add_ineq(&pc[1..], &pc[0])?;
            pos_main.row_sign[split_row] = RowSign::Pos;
            solve_branch(&mut pos_main, ctx, max, sink, budget)?;
            ctx.rollback(snap);

            let neg_coeffs: Vec<BigInt> = pc[1..].iter().map(|v| -v).collect();
            let neg_c0 = -&pc[0] - BigInt::one();
            ctx.add_ineq(&neg_coeffs, &neg_c0)?;
            main.row_sign[split_row] = RowSign::Neg;
            if ctx.tableau.empty {
                main.empty = true;
                return sink.add(ctx, main, max);
            }
            continue;
        }

        if main.rational {
            return sink.add(ctx, main, max);
        }

        budget.tick()?;
        let mut emitted_no_solution = Ok(());
        let cut_happened = cuts::apply_one_cut(main, ctx, |ctx, coeffs, c0| {
            let snap = ctx.snap();
            ctx.add_ineq(coeffs, c0)?;
            let res = sink.emit_empty(ctx);
            ctx.rollback(snap);
            emitted_no_solution = res;
            Ok(())
        })?;
        emitted_no_solution?;

        if main.empty {
            return sink.add(ctx, main, max);
        }
        if !cut_happened {
            return sink.add(ctx, main, max);
        }
    }
}

/// Returns the disjoint relation whose union over its pieces equals the
/// lex-opt of `bmap` restricted to `dom`.
pub fn partial_lexopt(bmap: &BMap, dom: &Domain, max: bool, opts: &SolveOptions) -> PilpResult<Relation> {
    check_compatible(bmap, dom)?;
    let mut ctx = build_context(dom)?;
    let mut sink = Sink::relation(true);
    if ctx.tableau.empty {
        sink.emit_empty(&ctx)?;
    } else {
        let mut main = build_main(bmap, &mut ctx, max)?;
        if ctx.tableau.empty {
            main.empty = true;
        }
        if !main.empty {
            seed_big_m(&mut main)?;
        }
        let mut budget = Budget { remaining: opts.cut_budget };
        solve_branch(&mut main, &mut ctx, max, &mut sink, &mut budget)?;
    }
    match sink {
        Sink::Relation { pieces, empty, .. } => Ok(Relation { pieces, empty }),
        Sink::Callback(_) => unreachable!("partial_lexopt always builds a Relation sink"),
    }
}

/// Same semantics as [`partial_lexopt`] but streams `(domain_piece,
/// affine_map)` pairs (the affine map is `None` for an empty-region piece)
/// to `f` instead of collecting them.
pub fn foreach_lexopt(
    bmap: &BMap,
    dom: &Domain,
    max: bool,
    opts: &SolveOptions,
    f: impl FnMut(BasicSet, Option<crate::sink::AffineOut>) + 'static,
) -> PilpResult<()> {
    check_compatible(bmap, dom)?;
    let mut ctx = build_context(dom)?;
    let mut sink = Sink::callback(f);
    if ctx.tableau.empty {
        sink.emit_empty(&ctx)?;
        return Ok(());
    }
    let mut main = build_main(bmap, &mut ctx, max)?;
    if ctx.tableau.empty {
        main.empty = true;
    }
    if !main.empty {
        seed_big_m(&mut main)?;
    }
    let mut budget = Budget { remaining: opts.cut_budget };
    solve_branch(&mut main, &mut ctx, max, &mut sink, &mut budget)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i(v: i64) -> BigInt {
        BigInt::from(v)
    }

    /// `{ (n) -> (x) : 0 <= x, x <= n }`, min. Expect x = 0 on `n >= 0`,
    /// empty on `n < 0`.
    #[test]
    fn min_zero_within_bounds() {
        let mut bmap = BMap::new(1, 1);
        bmap.add(Constraint::ineq(vec![i(0), i(1)], i(0))); // x >= 0
        bmap.add(Constraint::ineq(vec![i(1), i(-1)], i(0))); // n - x >= 0
        let dom = Domain::universe(1);
        let rel = partial_lexopt(&bmap, &dom, false, &SolveOptions::default()).unwrap();
        assert_eq!(rel.pieces.len(), 1);
        let piece = &rel.pieces[0];
        assert_eq!(piece.out[0].1[0], i(0)); // x's constant term is 0
        assert_eq!(piece.out[0].1[1], i(0)); // and no dependence on n
        assert!(!rel.empty.is_empty());
    }

    /// Same bmap as above, max. Expect x = n on `n >= 0`.
    #[test]
    fn max_equals_n() {
        let mut bmap = BMap::new(1, 1);
        bmap.add(Constraint::ineq(vec![i(0), i(1)], i(0)));
        bmap.add(Constraint::ineq(vec![i(1), i(-1)], i(0)));
        let dom = Domain::universe(1);
        let rel = partial_lexopt(&bmap, &dom, true, &SolveOptions::default()).unwrap();
        assert_eq!(rel.pieces.len(), 1);
        let (d, coeffs) = &rel.pieces[0].out[0];
        // d*x = c0 + n, i.e. x = n when d == 1 and c0 == 0.
        assert_eq!(*d, i(1));
        assert_eq!(coeffs[0], i(0));
        assert_eq!(coeffs[1], i(1));
    }

    /// `{ (n) -> (x, y) : 0<=x, 0<=y, x+y=n }`, min. Expect lex-min
    /// (x, y) = (0, n) on `n >= 0`.
    #[test]
    fn lex_min_pair_sums_to_n() {
        let mut bmap = BMap::new(1, 2);
        bmap.add(Constraint::ineq(vec![i(0), i(1), i(0)], i(0))); // x >= 0
        bmap.add(Constraint::ineq(vec![i(0), i(0), i(1)], i(0))); // y >= 0
        bmap.add(Constraint::eq(vec![i(1), i(-1), i(-1)], i(0))); // n - x - y = 0
        let dom = Domain::universe(1);
        let rel = partial_lexopt(&bmap, &dom, false, &SolveOptions::default()).unwrap();
        assert_eq!(rel.pieces.len(), 1);
        let piece = &rel.pieces[0];
        let (dx, cx) = &piece.out[0];
        assert_eq!(*dx, i(1));
        assert_eq!(cx[0], i(0));
        assert_eq!(cx[1], i(0)); // x = 0 regardless of n
        let (dy, cy) = &piece.out[1];
        assert_eq!(*dy, i(1));
        assert_eq!(cy[0], i(0));
        assert_eq!(cy[1], i(1)); // y = n
    }

    /// `{ (n) -> (x) : 2x = n }`. Expect a div introduced and x resolved to
    /// it on the feasible (even) half.
    #[test]
    fn equality_with_even_coefficient_introduces_div() {
        let mut bmap = BMap::new(1, 1);
        bmap.add(Constraint::eq(vec![i(1), i(-2)], i(0))); // n - 2x = 0
        let dom = Domain::universe(1);
        let rel = partial_lexopt(&bmap, &dom, false, &SolveOptions::default()).unwrap();
        assert!(!rel.pieces.is_empty());
        let piece = &rel.pieces[0];
        assert_eq!(piece.domain.divs.len(), 1);
        let (d, _coeffs) = &piece.out[0];
        assert_eq!(*d, i(1));
    }

    /// `{ (n) -> (x) : }` (no constraint on `x` at all), min. The big-M
    /// bootstrap seeds `x` to `-M`; with no `x >= 0` (or any other
    /// constraint) to repair it, `x` never leaves the bootstrap and its row
    /// keeps a nonzero M coefficient. Spec §8: detected via the big-M
    /// assertion, surfaced as `InvalidInput`.
    #[test]
    fn unconstrained_output_is_invalid_input() {
        let bmap = BMap::new(1, 1);
        let mut dom = Domain::universe(1);
        dom.add(Constraint::ineq(vec![i(1)], i(0))); // n >= 0, just to bound the test
        let err = partial_lexopt(&bmap, &dom, false, &SolveOptions::default()).unwrap_err();
        assert!(matches!(err, PilpError::InvalidInput(_)));
    }

    /// `{ (n) -> (x) : 0 <= x }`, min, with no upper bound on `x`. The
    /// explicit nonnegativity constraint catches the big-M bootstrap and
    /// repairs it to the real lex-min: `x = 0`.
    #[test]
    fn output_with_explicit_nonneg_defaults_to_zero() {
        let mut bmap = BMap::new(1, 1);
        bmap.add(Constraint::ineq(vec![i(0), i(1)], i(0))); // x >= 0
        let mut dom = Domain::universe(1);
        dom.add(Constraint::ineq(vec![i(1)], i(0))); // n >= 0
        let rel = partial_lexopt(&bmap, &dom, false, &SolveOptions::default()).unwrap();
        assert_eq!(rel.pieces.len(), 1);
        let (d, coeffs) = &rel.pieces[0].out[0];
        assert_eq!(*d, i(1));
        assert!(coeffs.iter().all(|c| c.is_zero()));
    }

    /// `{ (a, b) -> (x) : a = b, 0 <= x }`, min. The equality touches no
    /// output variable, so it is transferred to the context at
    /// preprocessing and leaves `x` to default to 0 via its own bound.
    #[test]
    fn purely_parametric_equality_is_transferred_to_context() {
        let mut bmap = BMap::new(2, 1);
        bmap.add(Constraint::eq(vec![i(1), i(-1), i(0)], i(0))); // a - b = 0
        bmap.add(Constraint::ineq(vec![i(0), i(0), i(1)], i(0))); // x >= 0
        let dom = Domain::universe(2);
        let rel = partial_lexopt(&bmap, &dom, false, &SolveOptions::default()).unwrap();
        assert_eq!(rel.pieces.len(), 1);
        let piece = &rel.pieces[0];
        assert_eq!(piece.domain.eqs.len(), 1); // a - b = 0, carried by the context
        let (d, coeffs) = &piece.out[0];
        assert_eq!(*d, i(1));
        assert!(coeffs.iter().all(|c| c.is_zero())); // x = 0
    }

    #[test]
    fn incompatible_domain_is_invalid_input() {
        let bmap = BMap::new(2, 1);
        let dom = Domain::universe(1);
        let err = partial_lexopt(&bmap, &dom, false, &SolveOptions::default()).unwrap_err();
        assert!(matches!(err, PilpError::InvalidInput(_)));
    }
}
