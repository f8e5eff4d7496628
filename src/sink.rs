//! Solution sink: a collector invoked whenever the driver (`crate::solve`)
//! terminates a branch, either with an infeasible (`empty`) main tableau or
//! a feasible integer (or rational, in the `rational` fast path) lex-opt
//! vertex.
//!
//! A tagged variant rather than a vtable: `Sink::Relation` accumulates
//! pieces into an output relation, `Sink::Callback` streams them to a
//! caller-provided closure.

use num_bigint::BigInt;

use crate::basic_set::BasicMap;
use crate::context::Context;
use crate::error::{PilpError, PilpResult};
use crate::tableau::{Loc, Tableau};

/// An emitted affine output: `out[i] = (denom, coeffs)` means
/// `denom * x_i = coeffs[0] + sum(coeffs[1..] * (params, divs))`, already
/// sign-flipped for `max` mode.
pub type AffineOut = Vec<(BigInt, Vec<BigInt>)>;

pub enum Sink {
    /// Accumulates pieces into a `Relation`. `empty` accumulates the union
    /// of infeasible regions only when `track_empty` is set (the top-level
    /// entry points always want it; a leaner embedding may not).
    Relation { pieces: Vec<BasicMap>, empty: Vec<crate::basic_set::BasicSet>, track_empty: bool },
    /// Streams pieces to a caller-provided closure: `None` for an empty
    /// region, `Some(out)` for a feasible piece. Emitting empty regions
    /// with `None` keeps "regions cover the domain" observable through
    /// either collector (see DESIGN.md).
    Callback(Box<dyn FnMut(crate::basic_set::BasicSet, Option<AffineOut>)>),
}

impl Sink {
    pub fn relation(track_empty: bool) -> Self {
        Sink::Relation { pieces: Vec::new(), empty: Vec::new(), track_empty }
    }

    pub fn callback(f: impl FnMut(crate::basic_set::BasicSet, Option<AffineOut>) + 'static) -> Self {
        Sink::Callback(Box::new(f))
    }

    /// Called once per terminated branch, after `main.restore_lexmin` /
    /// the cut loop has settled it to either `empty` or a fully resolved
    /// (rational or integer) vertex.
    pub fn add(&mut self, ctx: &Context, main: &Tableau, max: bool) -> PilpResult<()> {
        if main.empty {
            return self.emit_empty(ctx);
        }
        let bmap = build_piece(ctx, main, max)?;
        match self {
            Sink::Relation { pieces, .. } => {
                pieces.push(bmap);
                Ok(())
            }
            Sink::Callback(f) => {
                f(bmap.domain, Some(bmap.out));
                Ok(())
            }
        }
    }

    /// Emits an empty-region piece directly from the current context,
    /// without a main tableau to inspect. Used both by `add` (when
    /// `main.empty`) and by the cut engine's "no solution in strict half"
    /// emission.
    pub fn emit_empty(&mut self, ctx: &Context) -> PilpResult<()> {
        let mut region = ctx.tableau.bset.clone().unwrap_or_default();
        region.finalize();
        match self {
            Sink::Relation { empty, track_empty, .. } => {
                if *track_empty {
                    empty.push(region);
                }
                Ok(())
            }
            Sink::Callback(f) => {
                f(region, None);
                Ok(())
            }
        }
    }
}

/// Builds the feasible piece `(region, out)` for a settled, non-empty main
/// tableau: the region is copied verbatim from the context's `bset`, and
/// each output (problem) variable's row is read off as an affine
/// expression over (params, context-divs).
fn build_piece(ctx: &Context, main: &Tableau, max: bool) -> PilpResult<BasicMap> {
    let mut region = ctx.tableau.bset.clone().unwrap_or_default();
    region.finalize();
    let mut bmap = BasicMap::new(region, main.n_pvar);
    for i in 0..main.n_pvar {
        let var_id = main.n_param + i;
        // A non-basic output is implicitly 0, a genuine value, not a
        // failure, whenever no constraint ever needed to move it off its
        // default.
        let (d, mut affine) = match main.vars[var_id].loc {
            Loc::Col(_) => (BigInt::one(), vec![BigInt::zero(); 1 + main.n_param + main.n_div]),
            Loc::Row(row) => {
                if main.has_m && !main.m_coef(row).is_zero() {
                    return Err(PilpError::InvalidInput(format!(
                        "output variable {i} is unbounded below: no constraint resolves it off the big-M bootstrap"
                    )));
                }
                (main.rows[row][0].clone(), main.parametric_constant(row))
            }
        };
        if max {
            for v in affine.iter_mut() {
                *v = -v.clone();
            }
        }
        bmap.out.push((d, affine));
    }
    Ok(bmap)
}
