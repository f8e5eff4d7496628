//! The parametric rational tableau: a dense arbitrary-precision simplex
//! matrix with an optional symbolic big-M column, a row/column variable
//! map, a sample set, and an undo journal.
//!
//! Row layout of `M`: `[ d, c0, (M-coef?), a_1, …, a_n_col ]`. `off = 2 + (M
//! as usize)` throughout this module and its siblings.

pub mod bigm;
pub mod pivot;
pub mod lexmin;

use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::basic_set::BasicSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSign {
    Unknown,
    Pos,
    Neg,
    Any,
}

/// Where a tracked variable currently lives: a basic row, or a non-basic
/// column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loc {
    Row(usize),
    Col(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarRecord {
    pub loc: Loc,
    pub is_nonneg: bool,
    pub frozen: bool,
}

impl VarRecord {
    fn column(col: usize, is_nonneg: bool) -> Self {
        Self { loc: Loc::Col(col), is_nonneg, frozen: false }
    }
}

/// Owner of a row or column: a tracked problem/parameter/div variable, or
/// one of the per-constraint ("con") slack variables `add_row` allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarRef {
    Var(usize),
    Con(usize),
}

/// Log records for the undo journal. Each variant carries whatever state
/// its own rollback needs; replay is a straight reverse traversal, never
/// reflective unwinding.
#[derive(Debug, Clone)]
pub enum UndoEntry {
    PivotRowCol { row: usize, col: usize, old_rows: Vec<Vec<BigInt>>, old_row_owner: VarRef, old_col_owner: VarRef, old_row_var: VarRecord, old_col_var: VarRecord },
    MarkRedundant { row: usize },
    DropSample { row: Vec<BigInt> },
    PushBasis,
    AddBsetEq,
    AddBsetIneq,
    AddBsetDiv,
    AllocVar { is_con: bool },
    AllocCon,
    NonNeg { which: VarRef, old: bool },
}

/// A snapshot token: the undo journal length at the moment it was taken.
/// `rollback(tok)` replays every entry pushed since, in reverse.
pub type Snapshot = usize;

#[derive(Clone)]
pub struct Tableau {
    pub n_param: usize,
    pub n_pvar: usize,
    /// Current number of context-div columns; divs are append-only for the
    /// life of a context tableau.
    pub n_div: usize,
    pub has_m: bool,
    pub rational: bool,
    pub empty: bool,

    pub vars: Vec<VarRecord>,
    pub cons: Vec<VarRecord>,

    /// `rows[r]` is `[d, c0, (m?), a_0..a_{n_col-1}]`.
    pub rows: Vec<Vec<BigInt>>,
    pub n_dead: usize,
    pub n_redundant: usize,

    pub row_owner: Vec<VarRef>,
    pub col_owner: Vec<VarRef>,

    /// Only meaningful in parametric mode (main tableau with `n_param > 0`).
    pub row_sign: Vec<RowSign>,

    /// Integer sample points, one row per sample, each of width
    /// `n_param + n_div` (context tableaux) and used for row-sign
    /// heuristics; `[0, n_outside)` are samples dropped by the current
    /// constraint stack.
    pub samples: Vec<Vec<BigInt>>,
    pub n_outside: usize,

    /// Shadow basic-set for context tableaux; `None` for main tableaux.
    pub bset: Option<BasicSet>,

    pub journal: Vec<UndoEntry>,
}

impl Tableau {
    pub fn off(&self) -> usize {
        2 + self.has_m as usize
    }

    pub fn n_col(&self) -> usize {
        self.col_owner.len()
    }

    pub fn n_row(&self) -> usize {
        self.row_owner.len()
    }

    pub fn n_var(&self) -> usize {
        self.vars.len()
    }

    /// Builds a fresh tableau with `n_param` parameter variables, `n_pvar`
    /// problem variables, and no context-divs yet, all starting non-basic
    /// (in columns) with no rows. `is_context` selects whether a `bset`
    /// shadow is maintained. `var_nonneg[i]` flags whether tracked variable
    /// `i` is declared non-negative (e.g. a domain constraint on a problem
    /// variable, or a parameter the caller knows is non-negative); absent
    /// entries default to `false` (a free variable).
    pub fn new(n_param: usize, n_pvar: usize, has_m: bool, rational: bool, is_context: bool, var_nonneg: &[bool]) -> Self {
        let n_var = n_param + n_pvar;
        let vars: Vec<VarRecord> = (0..n_var).map(|i| VarRecord::column(i, var_nonneg.get(i).copied().unwrap_or(false))).collect();
        let col_owner: Vec<VarRef> = (0..n_var).map(VarRef::Var).collect();
        Self {
            n_param,
            n_pvar,
            n_div: 0,
            has_m,
            rational,
            empty: false,
            vars,
            cons: Vec::new(),
            rows: Vec::new(),
            n_dead: 0,
            n_redundant: 0,
            row_owner: Vec::new(),
            col_owner,
            row_sign: Vec::new(),
            samples: Vec::new(),
            n_outside: 0,
            bset: if is_context { Some(BasicSet::new(n_param)) } else { None },
            journal: Vec::new(),
        }
    }

    pub fn is_context(&self) -> bool {
        self.bset.is_some()
    }

    pub fn snap(&self) -> Snapshot {
        self.journal.len()
    }

    /// Replays the journal in reverse back to `tok`, undoing every logged
    /// mutation since it was taken.
    pub fn rollback(&mut self, tok: Snapshot) {
        while self.journal.len() > tok {
            let entry = self.journal.pop().unwrap();
            self.undo_one(entry);
        }
    }

    fn undo_one(&mut self, entry: UndoEntry) {
        match entry {
            UndoEntry::PivotRowCol { row, col, old_rows, old_row_owner, old_col_owner, old_row_var, old_col_var } => {
                self.rows = old_rows;
                self.row_owner[row] = old_row_owner;
                self.col_owner[col] = old_col_owner;
                set_owner_record(self, old_row_owner, old_row_var);
                set_owner_record(self, old_col_owner, old_col_var);
            }
            UndoEntry::MarkRedundant { row } => {
                if self.n_redundant > 0 {
                    self.n_redundant -= 1;
                }
                let _ = row;
            }
            UndoEntry::DropSample { row } => {
                if self.n_outside > 0 {
                    self.n_outside -= 1;
                }
                self.samples.insert(self.n_outside, row);
            }
            UndoEntry::PushBasis => {}
            UndoEntry::AddBsetEq => {
                if let Some(bset) = &mut self.bset {
                    bset.eqs.pop();
                }
            }
            UndoEntry::AddBsetIneq => {
                if let Some(bset) = &mut self.bset {
                    bset.ineqs.pop();
                }
            }
            UndoEntry::AddBsetDiv => {
                if let Some(bset) = &mut self.bset {
                    bset.divs.pop();
                }
                self.n_div -= 1;
            }
            UndoEntry::AllocVar { is_con } => {
                if is_con {
                    self.cons.pop();
                } else {
                    self.vars.pop();
                    self.col_owner.pop();
                    for row in self.rows.iter_mut() {
                        row.pop();
                    }
                    self.n_div -= 1;
                }
            }
            UndoEntry::AllocCon => {
                self.cons.pop();
            }
            UndoEntry::NonNeg { which, old } => match which {
                VarRef::Var(i) => self.vars[i].is_nonneg = old,
                VarRef::Con(i) => self.cons[i].is_nonneg = old,
            },
        }
    }

    pub fn record_nonneg(&mut self, which: VarRef, value: bool) {
        let old = match which {
            VarRef::Var(i) => std::mem::replace(&mut self.vars[i].is_nonneg, value),
            VarRef::Con(i) => std::mem::replace(&mut self.cons[i].is_nonneg, value),
        };
        self.journal.push(UndoEntry::NonNeg { which, old });
    }

    pub fn record_of(&self, which: VarRef) -> &VarRecord {
        match which {
            VarRef::Var(i) => &self.vars[i],
            VarRef::Con(i) => &self.cons[i],
        }
    }

    pub fn record_of_mut(&mut self, which: VarRef) -> &mut VarRecord {
        match which {
            VarRef::Var(i) => &mut self.vars[i],
            VarRef::Con(i) => &mut self.cons[i],
        }
    }

    /// Current sample value of a variable: `0` if non-basic, `c0/d`
    /// (ignoring the M term) if basic.
    pub fn sample_value(&self, which: VarRef) -> (BigInt, BigInt) {
        match self.record_of(which).loc {
            Loc::Col(_) => (BigInt::zero(), BigInt::one()),
            Loc::Row(r) => {
                let row = &self.rows[r];
                (row[1].clone(), row[0].clone())
            }
        }
    }

    pub fn m_coef(&self, row: usize) -> BigInt {
        if self.has_m {
            self.rows[row][2].clone()
        } else {
            BigInt::zero()
        }
    }

    /// The parametric constant of row `r`: constant plus parameter and
    /// context-div coefficients, excluding big-M. Column ordering
    /// within the row mirrors `col_owner`.
    pub fn parametric_constant(&self, row: usize) -> Vec<BigInt> {
        let off = self.off();
        let r = &self.rows[row];
        let mut out = vec![r[1].clone()];
        for (c, owner) in self.col_owner.iter().enumerate() {
            let is_param_or_div = match owner {
                VarRef::Var(i) => *i < self.n_param || *i >= self.n_param + self.n_pvar,
                VarRef::Con(_) => false,
            };
            if is_param_or_div {
                out.push(r[off + c].clone());
            }
        }
        out
    }

    pub fn is_alive_col(&self, col: usize) -> bool {
        col >= self.n_dead
    }
}

fn set_owner_record(t: &mut Tableau, owner: VarRef, record: VarRecord) {
    *t.record_of_mut(owner) = record;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tableau_starts_with_all_vars_in_columns() {
        let t = Tableau::new(1, 1, false, false, false, &[false, true]);
        assert_eq!(t.n_var(), 2);
        assert_eq!(t.n_col(), 2);
        assert_eq!(t.n_row(), 0);
        assert!(matches!(t.vars[0].loc, Loc::Col(0)));
        assert!(matches!(t.vars[1].loc, Loc::Col(1)));
    }

    #[test]
    fn off_accounts_for_big_m_column() {
        let plain = Tableau::new(0, 1, false, false, false, &[true]);
        let withm = Tableau::new(0, 1, true, false, false, &[true]);
        assert_eq!(plain.off(), 2);
        assert_eq!(withm.off(), 3);
    }
}
