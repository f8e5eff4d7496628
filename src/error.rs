//! Error kinds surfaced at the boundary of the core.
//!
//! Infeasibility is *not* an error: a tableau that cannot be made feasible is
//! marked `empty` and an empty-region piece is emitted through the solution
//! sink instead of propagating a `Result::Err`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PilpError {
    /// Caller misuse: incompatible shapes, a malformed basic map, a zero
    /// divisor on input, or an operation requested on NaN/∞ where the
    /// boundary disallows it.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The solver reached a state that should be unreachable, a pivot
    /// column was not found where one must exist, a dead column was
    /// touched, etc. Fatal to the solve in progress.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),

    /// The arbitrary-precision backend could not extend a matrix or vector.
    #[error("resource exhausted: {0}")]
    ArithmeticOverflow(String),
}

pub type PilpResult<T> = Result<T, PilpError>;
