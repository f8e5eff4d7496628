//! Vector operations over the arbitrary-precision rows the tableau and the
//! context's `BasicSet` both use.
//!
//! Every row in this crate is a `Vec<BigInt>`, which rules out a `Copy`-bound
//! generic container with operator-overload arithmetic. [`bigint_row`]
//! provides the same operations (swap, extend, inner product,
//! scale-down-by-gcd, normalize, first-nonzero) as free functions over
//! slices instead.

pub mod bigint_row;
