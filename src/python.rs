//! Python extension-module surface (`python` feature). Builds a [`BMap`]
//! and a [`Domain`] over plain integer coefficients, calls
//! `partial_lexopt`, and reads back the resulting [`Relation`]. Kept thin,
//! no solver logic lives here.

use num_bigint::BigInt;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyList;
use pyo3::wrap_pyfunction;

use crate::solve::{self, BMap, Constraint, Domain, SolveOptions};

fn to_bigint_vec(list: &Bound<'_, PyList>) -> PyResult<Vec<BigInt>> {
    list.iter().map(|item| item.extract::<i64>().map(BigInt::from)).collect()
}

#[pyclass]
pub struct PyBMap {
    inner: BMap,
}

#[pymethods]
impl PyBMap {
    #[new]
    pub fn new(n_param: usize, n_var: usize) -> Self {
        Self { inner: BMap::new(n_param, n_var) }
    }

    pub fn add_ineq(&mut self, coeffs: &Bound<'_, PyList>, c0: i64) -> PyResult<()> {
        self.inner.add(Constraint::ineq(to_bigint_vec(coeffs)?, BigInt::from(c0)));
        Ok(())
    }

    pub fn add_eq(&mut self, coeffs: &Bound<'_, PyList>, c0: i64) -> PyResult<()> {
        self.inner.add(Constraint::eq(to_bigint_vec(coeffs)?, BigInt::from(c0)));
        Ok(())
    }

    pub fn set_var_nonneg(&mut self, i: usize, nonneg: bool) {
        self.inner.var_nonneg[i] = nonneg;
    }

    #[pyo3(signature = (rational=true))]
    pub fn set_rational(&mut self, rational: bool) {
        self.inner.rational = rational;
    }
}

#[pyclass]
pub struct PyDomain {
    inner: Domain,
}

#[pymethods]
impl PyDomain {
    #[new]
    pub fn new(n_param: usize) -> Self {
        Self { inner: Domain::universe(n_param) }
    }

    pub fn add_ineq(&mut self, coeffs: &Bound<'_, PyList>, c0: i64) -> PyResult<()> {
        self.inner.add(Constraint::ineq(to_bigint_vec(coeffs)?, BigInt::from(c0)));
        Ok(())
    }

    pub fn add_eq(&mut self, coeffs: &Bound<'_, PyList>, c0: i64) -> PyResult<()> {
        self.inner.add(Constraint::eq(to_bigint_vec(coeffs)?, BigInt::from(c0)));
        Ok(())
    }

    pub fn set_param_nonneg(&mut self, i: usize, nonneg: bool) {
        self.inner.param_nonneg[i] = nonneg;
    }
}

#[pyclass]
pub struct PyRelation {
    inner: solve::Relation,
}

#[pymethods]
impl PyRelation {
    pub fn num_pieces(&self) -> usize {
        self.inner.pieces.len()
    }

    pub fn num_empty(&self) -> usize {
        self.inner.empty.len()
    }

    /// String form of piece `i`'s region (a conjunction over parameters and
    /// any context-divs the solve introduced).
    pub fn piece_region(&self, i: usize) -> String {
        self.inner.pieces[i].domain.to_string()
    }

    /// Output `out`'s affine expression for piece `i`, as
    /// `(denominator, [constant, param/div coefficients...])`.
    pub fn piece_out(&self, i: usize, out: usize) -> (String, Vec<String>) {
        let (d, coeffs) = &self.inner.pieces[i].out[out];
        (d.to_string(), coeffs.iter().map(ToString::to_string).collect())
    }

    pub fn __str__(&self) -> String {
        format!("{} feasible piece(s), {} empty region(s)", self.inner.pieces.len(), self.inner.empty.len())
    }

    pub fn __repr__(&self) -> String {
        self.__str__()
    }
}

#[pyfunction]
#[pyo3(signature = (bmap, dom, max=false, cut_budget=None))]
fn partial_lexopt(bmap: &PyBMap, dom: &PyDomain, max: bool, cut_budget: Option<usize>) -> PyResult<PyRelation> {
    let opts = SolveOptions { cut_budget };
    solve::partial_lexopt(&bmap.inner, &dom.inner, max, &opts)
        .map(|inner| PyRelation { inner })
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

#[pymodule]
fn pilp_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyBMap>()?;
    m.add_class::<PyDomain>()?;
    m.add_class::<PyRelation>()?;
    m.add_function(wrap_pyfunction!(partial_lexopt, m)?)?;
    Ok(())
}
