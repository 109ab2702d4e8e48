//! Small helpers shared by the table writer and the Python bindings.
#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    optimization::loglik_optimizer::traits::{LineSearcher, MLEOptions, Tolerances},
    spectrum::errors::SpecError,
};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
};

/// Scientific notation with a signed, at least two-digit exponent, as C's
/// `%e` prints it: `format_c_exp(1234.5, 2) == "1.23e+03"`.
pub fn format_c_exp(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return format!("{value}");
    }
    let s = format!("{value:.precision$e}");
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => s,
    }
}

#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64",
        )
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Copy a Python array-like into a `Vec<f64>`.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_vec<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>, what: &str,
) -> PyResult<Vec<f64>> {
    let arr = extract_f64_array(py, raw_data)?;
    let slice = arr.as_slice().map_err(|_| {
        PyValueError::new_err(format!("{what} must be a 1-D contiguous float64 array or sequence"))
    })?;
    Ok(slice.to_vec())
}

#[cfg(feature = "python-bindings")]
pub fn extract_mle_opts(
    tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    line_searcher: Option<&str>, verbose: bool, lbfgs_mem: Option<usize>,
) -> PyResult<MLEOptions> {
    use std::str::FromStr;

    // OptResult<_> -> SpecError -> PyErr
    let tols = Tolerances::new(tol_grad, tol_cost, max_iter).map_err(SpecError::from)?;
    let ls = match line_searcher {
        Some(name) => LineSearcher::from_str(name).map_err(SpecError::from)?,
        None => LineSearcher::MoreThuente,
    };
    let opts = MLEOptions::new(tols, ls, verbose, lbfgs_mem).map_err(SpecError::from)?;
    Ok(opts)
}
