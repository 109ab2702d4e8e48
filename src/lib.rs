//! specfit — joint binned-Poisson fits of broken power law spectra.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes the fit session to Python via the `_specfit` extension module
//! when the `python-bindings` feature is enabled.
//!
//! Key behaviors
//! -------------
//! - Re-export the core modules: `spectrum` (models and corrections),
//!   `dataset` (binned counts and their likelihood), `fit` (the session),
//!   `optimization` / `inference` (L-BFGS and covariance) and
//!   `statistical_tests` (Poisson chance and count intervals).
//! - Define the `SpectrumFit` and `FitResult` Python classes plus the
//!   Poisson chance helpers, grouped into `specfit.fit` and
//!   `specfit.statistical_tests`.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work is done by the inner modules; this file only
//!   converts inputs, builds options and maps errors to `PyErr`.
//!
//! Conventions
//! -----------
//! - Energies are `log10(E/eV)` throughout, bin sizes passed from Python are
//!   full log widths (as in the four-column table).
//! - Errors from core Rust code are converted to `ValueError` at the PyO3
//!   boundary.

pub mod dataset;
pub mod fit;
pub mod inference;
pub mod optimization;
pub mod spectrum;
pub mod statistical_tests;
pub mod utils;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    fit::{FitOptions, FitOutcome, FitSession, ScanMode, schema::CorrectionSchema},
    spectrum::{
        bpl::BrokenPowerLaw,
        errors::SpecError,
        function::SpecFunction,
        presets::{combined_correction, correction_preset, flux_preset, shoulder_null},
    },
    utils::{extract_f64_vec, extract_mle_opts},
};

/// SpectrumFit — Python-facing wrapper around a [`FitSession`].
///
/// Purpose
/// -------
/// Let Python code build a session from a flux preset or a custom broken
/// power law, register datasets from arrays or table files, fit, scan and
/// query the null-hypothesis significance.
///
/// Parameters
/// ----------
/// Constructed from Python via `SpectrumFit(flux="fJ3B_18", ...)`:
/// - `flux`: name of a flux preset (`fJ2B_18`, `fJ3B_18`, `fJ1B_19`,
///   `fJ2B_19`).
/// - `tol_grad`, `tol_cost`, `max_iter`, `line_searcher`, `lbfgs_mem`,
///   `verbose`: optimizer options, validated as in [`MLEOptions`].
/// - `scan_mode`: `"fixed"` (default) or `"profile"`.
/// - `hessian_errors`: derive parameter errors after the fit.
///
/// Notes
/// -----
/// - Corrections are given as `(constant, nonlinear)` preset names and
///   combined as `1 + constant + nonlinear`. Declare the schema with
///   `declare_correction` before adding corrected datasets.
///
/// [`MLEOptions`]: crate::optimization::loglik_optimizer::MLEOptions
#[cfg(feature = "python-bindings")]
#[pyclass(module = "specfit.fit")]
pub struct SpectrumFit {
    pub inner: FitSession,
}

#[cfg(feature = "python-bindings")]
#[allow(clippy::too_many_arguments)]
fn build_fit_options(
    tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    line_searcher: Option<&str>, lbfgs_mem: Option<usize>, verbose: bool,
    scan_mode: Option<&str>, hessian_errors: bool,
) -> PyResult<FitOptions> {
    let mle_opts = extract_mle_opts(tol_grad, tol_cost, max_iter, line_searcher, verbose, lbfgs_mem)?;
    let scan_mode = match scan_mode {
        Some(name) => name.parse::<ScanMode>().map_err(PyValueError::new_err)?,
        None => ScanMode::Fixed,
    };
    Ok(FitOptions { mle_opts, scan_mode, hessian_errors })
}

#[cfg(feature = "python-bindings")]
fn correction_from_presets(constant: &str, nonlinear: &str) -> PyResult<SpecFunction> {
    let lookup = |name: &str| {
        correction_preset(name)
            .ok_or_else(|| PyValueError::new_err(format!("unknown correction preset '{name}'")))
    };
    Ok(combined_correction(&lookup(constant)?, &lookup(nonlinear)?))
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl SpectrumFit {
    #[new]
    #[pyo3(
        signature = (
            flux = "fJ3B_18",
            tol_grad = None,
            tol_cost = None,
            max_iter = None,
            line_searcher = None,
            lbfgs_mem = None,
            verbose = false,
            scan_mode = None,
            hessian_errors = true,
        ),
        text_signature = "(flux='fJ3B_18', /, tol_grad=None, tol_cost=None, max_iter=None, \
                          line_searcher=None, lbfgs_mem=None, verbose=False, scan_mode=None, \
                          hessian_errors=True)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        flux: &str, tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
        line_searcher: Option<&str>, lbfgs_mem: Option<usize>, verbose: bool,
        scan_mode: Option<&str>, hessian_errors: bool,
    ) -> PyResult<Self> {
        let bpl = flux_preset(flux)
            .ok_or_else(|| PyValueError::new_err(format!("unknown flux preset '{flux}'")))?;
        let options = build_fit_options(
            tol_grad,
            tol_cost,
            max_iter,
            line_searcher,
            lbfgs_mem,
            verbose,
            scan_mode,
            hessian_errors,
        )?;
        let mut inner = FitSession::with_options(options);
        inner.set_flux_fun(bpl.into_function(), None);
        Ok(SpectrumFit { inner })
    }

    /// Session with a custom broken power law given by comma-separated lists.
    #[staticmethod]
    #[pyo3(
        signature = (
            name,
            n_breaks,
            variant,
            scale,
            xmin,
            xmax,
            names,
            values,
            errors,
            tol_grad = None,
            tol_cost = None,
            max_iter = None,
            line_searcher = None,
            lbfgs_mem = None,
            verbose = false,
            scan_mode = None,
            hessian_errors = true,
        ),
        text_signature = "(name, n_breaks, variant, scale, xmin, xmax, names, values, errors, /, \
                          tol_grad=None, tol_cost=None, max_iter=None, line_searcher=None, \
                          lbfgs_mem=None, verbose=False, scan_mode=None, hessian_errors=True)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn custom(
        name: &str, n_breaks: i32, variant: &str, scale: f64, xmin: f64, xmax: f64, names: &str,
        values: &str, errors: &str, tol_grad: Option<f64>, tol_cost: Option<f64>,
        max_iter: Option<usize>, line_searcher: Option<&str>, lbfgs_mem: Option<usize>,
        verbose: bool, scan_mode: Option<&str>, hessian_errors: bool,
    ) -> PyResult<Self> {
        let bpl = BrokenPowerLaw::from_cs(
            name, n_breaks, variant, scale, xmin, xmax, names, values, errors,
        )?;
        let options = build_fit_options(
            tol_grad,
            tol_cost,
            max_iter,
            line_searcher,
            lbfgs_mem,
            verbose,
            scan_mode,
            hessian_errors,
        )?;
        let mut inner = FitSession::with_options(options);
        inner.set_flux_fun(bpl.into_function(), None);
        Ok(SpectrumFit { inner })
    }

    /// Declare the shared correction parameters from two preset names.
    #[pyo3(text_signature = "(self, constant, nonlinear)")]
    pub fn declare_correction(&mut self, constant: &str, nonlinear: &str) -> PyResult<()> {
        let corr = correction_from_presets(constant, nonlinear)?;
        self.inner.set_correction_schema(CorrectionSchema::from_function(&corr))?;
        Ok(())
    }

    #[pyo3(
        signature = (name, log10en, bin_size, nevents, exposure, title = "", correction = None),
        text_signature = "(self, name, log10en, bin_size, nevents, exposure, /, title='', \
                          correction=None)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn add_arrays<'py>(
        &mut self, py: Python<'py>, name: &str, log10en: &Bound<'py, PyAny>,
        bin_size: &Bound<'py, PyAny>, nevents: &Bound<'py, PyAny>, exposure: &Bound<'py, PyAny>,
        title: &str, correction: Option<(String, String)>,
    ) -> PyResult<()> {
        let correction = match correction {
            Some((c, n)) => Some(correction_from_presets(&c, &n)?),
            None => None,
        };
        self.inner.add_arrays(
            name,
            title,
            extract_f64_vec(py, log10en, "log10en")?,
            extract_f64_vec(py, bin_size, "bin_size")?,
            extract_f64_vec(py, nevents, "nevents")?,
            extract_f64_vec(py, exposure, "exposure")?,
            correction,
        )?;
        Ok(())
    }

    #[pyo3(
        signature = (name, path, title = "", correction = None),
        text_signature = "(self, name, path, /, title='', correction=None)"
    )]
    pub fn add_table_file(
        &mut self, name: &str, path: &str, title: &str, correction: Option<(String, String)>,
    ) -> PyResult<()> {
        let correction = match correction {
            Some((c, n)) => Some(correction_from_presets(&c, &n)?),
            None => None,
        };
        self.inner.add_table_file(name, title, path, correction)?;
        Ok(())
    }

    #[pyo3(
        signature = (emin = 18.8, emax = 21.0),
        text_signature = "(self, /, emin=18.8, emax=21.0)"
    )]
    pub fn set_emin_emax(&mut self, emin: f64, emax: f64) -> PyResult<()> {
        self.inner.set_emin_emax(emin, emax)?;
        Ok(())
    }

    #[pyo3(text_signature = "(self, lo, hi)")]
    pub fn select_energy_range(&mut self, lo: f64, hi: f64) {
        self.inner.select_energy_range(lo, hi);
    }

    #[pyo3(text_signature = "(self, values)")]
    pub fn set_parameters<'py>(
        &mut self, py: Python<'py>, values: &Bound<'py, PyAny>,
    ) -> PyResult<()> {
        self.inner.set_parameters(&extract_f64_vec(py, values, "values")?)?;
        Ok(())
    }

    pub fn fit(&mut self) -> PyResult<FitResult> {
        let outcome = self.inner.fit()?;
        Ok(FitResult { inner: outcome })
    }

    #[pyo3(
        signature = (index, n_points = 20, lo = 0.0, hi = 0.0, calc_deltas = false),
        text_signature = "(self, index, /, n_points=20, lo=0.0, hi=0.0, calc_deltas=False)"
    )]
    pub fn scan_parameter(
        &self, index: usize, n_points: usize, lo: f64, hi: f64, calc_deltas: bool,
    ) -> PyResult<(Vec<f64>, Vec<f64>)> {
        let scan = self.inner.scan_parameter(index, n_points, lo, hi, calc_deltas)?;
        Ok((scan.values, scan.chi2))
    }

    /// Use the "no feature past the shoulder" hypothesis as the null flux.
    pub fn set_shoulder_null(&mut self) -> PyResult<()> {
        let flux = self.inner.flux_fun().ok_or(SpecError::NoFluxFunction)?;
        let null = shoulder_null(flux).ok_or_else(|| {
            PyValueError::new_err("flux model has no logEshld/logEgzk breaks")
        })?;
        self.inner.set_null_fun(null, None);
        Ok(())
    }

    /// `(expected, observed, pchance, sigma)` under the null flux.
    pub fn null_significance(&mut self) -> PyResult<(f64, f64, f64, f64)> {
        let sig = self.inner.null_significance()?;
        Ok((sig.counts.expected, sig.counts.observed, sig.pchance, sig.sigma))
    }

    pub fn parameter(&self, index: usize) -> f64 {
        self.inner.parameter(index)
    }

    pub fn par_error(&self, index: usize) -> f64 {
        self.inner.par_error(index)
    }

    #[getter]
    pub fn parameters(&self) -> Vec<f64> {
        self.inner.current_parameters()
    }

    #[getter]
    pub fn chisquare(&self) -> f64 {
        self.inner.chisquare()
    }

    #[getter]
    pub fn ndf(&self) -> i64 {
        self.inner.ndf()
    }

    #[getter]
    pub fn npar(&self) -> usize {
        self.inner.npar()
    }
}

/// FitResult — outcome of `SpectrumFit.fit()`.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "specfit.fit")]
pub struct FitResult {
    pub inner: FitOutcome,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl FitResult {
    #[getter]
    pub fn names(&self) -> Vec<String> {
        self.inner.names.clone()
    }

    #[getter]
    pub fn parameters(&self) -> Vec<f64> {
        self.inner.parameters.clone()
    }

    #[getter]
    pub fn errors(&self) -> Vec<f64> {
        self.inner.errors.clone()
    }

    #[getter]
    pub fn chi2(&self) -> f64 {
        self.inner.chi2
    }

    #[getter]
    pub fn ndof(&self) -> i64 {
        self.inner.ndof
    }

    #[getter]
    pub fn converged(&self) -> bool {
        self.inner.converged
    }

    #[getter]
    pub fn status(&self) -> String {
        self.inner.status.clone()
    }

    #[getter]
    pub fn iterations(&self) -> usize {
        self.inner.iterations
    }

    /// Row-major covariance, empty when errors were not computed.
    #[getter]
    pub fn covariance(&self) -> Vec<Vec<f64>> {
        match &self.inner.covariance {
            Some(cov) => cov.rows().into_iter().map(|r| r.to_vec()).collect(),
            None => Vec::new(),
        }
    }
}

/// One-sided Poisson chance probability of `n_observed` given `n_expected`.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(name = "poisson_chance", text_signature = "(n_observed, n_expected)")]
fn py_poisson_chance(n_observed: u64, n_expected: f64) -> PyResult<f64> {
    Ok(statistical_tests::poisson_chance(n_observed, n_expected)?)
}

#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(name = "pchance_to_sigma", text_signature = "(pchance)")]
fn py_pchance_to_sigma(pchance: f64) -> f64 {
    statistical_tests::pchance_to_sigma(pchance)
}

#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(name = "sigma_to_pchance", text_signature = "(sigma)")]
fn py_sigma_to_pchance(sigma: f64) -> f64 {
    statistical_tests::sigma_to_pchance(sigma)
}

/// Module initializer for `_specfit`.
///
/// Creates the `fit` and `statistical_tests` submodules, attaches them to
/// the parent and registers them in `sys.modules` so that dotted imports
/// work.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _specfit<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let fit_mod = PyModule::new(_py, "fit")?;
    let statistical_tests_mod = PyModule::new(_py, "statistical_tests")?;
    fit_module(_py, m, &fit_mod)?;
    statistical_tests_module(_py, m, &statistical_tests_mod)?;

    // Manually add submodules into sys.modules to allow for dot notation.
    _py.import("sys")?.getattr("modules")?.set_item("specfit.fit", fit_mod)?;
    _py.import("sys")?
        .getattr("modules")?
        .set_item("specfit.statistical_tests", statistical_tests_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn fit_module<'py>(
    _py: Python, specfit: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<SpectrumFit>()?;
    m.add_class::<FitResult>()?;
    specfit.add_submodule(m)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn statistical_tests_module<'py>(
    _py: Python, specfit: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_poisson_chance, m)?)?;
    m.add_function(wrap_pyfunction!(py_pchance_to_sigma, m)?)?;
    m.add_function(wrap_pyfunction!(py_sigma_to_pchance, m)?)?;
    specfit.add_submodule(m)?;
    Ok(())
}
