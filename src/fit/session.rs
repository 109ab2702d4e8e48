//! fit::session — joint spectral fits over several datasets.
//!
//! Purpose
//! -------
//! Own the datasets, the shared flux model, an optional null hypothesis and
//! the declared correction schema, and run the maximum-likelihood fit that
//! ties them together.
//!
//! Key behaviors
//! -------------
//! - Datasets are registered by unique name; their corrections are checked
//!   against the [`CorrectionSchema`].
//! - Functions are passed into dataset evaluation as snapshots, so the
//!   session is the only writer of parameter values.
//! - [`FitSession::fit`] maximizes `−chi2/2` with the session as the
//!   optimizer's data, writes values and errors back and recomputes the
//!   final likelihood with cached predictions.
//! - Accessors that take an index or a dataset name return a neutral value
//!   and log a warning on a miss.
//!
//! Invariants & assumptions
//! ------------------------
//! - The combined parameter vector is `[flux params][correction params]`.
//! - Every registered correction takes exactly the schema's parameters, and
//!   after [`FitSession::set_parameters`] all of them hold the same values.
//! - The likelihood window `[emin, emax]` applies to bin centers.
//!
//! Conventions
//! -----------
//! - `ndof = bins − npar`, counting fixed parameters as well.
//! - `log::debug!` reports fit progress; degraded paths use `log::warn!`.
use std::path::Path;

use ndarray::Array2;

use crate::{
    dataset::{
        data::{Dataset, FluxPoints},
        likelihood::LikelihoodSummary,
        null::NullCounts,
    },
    fit::{
        collection::{DatasetCollection, DatasetEntry},
        layout::ParameterLayout,
        objective::FitObjective,
        options::FitOptions,
        schema::CorrectionSchema,
        stats::FitStatistics,
    },
    inference::hessian::standard_errors,
    optimization::loglik_optimizer::{Theta, maximize},
    spectrum::{
        errors::{SpecError, SpecResult},
        function::SpecFunction,
    },
    statistical_tests::{intervals::CountInterval, poisson_chance::{pchance_to_sigma, poisson_chance}},
};

/// Likelihood window of a new session.
pub const DEFAULT_WINDOW: (f64, f64) = (17.0, 21.0);

/// Defaults of [`FitSession::set_emin_emax`] callers usually want.
pub const DEFAULT_EMIN: f64 = 18.8;
pub const DEFAULT_EMAX: f64 = 21.0;

/// Result of [`FitSession::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutcome {
    pub names: Vec<String>,
    pub parameters: Vec<f64>,
    /// 0 for fixed parameters and when errors were not computed.
    pub errors: Vec<f64>,
    pub chi2: f64,
    pub ndof: i64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub likelihood: LikelihoodSummary,
    pub covariance: Option<Array2<f64>>,
}

/// Null-hypothesis counts with their Poisson chance probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NullSignificance {
    pub counts: NullCounts,
    pub pchance: f64,
    pub sigma: f64,
}

#[derive(Debug, Clone)]
pub struct FitSession {
    datasets: DatasetCollection,
    schema: CorrectionSchema,
    flux: Option<SpecFunction>,
    flux_e3j: Option<SpecFunction>,
    null: Option<SpecFunction>,
    null_e3j: Option<SpecFunction>,
    log10en_min: f64,
    log10en_max: f64,
    options: FitOptions,
    likelihood: LikelihoodSummary,
    null_counts: NullCounts,
    outcome: Option<FitOutcome>,
}

impl Default for FitSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FitSession {
    pub fn new() -> Self {
        Self::with_options(FitOptions::default())
    }

    pub fn with_options(options: FitOptions) -> Self {
        FitSession {
            datasets: DatasetCollection::new(),
            schema: CorrectionSchema::none(),
            flux: None,
            flux_e3j: None,
            null: None,
            null_e3j: None,
            log10en_min: DEFAULT_WINDOW.0,
            log10en_max: DEFAULT_WINDOW.1,
            options,
            likelihood: LikelihoodSummary::default(),
            null_counts: NullCounts::default(),
            outcome: None,
        }
    }

    // ---- Datasets ----

    /// Register `dataset` with an optional energy-scale correction.
    ///
    /// # Errors
    /// - `SpecError::SchemaMismatch` when the correction does not take the
    ///   declared correction parameters.
    /// - `SpecError::DuplicateDataset` when the name is taken.
    pub fn add(&mut self, dataset: Dataset, correction: Option<SpecFunction>) -> SpecResult<()> {
        self.schema.validate(dataset.name(), correction.as_ref())?;
        log::debug!("adding dataset '{}' with {} bins", dataset.name(), dataset.len());
        self.datasets.insert(DatasetEntry { dataset, correction })?;
        self.outcome = None;
        Ok(())
    }

    /// Build a dataset from columns (full log bin sizes) and register it.
    #[allow(clippy::too_many_arguments)]
    pub fn add_arrays(
        &mut self, name: &str, title: &str, log10en: Vec<f64>, bin_size: Vec<f64>,
        nevents: Vec<f64>, exposure: Vec<f64>, correction: Option<SpecFunction>,
    ) -> SpecResult<()> {
        let ds = Dataset::from_bin_sizes(name, title, log10en, bin_size, nevents, exposure)?;
        self.add(ds, correction)
    }

    /// Read a four-column table and register it.
    pub fn add_table_file(
        &mut self, name: &str, title: &str, path: impl AsRef<Path>,
        correction: Option<SpecFunction>,
    ) -> SpecResult<()> {
        let ds = Dataset::from_table_file(name, title, path)?;
        self.add(ds, correction)
    }

    /// Declare the correction parameters.
    ///
    /// # Errors
    /// `SpecError::SchemaMismatch` if an already registered correction does
    /// not match; the previous schema is kept.
    pub fn set_correction_schema(&mut self, schema: CorrectionSchema) -> SpecResult<()> {
        for entry in self.datasets.iter() {
            schema.validate(entry.dataset.name(), entry.correction.as_ref())?;
        }
        self.schema = schema;
        self.outcome = None;
        Ok(())
    }

    /// Restrict every dataset to bins with `lo ≤ x ≤ hi`.
    pub fn select_energy_range(&mut self, lo: f64, hi: f64) {
        for entry in self.datasets.iter_mut() {
            entry.dataset.select_energy_range(lo, hi);
        }
        self.outcome = None;
    }

    // ---- Functions ----

    /// Install the flux model; the E³J companion is derived unless given.
    pub fn set_flux_fun(&mut self, flux: SpecFunction, e3j: Option<SpecFunction>) {
        self.flux_e3j = Some(e3j.unwrap_or_else(|| flux.e3j_companion()));
        self.flux = Some(flux);
        self.outcome = None;
    }

    /// Install the null-hypothesis flux; the E³J companion is derived unless given.
    pub fn set_null_fun(&mut self, null: SpecFunction, e3j: Option<SpecFunction>) {
        self.null_e3j = Some(e3j.unwrap_or_else(|| null.e3j_companion()));
        self.null = Some(null);
    }

    pub fn clear_null_fun(&mut self) {
        self.null = None;
        self.null_e3j = None;
    }

    /// Likelihood window on bin centers.
    ///
    /// # Errors
    /// `SpecError::InvalidArgument` when `emin > emax` or either is not finite.
    pub fn set_emin_emax(&mut self, emin: f64, emax: f64) -> SpecResult<()> {
        if !emin.is_finite() {
            return Err(SpecError::InvalidArgument { name: "emin", value: emin, reason: "must be finite" });
        }
        if !emax.is_finite() || emax < emin {
            return Err(SpecError::InvalidArgument {
                name: "emax",
                value: emax,
                reason: "must be finite and not below emin",
            });
        }
        self.log10en_min = emin;
        self.log10en_max = emax;
        self.outcome = None;
        Ok(())
    }

    pub fn set_options(&mut self, options: FitOptions) {
        self.options = options;
    }

    // ---- Parameters ----

    /// Total number of fit parameters, fixed ones included.
    pub fn npar(&self) -> usize {
        self.flux.as_ref().map_or(0, SpecFunction::n_params) + self.schema.len()
    }

    /// Current model vector `[flux values][correction values]`.
    pub fn current_parameters(&self) -> Vec<f64> {
        let mut params = self.flux.as_ref().map_or_else(Vec::new, |f| f.values().to_vec());
        params.extend_from_slice(self.schema.values());
        params
    }

    /// Current step sizes, or fitted errors after a fit.
    pub fn current_errors(&self) -> Vec<f64> {
        let mut errors = self.flux.as_ref().map_or_else(Vec::new, |f| f.errors().to_vec());
        errors.extend_from_slice(self.schema.steps());
        errors
    }

    /// Distribute a combined vector to the flux, its companion and every
    /// correction.
    ///
    /// # Errors
    /// `SpecError::NoFluxFunction`, or `ParameterLengthMismatch` when
    /// `params.len() != npar()`.
    pub fn set_parameters(&mut self, params: &[f64]) -> SpecResult<()> {
        let n_flux = self.flux.as_ref().ok_or(SpecError::NoFluxFunction)?.n_params();
        self.check_length(params)?;
        let (flux_params, corr_params) = params.split_at(n_flux);
        for f in [self.flux.as_mut(), self.flux_e3j.as_mut()].into_iter().flatten() {
            f.set_values(flux_params)?;
        }
        self.schema.set_values(corr_params);
        for entry in self.datasets.iter_mut() {
            if let Some(c) = entry.correction.as_mut() {
                c.set_values(corr_params)?;
            }
        }
        Ok(())
    }

    // ---- Likelihood ----

    /// Deviance sums of all datasets at the model vector `params`, without
    /// touching any state.
    ///
    /// # Errors
    /// `SpecError::NoFluxFunction`, `ParameterLengthMismatch`, or the first
    /// dataset error.
    pub fn evaluate(&self, params: &[f64]) -> SpecResult<LikelihoodSummary> {
        let flux = self.flux.as_ref().ok_or(SpecError::NoFluxFunction)?;
        self.check_length(params)?;
        let (flux_params, corr_params) = params.split_at(flux.n_params());
        let flux_snap = flux.snapshot_with(flux_params);
        let mut summary = LikelihoodSummary::default();
        for entry in self.datasets.iter() {
            let corr_snap = entry.correction.as_ref().map(|c| c.snapshot_with(corr_params));
            summary += entry.dataset.calc_log_likelihood(
                &flux_snap,
                corr_snap.as_ref(),
                self.log10en_min,
                self.log10en_max,
            )?;
        }
        Ok(summary)
    }

    /// Deviance sums at the current parameters; predictions are cached in
    /// every dataset and the sums kept for [`FitSession::fit_stats`].
    pub fn calc_log_likelihood(&mut self) -> SpecResult<LikelihoodSummary> {
        let summary = self.evaluate(&self.current_parameters())?;
        if let Some(flux) = self.flux.as_ref() {
            let flux_snap = flux.snapshot();
            for entry in self.datasets.iter_mut() {
                let corr_snap = entry.correction.as_ref().map(|c| c.snapshot());
                entry.dataset.cache_predictions(&flux_snap, corr_snap.as_ref());
            }
        }
        self.likelihood = summary;
        Ok(summary)
    }

    // ---- Fitting ----

    /// Fit the flux and correction parameters to all datasets.
    ///
    /// # Errors
    /// - `SpecError::NoDatasets` / `NoFluxFunction` before any optimizer is
    ///   built.
    /// - Optimizer and model errors raised during the fit.
    ///
    /// A run that stops without converging is not an error; see
    /// [`FitOutcome::converged`].
    pub fn fit(&mut self) -> SpecResult<FitOutcome> {
        if self.datasets.is_empty() {
            return Err(SpecError::NoDatasets);
        }
        let flux = self.flux.as_ref().ok_or(SpecError::NoFluxFunction)?;
        let layout = ParameterLayout::new(flux, &self.schema);
        let objective = FitObjective::new(self, layout)?;
        let layout = objective.layout();
        log::debug!(
            "fitting {} parameters ({} free) to {} datasets",
            layout.len(),
            layout.n_free(),
            self.datasets.len()
        );

        let (theta_hat, converged, status, iterations) = if layout.n_free() == 0 {
            (Theta::zeros(0), true, "No free parameters".to_string(), 0)
        } else {
            let out = maximize(&objective, layout.initial_theta(), &*self, &self.options.mle_opts)?;
            (out.theta_hat, out.converged, out.status, out.iterations)
        };
        if !converged {
            log::warn!("fit did not converge: {status}");
        }
        let params = layout.to_external(&theta_hat);

        let covariance = if self.options.hessian_errors && layout.n_free() > 0 {
            match objective.covariance(&theta_hat, &*self) {
                Ok(cov_u) => Some(layout.external_covariance(&theta_hat, &cov_u)),
                Err(err) => {
                    log::warn!("parameter errors unavailable: {err}");
                    None
                }
            }
        } else {
            None
        };
        let errors = covariance
            .as_ref()
            .map_or_else(|| vec![0.0; params.len()], |c| standard_errors(c).to_vec());
        let names = layout.names();

        self.set_parameters(&params)?;
        self.write_back_errors(&errors)?;
        let likelihood = self.calc_log_likelihood()?;
        let outcome = FitOutcome {
            names,
            chi2: likelihood.all.deviance,
            ndof: likelihood.all.bins as i64 - params.len() as i64,
            parameters: params,
            errors,
            converged,
            status,
            iterations,
            likelihood,
            covariance,
        };
        log::debug!("fit finished: chi2 = {} / ndof = {}", outcome.chi2, outcome.ndof);
        self.outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// The last fit, if the session has not changed structurally since.
    pub fn outcome(&self) -> Option<&FitOutcome> {
        self.outcome.as_ref()
    }

    // ---- Null hypothesis ----

    /// Expected vs observed counts under the null flux, summed over datasets.
    pub fn eval_null(&mut self) -> NullCounts {
        let null = self.null.as_ref().map(|f| f.snapshot());
        let mut counts = NullCounts::default();
        for entry in self.datasets.iter_mut() {
            let corr = entry.correction.as_ref().map(|c| c.snapshot());
            counts += entry.dataset.eval_null(null.as_ref(), corr.as_ref());
        }
        self.null_counts = counts;
        counts
    }

    /// [`FitSession::eval_null`] plus the Poisson chance probability of the
    /// observed total, also in sigma units.
    pub fn null_significance(&mut self) -> SpecResult<NullSignificance> {
        let counts = self.eval_null();
        let observed = counts.observed.max(0.0).round() as u64;
        let pchance = poisson_chance(observed, counts.expected)?;
        Ok(NullSignificance { counts, pchance, sigma: pchance_to_sigma(pchance) })
    }

    pub fn null_counts(&self) -> NullCounts {
        self.null_counts
    }

    // ---- Accessors ----

    /// Current value of parameter `i`; 0 with a warning when out of range.
    pub fn parameter(&self, i: usize) -> f64 {
        self.lookup(&self.current_parameters(), i)
    }

    /// Current error of parameter `i`; 0 with a warning when out of range.
    pub fn par_error(&self, i: usize) -> f64 {
        self.lookup(&self.current_errors(), i)
    }

    /// Deviance of the last fit, 0 before one.
    pub fn chisquare(&self) -> f64 {
        self.outcome.as_ref().map_or(0.0, |o| o.chi2)
    }

    /// Degrees of freedom of the last fit, 0 before one.
    pub fn ndf(&self) -> i64 {
        self.outcome.as_ref().map_or(0, |o| o.ndof)
    }

    /// Deviance sums of the last [`FitSession::calc_log_likelihood`].
    pub fn likelihood(&self) -> LikelihoodSummary {
        self.likelihood
    }

    pub fn fit_stats(&self) -> FitStatistics {
        FitStatistics::new(&self.likelihood, self.npar())
    }

    pub fn flux_at(&self, i: usize) -> Option<&Dataset> {
        let found = self.datasets.at(i).map(|e| &e.dataset);
        if found.is_none() {
            log::warn!("dataset index {i} out of range (have {})", self.datasets.len());
        }
        found
    }

    pub fn flux_named(&self, name: &str) -> Option<&Dataset> {
        let found = self.datasets.get(name).map(|e| &e.dataset);
        if found.is_none() {
            log::warn!("no dataset named '{name}'");
        }
        found
    }

    /// Flux points of dataset `name` with its own correction applied.
    pub fn flux_points(&self, name: &str, interval: &dyn CountInterval) -> Option<FluxPoints> {
        let entry = self.datasets.get(name);
        if entry.is_none() {
            log::warn!("no dataset named '{name}'");
        }
        let entry = entry?;
        let corr = entry.correction.as_ref().map(|c| c.snapshot());
        Some(entry.dataset.flux_points(corr.as_ref(), interval))
    }

    pub fn datasets(&self) -> &DatasetCollection {
        &self.datasets
    }

    pub fn correction_schema(&self) -> &CorrectionSchema {
        &self.schema
    }

    pub fn flux_fun(&self) -> Option<&SpecFunction> {
        self.flux.as_ref()
    }

    pub fn flux_e3j(&self) -> Option<&SpecFunction> {
        self.flux_e3j.as_ref()
    }

    pub fn null_fun(&self) -> Option<&SpecFunction> {
        self.null.as_ref()
    }

    pub fn null_e3j(&self) -> Option<&SpecFunction> {
        self.null_e3j.as_ref()
    }

    pub fn emin_emax(&self) -> (f64, f64) {
        (self.log10en_min, self.log10en_max)
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    // ---- Helper methods ----

    fn check_length(&self, params: &[f64]) -> SpecResult<()> {
        if params.len() != self.npar() {
            return Err(SpecError::ParameterLengthMismatch {
                expected: self.npar(),
                found: params.len(),
            });
        }
        Ok(())
    }

    fn lookup(&self, values: &[f64], i: usize) -> f64 {
        match values.get(i) {
            Some(&v) => v,
            None => {
                log::warn!("parameter index {i} out of range (have {})", values.len());
                0.0
            }
        }
    }

    /// Store fitted errors as the new step sizes. A zero error keeps the
    /// previous step so that an unavailable error never fixes a parameter.
    fn write_back_errors(&mut self, errors: &[f64]) -> SpecResult<()> {
        let steps: Vec<f64> = self
            .current_errors()
            .iter()
            .zip(errors)
            .map(|(&step, &err)| if step != 0.0 && err > 0.0 { err } else { step })
            .collect();
        let n_flux = self.flux.as_ref().map_or(0, SpecFunction::n_params);
        let (flux_steps, corr_steps) = steps.split_at(n_flux);
        for f in [self.flux.as_mut(), self.flux_e3j.as_mut()].into_iter().flatten() {
            f.set_errors(flux_steps)?;
        }
        self.schema.set_steps(corr_steps);
        for entry in self.datasets.iter_mut() {
            if let Some(c) = entry.correction.as_mut() {
                c.set_errors(corr_steps)?;
            }
        }
        Ok(())
    }
}
