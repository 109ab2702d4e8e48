//! Objective trait, optimizer configuration and the normalized outcome.
//!
//! - [`LogLikelihood`]: implemented by anything that can be maximized; the
//!   spectral fit implements it for its objective with the fit session as
//!   `Data`.
//! - [`MLEOptions`] / [`Tolerances`]: validated solver configuration.
//! - [`LineSearcher`]: line search used inside L-BFGS.
//! - [`OptimOutcome`]: what [`maximize`](super::maximize) hands back.
//!
//! A binned-Poisson fit minimizes `chi2 = Σ deviance`; it is exposed here as
//! the log-likelihood `ℓ(θ) = -chi2/2` and the adapter turns that back into
//! the cost `c(θ) = -ℓ(θ)`.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        Cost, FnEvalMap, Grad, Theta,
        validation::{validate_theta_hat, validate_value, verify_tol_cost, verify_tol_grad},
    },
};
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;
use std::str::FromStr;

/// Objective maximized by the optimizer.
///
/// - `value(θ, data)` returns `ℓ(θ)`; model failures come back as
///   `OptError` values (for the spectral fit, `OptError::Model`).
/// - `check(θ, data)` runs once before the solver is built.
/// - `grad(θ, data)` returns `∇ℓ(θ)`. The default reports
///   `GradientNotImplemented`, which switches the adapter to finite
///   differences.
pub trait LogLikelihood {
    type Data: 'static;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    fn grad(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Line search used inside L-BFGS.
///
/// Parses case-insensitively from `"MoreThuente"` or `"HagerZhang"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Solver configuration.
///
/// Default: `tol_grad = 1e-6`, no cost tolerance, 300 iterations,
/// More–Thuente, quiet, L-BFGS memory of
/// [`DEFAULT_LBFGS_MEM`](super::types::DEFAULT_LBFGS_MEM).
#[derive(Debug, Clone, PartialEq)]
pub struct MLEOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    /// Attach the slog observer (feature `obs_slog`) and log the start point.
    pub verbose: bool,
    pub lbfgs_mem: Option<usize>,
}

impl MLEOptions {
    /// Errors
    /// ------
    /// - `OptError::InvalidLBFGSMem` when `lbfgs_mem == Some(0)`.
    pub fn new(
        tols: Tolerances, line_searcher: LineSearcher, verbose: bool, lbfgs_mem: Option<usize>,
    ) -> OptResult<Self> {
        if let Some(0) = lbfgs_mem {
            return Err(OptError::InvalidLBFGSMem {
                mem: 0,
                reason: "L-BFGS memory must be greater than zero.",
            });
        }
        Ok(Self { tols, line_searcher, verbose, lbfgs_mem })
    }
}

impl Default for MLEOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances::default(),
            line_searcher: LineSearcher::MoreThuente,
            verbose: false,
            lbfgs_mem: None,
        }
    }
}

/// Stopping rules; at least one must be set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// Errors
    /// ------
    /// - `OptError::NoTolerancesProvided` if all three are `None`.
    /// - `OptError::InvalidTolGrad` / `InvalidTolCost` for non-finite or
    ///   non-positive tolerances.
    /// - `OptError::InvalidMaxIter` if `max_iter == Some(0)`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        if let Some(0) = max_iter {
            return Err(OptError::InvalidMaxIter {
                max_iter: 0,
                reason: "Maximum iterations must be greater than zero.",
            });
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self { tol_grad: Some(1e-6), tol_cost: None, max_iter: Some(300) }
    }
}

/// Result of [`maximize`](super::maximize).
///
/// - `value` is the best log-likelihood `ℓ(θ̂)`, not the cost.
/// - `converged` is `false` when the solver did not terminate or only
///   stopped because it ran out of iterations; `status` keeps argmin's
///   wording either way.
/// - `fn_evals` carries argmin's counters (`cost_count`, `gradient_count`).
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// Build a validated outcome from raw solver state.
    ///
    /// Errors
    /// ------
    /// - `OptError::MissingThetaHat` / `InvalidThetaHat` from the estimate.
    /// - `OptError::NonFiniteCost` when `value` is not finite.
    pub fn new(
        theta_hat_opt: Option<Theta>, value: f64, termination: TerminationStatus,
        iterations: u64, fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let (converged, status) = match termination {
            TerminationStatus::NotTerminated => (false, "Not terminated".to_string()),
            TerminationStatus::Terminated(TerminationReason::MaxItersReached) => {
                (false, format!("{termination:?}"))
            }
            _ => (true, format!("{termination:?}")),
        };
        let grad_norm = grad.map(|g| g.l2_norm());
        Ok(Self {
            theta_hat,
            value,
            converged,
            status,
            iterations: iterations as usize,
            fn_evals,
            grad_norm,
        })
    }
}
