//! loglik_optimizer — argmin-backed maximizer for log-likelihoods.
//!
//! Purpose
//! -------
//! Maximize an objective `ℓ(θ)` with L-BFGS. Callers implement
//! [`LogLikelihood`] and call [`maximize`]; the spectral fit supplies
//! `ℓ = -chi2/2` over its free parameters in internal coordinates.
//!
//! Key behaviors
//! -------------
//! - [`adapter::ArgMinAdapter`] turns `ℓ(θ)` into the argmin cost
//!   `c(θ) = -ℓ(θ)` and falls back to finite differences when no analytic
//!   gradient is provided.
//! - [`builders`] construct L-BFGS with the More–Thuente or Hager–Zhang line
//!   search; [`run::run_lbfgs`] executes it and builds an [`OptimOutcome`].
//! - [`finite_diff`] also provides the Hessian used for parameter errors.
//!
//! Invariants & assumptions
//! ------------------------
//! - Objectives report failures as [`OptError`](crate::optimization::errors::OptError)
//!   values, never panics.
//! - [`OptimOutcome::value`] is `ℓ(θ̂)`, not the cost.
//!
//! Testing notes
//! -------------
//! - Submodule tests cover sign handling, solver wiring, derivative checks
//!   and outcome construction on small quadratics; the integration tests
//!   drive [`maximize`] through full spectral fits.

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
