//! loglik_optimizer::builders — L-BFGS solver construction.
//!
//! Purpose
//! -------
//! Build L-BFGS solvers for either line search and apply the optional
//! gradient and cost tolerances from [`MLEOptions`]. Starting parameters and
//! the iteration cap are runtime concerns handled by
//! [`run_lbfgs`](super::run::run_lbfgs).
//!
//! Invariants & assumptions
//! ------------------------
//! - History length is `opts.lbfgs_mem` or [`DEFAULT_LBFGS_MEM`].
//! - Tolerances rejected by argmin surface as `OptError` through the
//!   crate's `From<argmin::core::Error>` conversion.
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        traits::MLEOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, Theta,
        },
    },
};

/// L-BFGS with the Hager–Zhang line search.
///
/// Errors
/// ------
/// - `OptError` when argmin rejects a tolerance.
pub fn build_optimizer_hager_zhang(opts: &MLEOptions) -> OptResult<LbfgsHagerZhang> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsHagerZhang::new(HagerZhangLS::new(), mem), opts)
}

/// L-BFGS with the More–Thuente line search.
///
/// Errors
/// ------
/// - `OptError` when argmin rejects a tolerance.
pub fn build_optimizer_more_thuente(opts: &MLEOptions) -> OptResult<LbfgsMoreThuente> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsMoreThuente::new(MoreThuenteLS::new(), mem), opts)
}

/// Apply whichever of `tol_grad` / `tol_cost` is set; argmin's defaults
/// stay in effect for the others.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}
