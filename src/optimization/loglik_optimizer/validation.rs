//! Shape and finiteness checks shared by the optimizer layer.
//!
//! Every helper returns the first offending entry as a specific
//! [`OptError`] variant so that a failed fit can say which parameter or
//! derivative went bad.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{Grad, Theta, types::Hessian},
};

/// `None`, or a finite positive gradient-norm tolerance.
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    match tol {
        Some(tol) if !tol.is_finite() => {
            Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be finite." })
        }
        Some(tol) if tol <= 0.0 => {
            Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be positive." })
        }
        _ => Ok(()),
    }
}

/// `None`, or a finite positive cost-change tolerance.
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    match tol {
        Some(tol) if !tol.is_finite() => {
            Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be finite." })
        }
        Some(tol) if tol <= 0.0 => {
            Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be positive." })
        }
        _ => Ok(()),
    }
}

/// Starting or trial parameters must be finite.
pub fn validate_theta_input(theta: &Theta) -> OptResult<()> {
    match theta.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(OptError::InvalidThetaInput { index, value: theta[index] }),
        None => Ok(()),
    }
}

/// Gradient of length `dim` with finite entries.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    match grad.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(OptError::InvalidGradient {
            index,
            value: grad[index],
            reason: "Gradient elements must be finite.",
        }),
        None => Ok(()),
    }
}

/// Unwrap a present, all-finite estimate.
pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    let theta = theta_hat.ok_or(OptError::MissingThetaHat)?;
    if let Some(index) = theta.iter().position(|v| !v.is_finite()) {
        return Err(OptError::InvalidThetaHat {
            index,
            value: theta[index],
            reason: "Parameter estimates must be finite.",
        });
    }
    Ok(theta)
}

pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}

/// `dim × dim` Hessian with finite entries.
pub fn validate_hessian(hessian: &Hessian, dim: usize) -> OptResult<()> {
    if hessian.nrows() != dim || hessian.ncols() != dim {
        return Err(OptError::HessianDimMismatch {
            expected: dim,
            found: (hessian.nrows(), hessian.ncols()),
        });
    }
    match hessian.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, col), &value)) => Err(OptError::InvalidHessian { row, col, value }),
        None => Ok(()),
    }
}
