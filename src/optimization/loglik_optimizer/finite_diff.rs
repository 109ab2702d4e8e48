//! loglik_optimizer::finite_diff — finite-difference derivatives.
//!
//! Purpose
//! -------
//! Wrap `finitediff` for the two places that need numeric derivatives: the
//! gradient fallback for objectives without an analytic gradient, and the
//! Hessian of the fitted cost from which parameter errors are derived.
//!
//! Key behaviors
//! -------------
//! - [`run_fd_diff`] takes a forward-difference gradient and turns any error
//!   stashed by the evaluation closure back into an `OptError`.
//! - [`compute_hessian`] differentiates a gradient map with central
//!   differences, falls back to forward differences when the central result
//!   is not finite, and symmetrizes the result.
//!
//! Conventions
//! -----------
//! - Derivatives are taken in the optimizer's internal coordinates; mapping
//!   back to model parameters happens in `fit::layout`.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, Theta,
        types::Hessian,
        validation::{validate_grad, validate_hessian},
    },
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// Forward-difference gradient of `func` at `theta`.
///
/// `func` must write the first error it meets into `closure_err` and return
/// `NaN`; the cell is cleared on entry.
///
/// Errors
/// ------
/// - The captured error, converted into `OptError`.
/// - `GradientDimMismatch` / `InvalidGradient` from validation.
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}

/// Symmetric Hessian of the function whose gradient is `f`.
///
/// Errors
/// ------
/// - `HessianDimMismatch` / `InvalidHessian` when the forward-difference
///   fallback is not usable either.
pub fn compute_hessian<F: Fn(&Theta) -> Grad>(f: &F, theta: &Theta) -> OptResult<Hessian> {
    let dim = theta.len();
    let mut hess = theta.central_hessian(f);
    if validate_hessian(&hess, dim).is_err() {
        hess = theta.forward_hessian(f);
        validate_hessian(&hess, dim)?;
    }
    symmetrize_hess(&mut hess);
    Ok(hess)
}

// ---- Helper methods ----

/// Average each off-diagonal pair in place.
fn symmetrize_hess(hess: &mut Hessian) {
    for i in 0..hess.nrows() {
        for j in 0..i {
            let avg = 0.5 * (hess[[i, j]] + hess[[j, i]]);
            hess[[i, j]] = avg;
            hess[[j, i]] = avg;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptError;
    use approx::assert_relative_eq;
    use argmin::core::ArgminError;
    use ndarray::{Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Forward-difference gradients with and without a captured error.
    // - Hessians of a known quadratic, the non-finite failure path, and
    //   symmetrization.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Differentiate a Poisson deviance in its log-rate.
    //
    // Given
    // -----
    // - d(θ) = 2((e^θ − 7) + 7·ln(7/e^θ)) at θ = ln 5.
    //
    // Expect
    // ------
    // - d'(θ) = 2(e^θ − 7) = −4 within forward-difference accuracy.
    fn forward_gradient_of_deviance() {
        // Arrange
        let theta = array![5f64.ln()];
        let closure_err: RefCell<Option<Error>> = RefCell::new(None);
        let dev = |t: &Theta| 2.0 * ((t[0].exp() - 7.0) + 7.0 * (7.0 / t[0].exp()).ln());

        // Act
        let grad = run_fd_diff(&theta, &dev, &closure_err).unwrap();

        // Assert
        assert_relative_eq!(grad[0], -4.0, epsilon = 1e-5);
    }

    #[test]
    // Purpose
    // -------
    // An error stashed by the closure wins over the numeric result.
    //
    // Given
    // -----
    // - A closure that stores `ArgminError::NotImplemented` and returns NaN.
    //
    // Expect
    // ------
    // - `OptError::Argmin` tagged "not implemented".
    fn captured_error_is_returned() {
        let theta = array![1.0];
        let closure_err: RefCell<Option<Error>> = RefCell::new(None);
        let f = |_: &Theta| {
            closure_err.replace(Some(ArgminError::NotImplemented { text: "fd".into() }.into()));
            f64::NAN
        };
        let err = run_fd_diff(&theta, &f, &closure_err).unwrap_err();
        assert!(matches!(err, OptError::Argmin { kind: "not implemented", .. }));
    }

    #[test]
    // Purpose
    // -------
    // Recover the curvature of a quadratic and reject NaN gradients.
    //
    // Given
    // -----
    // - ∇f(θ) = (4θ₀ + θ₁, θ₀ + 2θ₁); a gradient map returning NaN.
    //
    // Expect
    // ------
    // - [[4, 1], [1, 2]]; `InvalidHessian` for the NaN map.
    fn hessian_of_quadratic() {
        let grad_fn = |t: &Theta| array![4.0 * t[0] + t[1], t[0] + 2.0 * t[1]];
        let hess = compute_hessian(&grad_fn, &array![0.3, -0.7]).unwrap();
        assert_relative_eq!(hess[[0, 0]], 4.0, epsilon = 1e-6);
        assert_relative_eq!(hess[[0, 1]], 1.0, epsilon = 1e-6);
        assert_eq!(hess[[0, 1]], hess[[1, 0]]);
        assert_relative_eq!(hess[[1, 1]], 2.0, epsilon = 1e-6);

        let nan_fn = |_: &Theta| array![f64::NAN];
        assert!(matches!(
            compute_hessian(&nan_fn, &array![0.0]),
            Err(OptError::InvalidHessian { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Symmetrization averages off-diagonal pairs and keeps the diagonal.
    //
    // Given
    // -----
    // - [[1, 2], [0, 3]].
    //
    // Expect
    // ------
    // - [[1, 1], [1, 3]].
    fn symmetrize_averages_pairs() {
        let mut h: Hessian = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 0.0, 3.0]).unwrap();
        symmetrize_hess(&mut h);
        assert_eq!(h, array![[1.0, 1.0], [1.0, 3.0]]);
    }
}
