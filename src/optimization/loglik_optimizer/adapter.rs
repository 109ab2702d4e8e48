//! Bridge from a [`LogLikelihood`] to argmin's `CostFunction` / `Gradient`.
//!
//! The cost handed to argmin is `c(θ) = -ℓ(θ)`. An analytic `∇ℓ` is negated;
//! without one, the cost itself is finite-differenced (central first, forward
//! as fallback), so no sign flip is needed on that path.
use std::cell::RefCell;

use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{
        finite_diff::run_fd_diff,
        traits::LogLikelihood,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::{CostFunction, Error, Gradient};
use finitediff::FiniteDiff;

/// An objective together with the data it is evaluated against.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogLikelihood> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

impl<F: LogLikelihood> CostFunction for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Output = Cost;

    /// `-ℓ(θ)`; a non-finite `ℓ` is reported as `OptError::NonFiniteCost`.
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let output = self.f.value(theta, self.data)?;
        if !output.is_finite() {
            return Err((OptError::NonFiniteCost { value: output }).into());
        }
        Ok(-output)
    }
}

impl<F: LogLikelihood> Gradient for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Gradient of the cost.
    ///
    /// Errors
    /// ------
    /// - Errors from the objective's `grad` other than
    ///   `GradientNotImplemented`.
    /// - The first error raised by a cost evaluation during differencing.
    /// - `GradientDimMismatch` / `InvalidGradient` from validation.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        let dim = theta.len();
        match self.f.grad(theta, self.data) {
            Ok(g) => {
                validate_grad(&g, dim)?;
                Ok(-g)
            }
            Err(OptError::GradientNotImplemented) => {
                // the FD closure must return f64; stash the first failure
                let closure_err: RefCell<Option<Error>> = RefCell::new(None);
                let cost_func = |theta: &Theta| -> f64 {
                    self.cost(theta).unwrap_or_else(|e| {
                        let mut slot = closure_err.borrow_mut();
                        if slot.is_none() {
                            *slot = Some(e);
                        }
                        f64::NAN
                    })
                };
                let central = theta.central_diff(&cost_func);
                if closure_err.borrow().is_none() && validate_grad(&central, dim).is_ok() {
                    return Ok(central);
                }
                Ok(run_fd_diff(theta, &cost_func, &closure_err)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptResult;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Sign conventions of cost and analytic gradient.
    // - The finite-difference fallback.
    // - Propagation of objective errors through argmin's error type.
    // -------------------------------------------------------------------------

    /// ℓ(θ) = −Σ (θ_i − c_i)², optionally with an analytic gradient.
    struct Quadratic {
        analytic: bool,
    }

    impl LogLikelihood for Quadratic {
        type Data = Vec<f64>;

        fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost> {
            if theta.iter().any(|t| *t > 100.0) {
                return Err(OptError::InvalidThetaInput { index: 0, value: theta[0] });
            }
            Ok(-theta.iter().zip(data).map(|(t, c)| (t - c).powi(2)).sum::<f64>())
        }

        fn check(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<()> {
            Ok(())
        }

        fn grad(&self, theta: &Theta, data: &Self::Data) -> OptResult<Grad> {
            if !self.analytic {
                return Err(OptError::GradientNotImplemented);
            }
            Ok(theta.iter().zip(data).map(|(t, c)| -2.0 * (t - c)).collect())
        }
    }

    #[test]
    // Purpose
    // -------
    // Cost and gradient are the negated log-likelihood quantities, with or
    // without an analytic gradient.
    //
    // Given
    // -----
    // - ℓ(θ) = −(θ₀ − 1)² − (θ₁ + 2)² at θ = (0, 0).
    //
    // Expect
    // ------
    // - Cost 5 and cost gradient (−2, 4) on both paths.
    fn cost_and_gradient_signs() {
        // Arrange
        let data = vec![1.0, -2.0];
        let theta = array![0.0, 0.0];

        for analytic in [true, false] {
            let f = Quadratic { analytic };
            let adapter = ArgMinAdapter::new(&f, &data);

            // Act
            let cost = adapter.cost(&theta).unwrap();
            let grad = adapter.gradient(&theta).unwrap();

            // Assert
            assert_relative_eq!(cost, 5.0);
            assert_relative_eq!(grad[0], -2.0, epsilon = 1e-5);
            assert_relative_eq!(grad[1], 4.0, epsilon = 1e-5);
        }
    }

    #[test]
    // Purpose
    // -------
    // Objective errors survive the trip through argmin's error type.
    //
    // Given
    // -----
    // - θ outside the objective's accepted range.
    //
    // Expect
    // ------
    // - `OptError::InvalidThetaInput` after converting back.
    fn objective_errors_round_trip() {
        let data = vec![0.0];
        let f = Quadratic { analytic: false };
        let adapter = ArgMinAdapter::new(&f, &data);
        let err = adapter.cost(&array![1000.0]).unwrap_err();
        assert!(matches!(OptError::from(err), OptError::InvalidThetaInput { .. }));
    }
}
