//! fit::objective — the joint log-likelihood handed to the optimizer.
//!
//! Purpose
//! -------
//! Evaluate `ℓ(θ) = −chi2(p(θ))/2` over every dataset of a [`FitSession`],
//! where `p(θ)` is the model vector produced by the [`ParameterLayout`].
//! The session is the optimizer's `Data`; the objective itself only holds
//! the layout and the symbolic derivatives of the flux and the corrections.
//!
//! Key behaviors
//! -------------
//! - Analytic gradient: each dataset accumulates `∂chi2/∂p`, which is then
//!   chained through the parameter transforms.
//! - [`FitObjective::covariance`] differentiates the gradient of the cost
//!   `chi2/2` to get the internal covariance at the optimum.
//!
//! Invariants & assumptions
//! ------------------------
//! - `correction_derivs` is aligned with the session's dataset order and is
//!   empty for datasets without a correction.
use std::cell::RefCell;

use ndarray::Array2;

use crate::{
    dataset::likelihood::ModelDerivatives,
    fit::{layout::ParameterLayout, session::FitSession},
    inference::hessian::calc_covariance,
    optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::{Cost, Grad, LogLikelihood, Theta},
    },
    spectrum::{
        errors::{SpecError, SpecResult},
        expr::{Expr, Wrt},
    },
};

#[derive(Debug, Clone)]
pub struct FitObjective {
    layout: ParameterLayout,
    flux_derivs: Vec<Expr>,
    flux_dx: Expr,
    correction_derivs: Vec<Vec<Expr>>,
}

impl FitObjective {
    /// Differentiate the session's flux and corrections once.
    ///
    /// # Errors
    /// `SpecError::NoFluxFunction` when the session has no flux.
    pub fn new(session: &FitSession, layout: ParameterLayout) -> SpecResult<Self> {
        let flux = session.flux_fun().ok_or(SpecError::NoFluxFunction)?;
        let flux_derivs =
            (0..flux.n_params()).map(|i| flux.expr().derivative(Wrt::Param(i))).collect();
        let flux_dx = flux.expr().derivative(Wrt::X);
        let correction_derivs = session
            .datasets()
            .iter()
            .map(|entry| match &entry.correction {
                Some(c) => (0..c.n_params()).map(|k| c.expr().derivative(Wrt::Param(k))).collect(),
                None => Vec::new(),
            })
            .collect();
        Ok(FitObjective { layout, flux_derivs, flux_dx, correction_derivs })
    }

    /// Same derivatives over another layout.
    pub fn with_layout(&self, layout: ParameterLayout) -> Self {
        FitObjective { layout, ..self.clone() }
    }

    pub fn layout(&self) -> &ParameterLayout {
        &self.layout
    }

    /// `∂chi2/∂p` at the model vector `params`.
    ///
    /// # Errors
    /// `SpecError::NoFluxFunction`, `ParameterLengthMismatch`, or the first
    /// dataset error.
    pub fn chi2_gradient(&self, session: &FitSession, params: &[f64]) -> SpecResult<Vec<f64>> {
        let flux = session.flux_fun().ok_or(SpecError::NoFluxFunction)?;
        if params.len() != self.layout.len() {
            return Err(SpecError::ParameterLengthMismatch {
                expected: self.layout.len(),
                found: params.len(),
            });
        }
        let (flux_params, corr_params) = params.split_at(self.layout.n_flux());
        let flux_snap = flux.snapshot_with(flux_params);
        let (lo, hi) = session.emin_emax();
        let mut grad = vec![0.0; params.len()];
        for (entry, corr_derivs) in session.datasets().iter().zip(&self.correction_derivs) {
            let corr_snap = entry.correction.as_ref().map(|c| c.snapshot_with(corr_params));
            let derivs = ModelDerivatives {
                flux: &self.flux_derivs,
                flux_dx: &self.flux_dx,
                correction: corr_derivs,
            };
            entry.dataset.accumulate_gradient(
                &flux_snap,
                corr_snap.as_ref(),
                &derivs,
                lo,
                hi,
                &mut grad,
            )?;
        }
        Ok(grad)
    }

    /// Gradient of the cost `chi2/2` with respect to θ.
    pub fn cost_gradient(&self, theta: &Theta, session: &FitSession) -> OptResult<Grad> {
        let params = self.layout.to_external(theta);
        let grad = self.chi2_gradient(session, &params)?;
        Ok(self.layout.chain_gradient(theta, &grad) * 0.5)
    }

    /// Internal covariance at `theta_hat` from the Hessian of `chi2/2`.
    ///
    /// # Errors
    /// The first gradient failure met while differencing, or the Hessian
    /// validation errors of [`calc_covariance`].
    pub fn covariance(&self, theta_hat: &Theta, session: &FitSession) -> OptResult<Array2<f64>> {
        let closure_err: RefCell<Option<OptError>> = RefCell::new(None);
        let grad_map = |theta: &Theta| -> Grad {
            self.cost_gradient(theta, session).unwrap_or_else(|e| {
                let mut slot = closure_err.borrow_mut();
                if slot.is_none() {
                    *slot = Some(e);
                }
                Grad::from_elem(theta.len(), f64::NAN)
            })
        };
        let cov = calc_covariance(&grad_map, theta_hat);
        if let Some(err) = closure_err.take() {
            return Err(err);
        }
        cov
    }
}

impl LogLikelihood for FitObjective {
    type Data = FitSession;

    fn value(&self, theta: &Theta, session: &FitSession) -> OptResult<Cost> {
        let params = self.layout.to_external(theta);
        let summary = session.evaluate(&params)?;
        Ok(-0.5 * summary.all.deviance)
    }

    fn check(&self, theta: &Theta, session: &FitSession) -> OptResult<()> {
        if session.datasets().is_empty() {
            return Err(SpecError::NoDatasets.into());
        }
        if theta.len() != self.layout.n_free() {
            return Err(SpecError::ParameterLengthMismatch {
                expected: self.layout.n_free(),
                found: theta.len(),
            }
            .into());
        }
        Ok(())
    }

    fn grad(&self, theta: &Theta, session: &FitSession) -> OptResult<Grad> {
        Ok(-self.cost_gradient(theta, session)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dataset::data::Dataset,
        fit::schema::CorrectionSchema,
        spectrum::{function::SpecFunction, presets::correction_preset},
    };
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - `value` as −chi2/2 of the session.
    // - The analytic θ-gradient against central differences of `value`,
    //   including a shared correction parameter.
    // - `check` rejecting empty sessions and wrong θ lengths.
    // -------------------------------------------------------------------------

    fn session() -> FitSession {
        // J(x) = a·10^(b(x − 19))·1e-30 with a, b free
        let flux = SpecFunction::new(
            "fJ",
            Expr::product(vec![
                Expr::Const(1e-30),
                Expr::Par(0),
                Expr::pow10(Expr::product(vec![Expr::Par(1), Expr::sub(Expr::X, Expr::Const(19.0))])),
            ]),
            18.0,
            21.0,
        )
        .with_values(&[2.0, -3.0])
        .unwrap()
        .with_errors(&[0.1, 0.1])
        .unwrap();
        let corr = correction_preset("fCONSTCORRPAR").unwrap();
        let corr = crate::spectrum::presets::combined_correction(
            &corr,
            &correction_preset("fNONONLINCORR").unwrap(),
        );

        let mut s = FitSession::new();
        s.set_correction_schema(CorrectionSchema::from_function(&corr)).unwrap();
        s.set_flux_fun(flux, None);
        let x = vec![18.85, 18.95, 19.05, 19.15, 19.25];
        let ds = Dataset::new("a", "", x.clone(), vec![0.05; 5], vec![40.0, 22.0, 9.0, 5.0, 0.0], vec![4e19; 5])
            .unwrap();
        s.add(ds, Some(corr)).unwrap();
        let ds = Dataset::new("b", "", x, vec![0.05; 5], vec![35.0, 20.0, 12.0, 3.0, 1.0], vec![4e19; 5])
            .unwrap();
        s.add(ds, None).unwrap();
        s.set_emin_emax(18.8, 21.0).unwrap();
        s
    }

    fn objective(s: &FitSession) -> FitObjective {
        let layout = ParameterLayout::new(s.flux_fun().unwrap(), s.correction_schema());
        FitObjective::new(s, layout).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // `value` is −chi2/2 of the session at the mapped parameters.
    //
    // Given
    // -----
    // - The two-dataset session at its start point.
    //
    // Expect
    // ------
    // - value(θ₀) = −deviance/2 of `evaluate` at the current parameters.
    fn value_is_half_negative_deviance() {
        // Arrange
        let s = session();
        let f = objective(&s);
        let theta0 = f.layout().initial_theta();

        // Act
        let v = f.value(&theta0, &s).unwrap();

        // Assert
        let summary = s.evaluate(&s.current_parameters()).unwrap();
        assert_relative_eq!(v, -0.5 * summary.all.deviance, max_relative = 1e-12);
        assert_eq!(summary.all.bins, 10);
    }

    #[test]
    // Purpose
    // -------
    // The analytic gradient agrees with finite differences of `value`.
    //
    // Given
    // -----
    // - θ = (0.4, −0.3, 0.7) over [a, b, S0].
    //
    // Expect
    // ------
    // - Each component matches a central difference to 1e-5 relative.
    fn analytic_gradient_matches_differences() {
        let s = session();
        let f = objective(&s);
        let theta = array![0.4, -0.3, 0.7];
        let g = f.grad(&theta, &s).unwrap();
        for k in 0..theta.len() {
            let h = 1e-5;
            let mut up = theta.clone();
            let mut dn = theta.clone();
            up[k] += h;
            dn[k] -= h;
            let fd = (f.value(&up, &s).unwrap() - f.value(&dn, &s).unwrap()) / (2.0 * h);
            assert_relative_eq!(g[k], fd, epsilon = 1e-6, max_relative = 1e-5);
        }
    }

    #[test]
    // Purpose
    // -------
    // `check` refuses to start without datasets or with a wrong θ length.
    //
    // Given
    // -----
    // - The session with θ of length 2; an empty session with a flux.
    //
    // Expect
    // ------
    // - `ParameterLengthMismatch` and `NoDatasets`, both via `OptError::Model`.
    fn check_rejects_bad_setups() {
        let s = session();
        let f = objective(&s);
        let err: SpecError = f.check(&array![0.0, 0.0], &s).unwrap_err().into();
        assert_eq!(err, SpecError::ParameterLengthMismatch { expected: 3, found: 2 });

        let mut empty = FitSession::new();
        empty.set_flux_fun(s.flux_fun().unwrap().clone(), None);
        let f = objective(&empty);
        let err: SpecError = f.check(&array![0.0, 0.0], &empty).unwrap_err().into();
        assert_eq!(err, SpecError::NoDatasets);
    }
}
