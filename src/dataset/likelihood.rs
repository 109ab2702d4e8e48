//! Binned Poisson deviance of a dataset against a flux model.
//!
//! For each bin in the window the predicted count is
//! `flux(x + log10 c)·c·w·A` with correction factor `c = corr(x)`, linear
//! width `w` and exposure `A`. The bin's deviance is `2·predicted` when
//! nothing was observed, else `2((predicted − n) + n·ln(n/predicted))`.
//! Sums are kept separately over all bins, bins with counts and bins at or
//! above the restricted threshold.
use std::ops::{Add, AddAssign};

use crate::{
    dataset::data::{Dataset, correction_at},
    spectrum::{
        errors::{SpecError, SpecResult},
        expr::Expr,
        function::FunctionSnapshot,
    },
};

/// Observed counts at or below this are treated as zero.
pub const ZERO_COUNT_CUTOFF: f64 = 1e-3;

/// Deviance sum and number of contributing bins.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LikelihoodPair {
    pub deviance: f64,
    pub bins: usize,
}

impl LikelihoodPair {
    pub fn new(deviance: f64, bins: usize) -> Self {
        LikelihoodPair { deviance, bins }
    }

    fn push(&mut self, deviance: f64) {
        self.deviance += deviance;
        self.bins += 1;
    }
}

impl Add for LikelihoodPair {
    type Output = LikelihoodPair;

    fn add(self, rhs: LikelihoodPair) -> LikelihoodPair {
        LikelihoodPair { deviance: self.deviance + rhs.deviance, bins: self.bins + rhs.bins }
    }
}

impl AddAssign for LikelihoodPair {
    fn add_assign(&mut self, rhs: LikelihoodPair) {
        *self = *self + rhs;
    }
}

/// The three deviance sums tracked for every evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LikelihoodSummary {
    /// Every bin in the window.
    pub all: LikelihoodPair,
    /// Bins with observed > 0.
    pub nonzero: LikelihoodPair,
    /// Bins with observed ≥ the dataset's restricted threshold.
    pub restricted: LikelihoodPair,
}

impl AddAssign for LikelihoodSummary {
    fn add_assign(&mut self, rhs: LikelihoodSummary) {
        self.all += rhs.all;
        self.nonzero += rhs.nonzero;
        self.restricted += rhs.restricted;
    }
}

/// Poisson deviance of `observed` counts against `predicted`.
pub fn deviance(observed: f64, predicted: f64) -> f64 {
    if observed > ZERO_COUNT_CUTOFF {
        2.0 * ((predicted - observed) + observed * (observed / predicted).ln())
    } else {
        2.0 * predicted
    }
}

/// `∂deviance/∂predicted`.
pub fn deviance_slope(observed: f64, predicted: f64) -> f64 {
    if observed > ZERO_COUNT_CUTOFF { 2.0 * (1.0 - observed / predicted) } else { 2.0 }
}

/// Derivative expressions needed for the analytic chi2 gradient.
///
/// `flux[i]` is `∂J/∂θ_i`, `flux_dx` is `∂J/∂x` and `correction[k]` is
/// `∂c/∂φ_k` for the correction parameters `φ`.
#[derive(Debug, Clone, Copy)]
pub struct ModelDerivatives<'a> {
    pub flux: &'a [Expr],
    pub flux_dx: &'a Expr,
    pub correction: &'a [Expr],
}

impl Dataset {
    /// Predicted count of bin `i`.
    #[inline]
    pub fn predict_bin(
        &self, i: usize, flux: &FunctionSnapshot<'_>, correction: Option<&FunctionSnapshot<'_>>,
    ) -> f64 {
        let x = self.log10en()[i];
        let corr = correction_at(correction, x);
        flux.eval(x + corr.log10()) * corr * self.linear_width(i) * self.exposure()[i]
    }

    /// Deviance sums over bins with `lo ≤ x ≤ hi`.
    ///
    /// Read-only: predictions are not cached (see
    /// [`Dataset::cache_predictions`]).
    ///
    /// Errors
    /// ------
    /// - `SpecError::UndefinedDeviance` when a bin's prediction is not
    ///   finite, or when counts were observed where the prediction is not
    ///   positive.
    pub fn calc_log_likelihood(
        &self, flux: &FunctionSnapshot<'_>, correction: Option<&FunctionSnapshot<'_>>, lo: f64,
        hi: f64,
    ) -> SpecResult<LikelihoodSummary> {
        let mut summary = LikelihoodSummary::default();
        for i in self.window(lo, hi) {
            let observed = self.nevents()[i];
            let predicted = self.checked_prediction(i, flux, correction)?;
            let d = deviance(observed, predicted);
            summary.all.push(d);
            if observed > 0.0 {
                summary.nonzero.push(d);
            }
            if observed >= self.restricted_min() {
                summary.restricted.push(d);
            }
        }
        Ok(summary)
    }

    /// Store the prediction of every bin for later inspection.
    pub fn cache_predictions(
        &mut self, flux: &FunctionSnapshot<'_>, correction: Option<&FunctionSnapshot<'_>>,
    ) {
        let predicted: Vec<f64> =
            (0..self.len()).map(|i| self.predict_bin(i, flux, correction)).collect();
        self.nevents_fit = predicted;
    }

    /// Add `∂chi2/∂(θ, φ)` of the window to `grad`.
    ///
    /// `grad` holds the flux parameters followed by the correction
    /// parameters. Correction slots are left alone when the dataset has no
    /// correction.
    ///
    /// Errors
    /// ------
    /// - As [`Dataset::calc_log_likelihood`].
    pub fn accumulate_gradient(
        &self, flux: &FunctionSnapshot<'_>, correction: Option<&FunctionSnapshot<'_>>,
        derivs: &ModelDerivatives<'_>, lo: f64, hi: f64, grad: &mut [f64],
    ) -> SpecResult<()> {
        let n_flux = derivs.flux.len();
        for i in self.window(lo, hi) {
            let x = self.log10en()[i];
            let corr = correction_at(correction, x);
            let x_corr = x + corr.log10();
            let predicted = self.checked_prediction(i, flux, correction)?;
            let slope = deviance_slope(self.nevents()[i], predicted);
            let scale = slope * self.linear_width(i) * self.exposure()[i];

            for (g, d) in grad[..n_flux].iter_mut().zip(derivs.flux) {
                *g += scale * corr * d.eval(x_corr, flux.params);
            }
            if let Some(c) = correction {
                let d_corr_factor = derivs.flux_dx.eval(x_corr, flux.params)
                    / std::f64::consts::LN_10
                    + flux.eval(x_corr);
                for (g, d) in grad[n_flux..].iter_mut().zip(derivs.correction) {
                    *g += scale * d_corr_factor * d.eval(x, c.params);
                }
            }
        }
        Ok(())
    }

    // ---- Helper methods ----

    fn window(&self, lo: f64, hi: f64) -> impl Iterator<Item = usize> + '_ {
        self.log10en().iter().enumerate().filter(move |(_, x)| lo <= **x && **x <= hi).map(|(i, _)| i)
    }

    fn checked_prediction(
        &self, i: usize, flux: &FunctionSnapshot<'_>, correction: Option<&FunctionSnapshot<'_>>,
    ) -> SpecResult<f64> {
        let observed = self.nevents()[i];
        let predicted = self.predict_bin(i, flux, correction);
        if !predicted.is_finite() || (observed > ZERO_COUNT_CUTOFF && predicted <= 0.0) {
            return Err(SpecError::UndefinedDeviance {
                dataset: self.name().to_string(),
                index: i,
                observed,
                predicted,
            });
        }
        Ok(predicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::{expr::Wrt, function::SpecFunction};
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The deviance formula and its zero-count branch.
    // - Window filtering and the three summary pairs.
    // - The undefined-deviance error.
    // - The analytic gradient against finite differences, with and without a
    //   parametric correction.
    // -------------------------------------------------------------------------

    fn flat(value: f64) -> SpecFunction {
        SpecFunction::new("fJ", Expr::Par(0), 17.0, 21.0).with_values(&[value]).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Deviance is non-negative and vanishes only at a perfect prediction.
    //
    // Given
    // -----
    // - Observed 10 against predictions around 10; observed 0 against 5.
    //
    // Expect
    // ------
    // - Zero at 10, positive elsewhere; 10 for the zero-count bin.
    fn deviance_properties() {
        assert_eq!(deviance(10.0, 10.0), 0.0);
        for p in [0.5, 5.0, 9.9, 10.1, 30.0] {
            assert!(deviance(10.0, p) > 0.0);
        }
        assert_eq!(deviance(0.0, 5.0), 10.0);
        assert_eq!(deviance(5e-4, 5.0), 10.0);
    }

    #[test]
    // Purpose
    // -------
    // A single empty bin contributes to `all` but not to `nonzero`.
    //
    // Given
    // -----
    // - One bin at 19.0, half-width 0.05, 0 observed, exposure 1e3; a flat
    //   flux scaled so that the prediction is 5.
    //
    // Expect
    // ------
    // - all = (10, 1), nonzero = (0, 0), restricted = (0, 0).
    fn empty_bin_summary() {
        // Arrange
        let ds = Dataset::new("b", "", vec![19.0], vec![0.05], vec![0.0], vec![1e3]).unwrap();
        let flux = flat(5.0 / (ds.linear_width(0) * 1e3));

        // Act
        let s = ds.calc_log_likelihood(&flux.snapshot(), None, 17.0, 21.0).unwrap();

        // Assert
        assert_relative_eq!(s.all.deviance, 10.0, max_relative = 1e-12);
        assert_eq!(s.all.bins, 1);
        assert_eq!(s.nonzero, LikelihoodPair::new(0.0, 0));
        assert_eq!(s.restricted, LikelihoodPair::new(0.0, 0));
    }

    #[test]
    // Purpose
    // -------
    // Window edges are inclusive and the restricted threshold applies.
    //
    // Given
    // -----
    // - Bins at 18.9, 19.0, 19.1 with counts 3, 8, 0; window [19.0, 19.1].
    //
    // Expect
    // ------
    // - all counts 2 bins, nonzero 1, restricted 1.
    // - A zero flux with observed counts fails with `UndefinedDeviance`.
    fn window_and_threshold() {
        let ds = Dataset::new(
            "w",
            "",
            vec![18.9, 19.0, 19.1],
            vec![0.05; 3],
            vec![3.0, 8.0, 0.0],
            vec![1e3; 3],
        )
        .unwrap();
        let flux = flat(1e-18);
        let s = ds.calc_log_likelihood(&flux.snapshot(), None, 19.0, 19.1).unwrap();
        assert_eq!((s.all.bins, s.nonzero.bins, s.restricted.bins), (2, 1, 1));

        let zero = flat(0.0);
        let err = ds.calc_log_likelihood(&zero.snapshot(), None, 17.0, 21.0).unwrap_err();
        assert!(matches!(err, SpecError::UndefinedDeviance { index: 0, .. }));
    }

    #[test]
    // Purpose
    // -------
    // Bins below the zero-count cutoff accept a zero prediction.
    //
    // Given
    // -----
    // - One bin with 5e-4 observed counts and one with 1 count.
    // - A zero flux.
    //
    // Expect
    // ------
    // - The first evaluates to deviance 0 without error.
    // - The second fails with `UndefinedDeviance`.
    fn zero_prediction_below_cutoff() {
        // Arrange
        let below = Dataset::new("b", "", vec![19.0], vec![0.05], vec![5e-4], vec![1e3]).unwrap();
        let above = Dataset::new("a", "", vec![19.0], vec![0.05], vec![1.0], vec![1e3]).unwrap();
        let zero = flat(0.0);

        // Act
        let ok = below.calc_log_likelihood(&zero.snapshot(), None, 17.0, 21.0);
        let err = above.calc_log_likelihood(&zero.snapshot(), None, 17.0, 21.0);

        // Assert
        let s = ok.unwrap();
        assert_eq!(s.all.bins, 1);
        assert_relative_eq!(s.all.deviance, 0.0, epsilon = 1e-15);
        assert!(matches!(err.unwrap_err(), SpecError::UndefinedDeviance { index: 0, .. }));
    }

    #[test]
    // Purpose
    // -------
    // The analytic gradient matches central differences of the deviance.
    //
    // Given
    // -----
    // - J = θ₀·10^(θ₁(x − 19)) and correction c = 1 + φ₀ + φ₁(x − 19).
    // - Four bins with mixed counts.
    //
    // Expect
    // ------
    // - Each gradient entry agrees with a central difference.
    fn gradient_matches_differences() {
        // Arrange
        let j_expr = Expr::product(vec![
            Expr::Par(0),
            Expr::pow10(Expr::product(vec![Expr::Par(1), Expr::sub(Expr::X, Expr::Const(19.0))])),
        ]);
        let c_expr = Expr::sum(vec![
            Expr::Const(1.0),
            Expr::Par(0),
            Expr::product(vec![Expr::Par(1), Expr::sub(Expr::X, Expr::Const(19.0))]),
        ]);
        let flux = SpecFunction::new("fJ", j_expr.clone(), 17.0, 21.0);
        let corr = SpecFunction::new("c", c_expr.clone(), 17.0, 21.0);
        let ds = Dataset::new(
            "g",
            "",
            vec![18.8, 19.0, 19.2, 19.4],
            vec![0.05; 4],
            vec![40.0, 20.0, 3.0, 0.0],
            vec![1e3; 4],
        )
        .unwrap();
        let scale = 25.0 / (ds.linear_width(1) * 1e3);
        let theta = [scale, -2.0];
        let phi = [0.05, 0.02];

        let flux_d: Vec<Expr> = (0..2).map(|i| j_expr.derivative(Wrt::Param(i))).collect();
        let flux_dx = j_expr.derivative(Wrt::X);
        let corr_d: Vec<Expr> = (0..2).map(|k| c_expr.derivative(Wrt::Param(k))).collect();
        let derivs = ModelDerivatives { flux: &flux_d, flux_dx: &flux_dx, correction: &corr_d };

        let chi2 = |t: &[f64], p: &[f64]| {
            ds.calc_log_likelihood(&flux.snapshot_with(t), Some(&corr.snapshot_with(p)), 17.0, 21.0)
                .unwrap()
                .all
                .deviance
        };

        // Act
        let mut grad = vec![0.0; 4];
        ds.accumulate_gradient(
            &flux.snapshot_with(&theta),
            Some(&corr.snapshot_with(&phi)),
            &derivs,
            17.0,
            21.0,
            &mut grad,
        )
        .unwrap();

        // Assert
        let mut full = [theta[0], theta[1], phi[0], phi[1]];
        for k in 0..4 {
            let orig = full[k];
            let h = 1e-6 * orig.abs();
            full[k] = orig + h;
            let up = chi2(&full[..2], &full[2..]);
            full[k] = orig - h;
            let down = chi2(&full[..2], &full[2..]);
            full[k] = orig;
            // compare in log-parameter units so every entry is O(chi2)
            let fd = (up - down) / (2.0 * h);
            assert_relative_eq!(grad[k] * orig, fd * orig, epsilon = 1e-5, max_relative = 1e-5);
        }
    }
}
