//! One-parameter chi2 scans around a fitted optimum.
//!
//! In [`ScanMode::Fixed`] every other parameter stays at its fitted value.
//! In [`ScanMode::Profile`] the remaining free parameters are refitted at
//! each grid point, starting from the fitted values.
use crate::{
    fit::{layout::ParameterLayout, objective::FitObjective, options::ScanMode, session::FitSession},
    optimization::loglik_optimizer::maximize,
    spectrum::errors::{SpecError, SpecResult},
};

/// Grid values of one parameter with the chi2 reached at each.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterScan {
    pub index: usize,
    pub name: String,
    pub mode: ScanMode,
    pub values: Vec<f64>,
    pub chi2: Vec<f64>,
    /// Values are offsets from the best fit and chi2 is relative to the scan
    /// minimum.
    pub deltas: bool,
}

impl ParameterScan {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// `n` evenly spaced points from `lo` to `hi` inclusive.
fn grid(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![lo];
    }
    let step = (hi - lo) / (n - 1) as f64;
    (0..n).map(|k| lo + step * k as f64).collect()
}

impl FitSession {
    /// Scan parameter `index` over `n_points` values in `[lo, hi]`.
    ///
    /// `lo = hi = 0` scans the fitted value ± 2 errors. Points whose
    /// evaluation fails are skipped with a warning. The mode comes from
    /// [`FitOptions::scan_mode`](super::FitOptions::scan_mode).
    ///
    /// # Errors
    /// - `SpecError::NotFitted` before a successful fit.
    /// - `SpecError::ParameterIndexOutOfRange` for an unknown index.
    /// - `SpecError::InvalidArgument` for `n_points == 0` or `hi < lo`.
    pub fn scan_parameter(
        &self, index: usize, n_points: usize, lo: f64, hi: f64, calc_deltas: bool,
    ) -> SpecResult<ParameterScan> {
        let outcome = self.outcome().ok_or(SpecError::NotFitted)?;
        let best = outcome.parameters.clone();
        if index >= best.len() {
            return Err(SpecError::ParameterIndexOutOfRange { index, len: best.len() });
        }
        if n_points == 0 {
            return Err(SpecError::InvalidArgument {
                name: "n_points",
                value: 0.0,
                reason: "at least one scan point is required",
            });
        }
        let (lo, hi) = if lo == 0.0 && hi == 0.0 {
            let err = outcome.errors[index];
            (best[index] - 2.0 * err, best[index] + 2.0 * err)
        } else {
            (lo, hi)
        };
        if hi < lo {
            return Err(SpecError::InvalidArgument {
                name: "hi",
                value: hi,
                reason: "scan range ends below its start",
            });
        }

        let mode = self.options().scan_mode;
        let profile = match mode {
            ScanMode::Fixed => None,
            ScanMode::Profile => {
                let flux = self.flux_fun().ok_or(SpecError::NoFluxFunction)?;
                let layout =
                    ParameterLayout::new(flux, self.correction_schema()).with_starts(&best)?;
                Some(FitObjective::new(self, layout)?)
            }
        };
        log::debug!("scanning {} over [{lo}, {hi}] with {n_points} points ({mode:?})", outcome.names[index]);

        let mut values = Vec::with_capacity(n_points);
        let mut chi2 = Vec::with_capacity(n_points);
        for v in grid(lo, hi, n_points) {
            let point = match &profile {
                None => {
                    let mut params = best.clone();
                    params[index] = v;
                    self.evaluate(&params).map(|s| s.all.deviance)
                }
                Some(objective) => self.profile_point(objective, index, v),
            };
            match point {
                Ok(c) => {
                    values.push(v);
                    chi2.push(c);
                }
                Err(err) => log::warn!("scan point {v} skipped: {err}"),
            }
        }

        if calc_deltas {
            values.iter_mut().for_each(|v| *v -= best[index]);
            let min = chi2.iter().copied().fold(f64::INFINITY, f64::min);
            chi2.iter_mut().for_each(|c| *c -= min);
        }
        Ok(ParameterScan {
            index,
            name: outcome.names[index].clone(),
            mode,
            values,
            chi2,
            deltas: calc_deltas,
        })
    }

    // ---- Helper methods ----

    /// Minimum chi2 with parameter `index` fixed at `value`.
    fn profile_point(&self, objective: &FitObjective, index: usize, value: f64) -> SpecResult<f64> {
        let layout = objective.layout().with_fixed(index, value)?;
        let objective = objective.with_layout(layout);
        let layout = objective.layout();
        if layout.n_free() == 0 {
            let params = layout.to_external(&layout.initial_theta());
            return Ok(self.evaluate(&params)?.all.deviance);
        }
        let out = maximize(&objective, layout.initial_theta(), self, &self.options().mle_opts)?;
        Ok(-2.0 * out.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dataset::data::Dataset,
        fit::options::FitOptions,
        spectrum::{expr::Expr, function::SpecFunction},
    };
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Preconditions (not fitted, bad index, zero points).
    // - Fixed scans: the default range, deltas and a minimum at the optimum.
    // - Profile scans never lying above fixed scans.
    // -------------------------------------------------------------------------

    fn fitted(mode: ScanMode) -> FitSession {
        let flux = SpecFunction::new(
            "fJ_pl",
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
        .with_errors(&[0.1, 0.05])
        .unwrap();
        let x: Vec<f64> = (0..8).map(|i| 18.85 + 0.1 * i as f64).collect();
        let counts = vec![420.0, 260.0, 150.0, 95.0, 52.0, 33.0, 21.0, 11.0];
        let ds = Dataset::new("a", "", x, vec![0.05; 8], counts, vec![5e19; 8]).unwrap();

        let mut s = FitSession::with_options(FitOptions { scan_mode: mode, ..FitOptions::default() });
        s.set_flux_fun(flux, None);
        s.add(ds, None).unwrap();
        s
    }

    #[test]
    // Purpose
    // -------
    // Scans need a fit, a valid index and at least one point.
    //
    // Given
    // -----
    // - An unfitted session, then the fitted one.
    //
    // Expect
    // ------
    // - `NotFitted`, `ParameterIndexOutOfRange`, `InvalidArgument`.
    fn scan_preconditions() {
        let mut s = fitted(ScanMode::Fixed);
        assert_eq!(s.scan_parameter(0, 5, 0.0, 0.0, false).unwrap_err(), SpecError::NotFitted);
        s.fit().unwrap();
        assert_eq!(
            s.scan_parameter(2, 5, 0.0, 0.0, false).unwrap_err(),
            SpecError::ParameterIndexOutOfRange { index: 2, len: 2 }
        );
        assert!(matches!(
            s.scan_parameter(0, 0, 0.0, 0.0, false),
            Err(SpecError::InvalidArgument { name: "n_points", .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // A fixed scan over the default range is minimal at the fitted value.
    //
    // Given
    // -----
    // - 5 points over best ± 2σ of the slope, with deltas.
    //
    // Expect
    // ------
    // - Offsets −2σ … 2σ, the middle delta chi2 is 0, the ends are positive
    //   and the scan leaves the session parameters untouched.
    fn fixed_scan_default_range() {
        // Arrange
        let mut s = fitted(ScanMode::Fixed);
        let out = s.fit().unwrap();

        // Act
        let scan = s.scan_parameter(1, 5, 0.0, 0.0, true).unwrap();

        // Assert
        let err = out.errors[1];
        assert_eq!(scan.len(), 5);
        assert_relative_eq!(scan.values[0], -2.0 * err, epsilon = 1e-12);
        assert_relative_eq!(scan.values[4], 2.0 * err, epsilon = 1e-12);
        assert_relative_eq!(scan.chi2[2], 0.0, epsilon = 1e-9);
        assert!(scan.chi2[0] > 0.0 && scan.chi2[4] > 0.0);
        assert_eq!(s.current_parameters(), out.parameters);
    }

    #[test]
    // Purpose
    // -------
    // Profiling can only lower chi2 relative to holding parameters fixed.
    //
    // Given
    // -----
    // - The same explicit grid scanned in both modes, without deltas.
    //
    // Expect
    // ------
    // - profile chi2 ≤ fixed chi2 at every point (up to solver tolerance).
    fn profile_never_above_fixed() {
        let mut fixed = fitted(ScanMode::Fixed);
        let mut profile = fitted(ScanMode::Profile);
        let best = fixed.fit().unwrap().parameters[1];
        profile.fit().unwrap();

        let a = fixed.scan_parameter(1, 3, best - 0.1, best + 0.1, false).unwrap();
        let b = profile.scan_parameter(1, 3, best - 0.1, best + 0.1, false).unwrap();

        assert_eq!(b.mode, ScanMode::Profile);
        for (f, p) in a.chi2.iter().zip(&b.chi2) {
            assert!(*p <= *f + 1e-6, "profile {p} above fixed {f}");
        }
    }
}
