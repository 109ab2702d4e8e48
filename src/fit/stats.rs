//! Goodness-of-fit summaries for the three deviance sums.
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::{
    dataset::likelihood::{LikelihoodPair, LikelihoodSummary},
    statistical_tests::errors::{StatError, StatResult},
};

/// Upper-tail χ² probability `1 − F(chi2; ndof)`.
///
/// # Errors
/// `StatError::InvalidDegreesOfFreedom` when `ndof ≤ 0`.
pub fn chi2_tail_prob(chi2: f64, ndof: i64) -> StatResult<f64> {
    if ndof <= 0 {
        return Err(StatError::InvalidDegreesOfFreedom { ndof });
    }
    let dist =
        ChiSquared::new(ndof as f64).map_err(|_| StatError::InvalidDegreesOfFreedom { ndof })?;
    Ok(dist.sf(chi2.max(0.0)))
}

/// Deviance, degrees of freedom, reduced deviance and χ² probability of one
/// likelihood variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitStatistic {
    pub lgl: f64,
    pub ndof: i64,
    /// `lgl / ndof`, or `lgl` when `ndof ≤ 0`.
    pub reduced: f64,
    /// `None` when `ndof ≤ 0`.
    pub prob: Option<f64>,
}

impl FitStatistic {
    pub fn new(pair: LikelihoodPair, npar: usize) -> Self {
        let ndof = pair.bins as i64 - npar as i64;
        let reduced = if ndof > 0 { pair.deviance / ndof as f64 } else { pair.deviance };
        let prob = chi2_tail_prob(pair.deviance, ndof).ok();
        FitStatistic { lgl: pair.deviance, ndof, reduced, prob }
    }
}

/// [`FitStatistic`] for every bin, bins with counts and the restricted set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitStatistics {
    pub all: FitStatistic,
    pub nonzero: FitStatistic,
    pub restricted: FitStatistic,
}

impl FitStatistics {
    pub fn new(summary: &LikelihoodSummary, npar: usize) -> Self {
        FitStatistics {
            all: FitStatistic::new(summary.all, npar),
            nonzero: FitStatistic::new(summary.nonzero, npar),
            restricted: FitStatistic::new(summary.restricted, npar),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover the χ² tail probability and the degenerate ndof path.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // The tail probability matches known values.
    //
    // Given
    // -----
    // - chi2 = 2 with 2 dof (tail e^{-1}); ndof = 0.
    //
    // Expect
    // ------
    // - e^{-1}; `InvalidDegreesOfFreedom { ndof: 0 }`.
    fn tail_probability_known_value() {
        assert_relative_eq!(chi2_tail_prob(2.0, 2).unwrap(), (-1.0f64).exp(), epsilon = 1e-12);
        assert_eq!(chi2_tail_prob(1.0, 0), Err(StatError::InvalidDegreesOfFreedom { ndof: 0 }));
    }

    #[test]
    // Purpose
    // -------
    // Statistics subtract the parameter count and fall back when ndof ≤ 0.
    //
    // Given
    // -----
    // - 10 bins with deviance 8 and 4 parameters; 3 bins with 4 parameters.
    //
    // Expect
    // ------
    // - ndof 6, reduced 8/6, a probability; ndof −1, reduced = lgl, no
    //   probability.
    fn statistic_from_pair() {
        // Arrange
        let good = LikelihoodPair::new(8.0, 10);
        let short = LikelihoodPair::new(5.0, 3);

        // Act
        let s = FitStatistic::new(good, 4);
        let d = FitStatistic::new(short, 4);

        // Assert
        assert_eq!(s.ndof, 6);
        assert_relative_eq!(s.reduced, 8.0 / 6.0);
        assert!(s.prob.is_some_and(|p| p > 0.0 && p < 1.0));
        assert_eq!(d.ndof, -1);
        assert_eq!(d.reduced, 5.0);
        assert_eq!(d.prob, None);
    }
}
