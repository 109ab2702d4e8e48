//! Parameter transforms between model space and optimizer space.
//!
//! A fitted parameter `p` is declared with a start value, a step size and
//! optional limits `(lo, hi)`. The optimizer sees an internal coordinate `u`:
//!
//! - Unbounded: `p = start + step·u`, so `u = 0` is the start point and one
//!   unit of `u` is one step.
//! - Bounded: `p = lo + (hi − lo)·(sin u + 1)/2`, which keeps every trial
//!   point inside `[lo, hi]` without clamping. Starts on or past a limit are
//!   pulled inside by [`BOUND_MARGIN`] so that `dp/du` is nonzero there.
//!
//! Errors on `u` are propagated to `p` with [`delta_method`].
use ndarray::{Array1, Array2};

/// Eigenvalues at or below this are treated as zero in pseudo-inverses.
pub const EIGEN_EPS: f64 = 1e-12;

/// Smallest limit width (`hi − lo`) that counts as a bound.
pub const GENERAL_TOL: f64 = 1e-12;

/// Fraction of the half-width kept between a bounded start and its limits.
pub const BOUND_MARGIN: f64 = 1e-2;

/// Mapping between a model parameter and its internal coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamTransform {
    Unbounded { start: f64, step: f64 },
    Bounded { lo: f64, hi: f64 },
}

impl ParamTransform {
    /// Pick the transform for a parameter declared as `(start, step, limits)`.
    ///
    /// Limits with `hi − lo ≤ GENERAL_TOL` (including `(0, 0)`) mean
    /// unbounded. A non-positive or non-finite step falls back to 1.
    pub fn new(start: f64, step: f64, limits: (f64, f64)) -> Self {
        let (lo, hi) = limits;
        if hi - lo > GENERAL_TOL {
            ParamTransform::Bounded { lo, hi }
        } else {
            let step = if step.is_finite() && step > 0.0 { step } else { 1.0 };
            ParamTransform::Unbounded { start, step }
        }
    }

    /// Model-space value at internal coordinate `u`.
    pub fn to_external(&self, u: f64) -> f64 {
        match *self {
            ParamTransform::Unbounded { start, step } => start + step * u,
            ParamTransform::Bounded { lo, hi } => lo + (hi - lo) * 0.5 * (u.sin() + 1.0),
        }
    }

    /// Internal coordinate of `p`; bounded values closer to a limit than
    /// `BOUND_MARGIN` of the half-width are moved inside it.
    pub fn to_internal(&self, p: f64) -> f64 {
        match *self {
            ParamTransform::Unbounded { start, step } => (p - start) / step,
            ParamTransform::Bounded { lo, hi } => {
                let edge = 1.0 - BOUND_MARGIN;
                let s = (2.0 * (p - lo) / (hi - lo) - 1.0).clamp(-edge, edge);
                s.asin()
            }
        }
    }

    /// `dp/du` at internal coordinate `u`.
    pub fn derivative(&self, u: f64) -> f64 {
        match *self {
            ParamTransform::Unbounded { step, .. } => step,
            ParamTransform::Bounded { lo, hi } => 0.5 * (hi - lo) * u.cos(),
        }
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self, ParamTransform::Bounded { .. })
    }
}

/// Map an internal covariance into model space.
///
/// The transforms act coordinate-wise, so the Jacobian is diagonal and
/// `Cov(p)[i, j] = J_i · Cov(u)[i, j] · J_j` with `J = dp/du` at the estimate.
pub fn delta_method(cov_u: &Array2<f64>, jacobian: &Array1<f64>) -> Array2<f64> {
    let mut cov_p = cov_u.clone();
    for ((i, j), v) in cov_p.indexed_iter_mut() {
        *v *= jacobian[i] * jacobian[j];
    }
    cov_p
}
