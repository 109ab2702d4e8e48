//! numerical_stability — coordinate transforms for bounded fits.
//!
//! Purpose
//! -------
//! Keep the optimizer in an unconstrained space while the fit declares
//! parameters with start values, step sizes and limits. [`ParamTransform`]
//! maps each coordinate, [`delta_method`] carries the internal covariance
//! back to model space.
//!
//! Invariants & assumptions
//! ------------------------
//! - Transforms act one coordinate at a time, so Jacobians are diagonal.
//! - Bounded transforms never leave `[lo, hi]`, whatever the optimizer
//!   proposes.
//!
//! Testing notes
//! -------------
//! - Unit tests check round trips, clamping, the Jacobian against a finite
//!   difference and the covariance mapping.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{EIGEN_EPS, GENERAL_TOL, ParamTransform, delta_method};

pub mod prelude {
    pub use super::transformations::{EIGEN_EPS, ParamTransform, delta_method};
}
