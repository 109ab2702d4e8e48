//! inference — uncertainty of fitted parameters.
//!
//! Purpose
//! -------
//! Derive covariances and standard errors from the curvature of a fit's
//! cost at the optimum. The fit session calls [`calc_covariance`] in its
//! internal coordinates and maps the result to model parameters with
//! `optimization::numerical_stability::delta_method`.
//!
//! Testing notes
//! -------------
//! - [`hessian`] tests use quadratics with known inverses; end-to-end error
//!   checks live in the integration tests.

pub mod hessian;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::hessian::{calc_covariance, pseudo_inverse, standard_errors};

pub mod prelude {
    pub use super::hessian::{calc_covariance, standard_errors};
}
