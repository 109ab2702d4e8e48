//! optimization — likelihood maximization and parameter transforms.
//!
//! Purpose
//! -------
//! Everything the spectral fit needs to go from a start point to a best
//! point: the L-BFGS driver in [`loglik_optimizer`], the bounded and
//! unbounded coordinate transforms in [`numerical_stability`], and the
//! shared error surface in [`errors`].
//!
//! Conventions
//! -----------
//! - The optimizer works in internal coordinates `u`; the fit layer maps
//!   them to model parameters with [`numerical_stability::transformations`].
//! - Fallible entry points return [`errors::OptResult`]. Model errors raised
//!   inside an objective travel through as `OptError::Model`.
//! - Only the run summary is logged (`log::debug!`); reporting is left to
//!   callers.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
