//! loglik_optimizer::types — numeric aliases and L-BFGS wiring.
//!
//! Parameters, gradients and Hessians are `ndarray` containers over `f64`
//! so that the objective can be handed straight to argmin. For a spectral
//! fit `Theta` holds the *internal* coordinates of the free parameters
//! (fixed parameters are not part of it, bounded ones are sine-mapped);
//! see `fit::layout`.
use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    quasinewton::LBFGS,
};
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Internal parameter vector seen by the optimizer.
pub type Theta = Array1<f64>;

/// Gradient with the shape of [`Theta`].
pub type Grad = Array1<f64>;

/// Dense `n × n` second-derivative matrix.
pub type Hessian = Array2<f64>;

/// Scalar objective value.
pub type Cost = f64;

/// argmin function-evaluation counters, e.g. `"cost_count"`.
pub type FnEvalMap = HashMap<String, u64>;

/// Default L-BFGS history length.
pub const DEFAULT_LBFGS_MEM: usize = 7;

pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;

pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;

pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;
