//! fit::layout — model parameters as seen by the optimizer.
//!
//! Purpose
//! -------
//! Declare every fit parameter (name, start, step, limits) in the combined
//! order `[flux params][correction params]` and map between that model
//! vector and the optimizer's internal vector θ.
//!
//! Key behaviors
//! -------------
//! - Parameters with step 0 are fixed: they keep their start value and do
//!   not appear in θ.
//! - Each free parameter gets a [`ParamTransform`]; bounded ones use the sine
//!   map so trial points never leave `[lo, hi]`.
//! - Gradients are chained from model space into θ, and covariances are
//!   mapped back with the delta method. Fixed parameters get error 0.
use ndarray::{Array1, Array2};

use crate::{
    fit::schema::CorrectionSchema,
    optimization::{
        loglik_optimizer::{Grad, Theta},
        numerical_stability::transformations::{ParamTransform, delta_method},
    },
    spectrum::{
        errors::{SpecError, SpecResult},
        function::SpecFunction,
    },
};

/// One declared fit parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub start: f64,
    pub step: f64,
    pub limits: (f64, f64),
}

impl ParamSpec {
    pub fn is_fixed(&self) -> bool {
        self.step == 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterLayout {
    specs: Vec<ParamSpec>,
    n_flux: usize,
    free: Vec<usize>,
    transforms: Vec<ParamTransform>,
}

impl ParameterLayout {
    /// Declare the flux parameters followed by the correction schema.
    pub fn new(flux: &SpecFunction, schema: &CorrectionSchema) -> Self {
        let mut specs = Vec::with_capacity(flux.n_params() + schema.len());
        for i in 0..flux.n_params() {
            specs.push(ParamSpec {
                name: flux.names()[i].clone(),
                start: flux.values()[i],
                step: flux.errors()[i],
                limits: flux.limits()[i],
            });
        }
        for i in 0..schema.len() {
            specs.push(ParamSpec {
                name: schema.names()[i].clone(),
                start: schema.values()[i],
                step: schema.steps()[i],
                limits: schema.limits()[i],
            });
        }
        Self::from_specs(specs, flux.n_params())
    }

    /// Layout over explicit specs; the first `n_flux` belong to the flux.
    pub fn from_specs(specs: Vec<ParamSpec>, n_flux: usize) -> Self {
        let free: Vec<usize> = (0..specs.len()).filter(|&i| !specs[i].is_fixed()).collect();
        let transforms = free
            .iter()
            .map(|&i| ParamTransform::new(specs[i].start, specs[i].step, specs[i].limits))
            .collect();
        ParameterLayout { specs, n_flux, free, transforms }
    }

    /// Copy with parameter `index` fixed at `value`.
    ///
    /// # Errors
    /// `SpecError::ParameterIndexOutOfRange` for an unknown index.
    pub fn with_fixed(&self, index: usize, value: f64) -> SpecResult<Self> {
        let mut specs = self.specs.clone();
        let spec = specs
            .get_mut(index)
            .ok_or(SpecError::ParameterIndexOutOfRange { index, len: self.len() })?;
        spec.start = value;
        spec.step = 0.0;
        Ok(Self::from_specs(specs, self.n_flux))
    }

    /// Copy with every start value replaced by `starts`.
    ///
    /// # Errors
    /// `SpecError::ParameterLengthMismatch` when `starts` has the wrong length.
    pub fn with_starts(&self, starts: &[f64]) -> SpecResult<Self> {
        if starts.len() != self.len() {
            return Err(SpecError::ParameterLengthMismatch {
                expected: self.len(),
                found: starts.len(),
            });
        }
        let mut specs = self.specs.clone();
        for (spec, &s) in specs.iter_mut().zip(starts) {
            spec.start = s;
        }
        Ok(Self::from_specs(specs, self.n_flux))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn n_flux(&self) -> usize {
        self.n_flux
    }

    pub fn n_free(&self) -> usize {
        self.free.len()
    }

    pub fn free_indices(&self) -> &[usize] {
        &self.free
    }

    pub fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }

    pub fn names(&self) -> Vec<String> {
        self.specs.iter().map(|s| s.name.clone()).collect()
    }

    /// Internal coordinates of the start values.
    pub fn initial_theta(&self) -> Theta {
        self.free
            .iter()
            .zip(&self.transforms)
            .map(|(&i, t)| t.to_internal(self.specs[i].start))
            .collect()
    }

    /// Full model vector at θ.
    pub fn to_external(&self, theta: &Theta) -> Vec<f64> {
        let mut params: Vec<f64> = self.specs.iter().map(|s| s.start).collect();
        for ((&i, t), &u) in self.free.iter().zip(&self.transforms).zip(theta.iter()) {
            params[i] = t.to_external(u);
        }
        params
    }

    /// `∂f/∂θ` from the model-space gradient `∂f/∂p`.
    pub fn chain_gradient(&self, theta: &Theta, model_grad: &[f64]) -> Grad {
        self.free
            .iter()
            .zip(&self.transforms)
            .zip(theta.iter())
            .map(|((&i, t), &u)| model_grad[i] * t.derivative(u))
            .collect()
    }

    /// Model-space covariance and errors from an internal covariance.
    ///
    /// Rows and columns of fixed parameters are zero.
    pub fn external_covariance(&self, theta: &Theta, cov_u: &Array2<f64>) -> Array2<f64> {
        let jacobian: Array1<f64> =
            self.transforms.iter().zip(theta.iter()).map(|(t, &u)| t.derivative(u)).collect();
        let cov_free = delta_method(cov_u, &jacobian);
        let n = self.len();
        let mut cov = Array2::<f64>::zeros((n, n));
        for (a, &i) in self.free.iter().enumerate() {
            for (b, &j) in self.free.iter().enumerate() {
                cov[[i, j]] = cov_free[[a, b]];
            }
        }
        cov
    }
}
