//! spectrum::errors — unified error type for spectral models, datasets and fits.
//!
//! Purpose
//! -------
//! Provide a single error enum, [`SpecError`], shared by the formula builder,
//! the numeric integrator, the dataset layer and the fit session, together
//! with the [`SpecResult`] alias used throughout those modules.
//!
//! Key behaviors
//! -------------
//! - Group failures into three families exposed through [`SpecError::kind`]:
//!   validation (bad inputs), numerical (ill-conditioned evaluation) and
//!   lookup (unknown names or indices). Optimizer failures are carried
//!   through unchanged as [`ErrorKind::Optimization`].
//! - Attach human-readable `Display` messages with the offending payload.
//! - Convert to and from [`OptError`] so that model errors raised inside the
//!   objective survive a round trip through the optimizer.
//!
//! Conventions
//! -----------
//! - Indices are 0-based.
//! - Accessors that return a neutral default (0.0, `None`) on lookup misses
//!   log a warning instead of returning these errors; the `Lookup` variants
//!   are used where a `Result` is already part of the signature.
#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

use crate::optimization::errors::OptError;
use crate::statistical_tests::errors::StatError;

/// Result alias for spectral modeling and fitting operations.
pub type SpecResult<T> = Result<T, SpecError>;

/// Coarse classification of [`SpecError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Numerical,
    Lookup,
    Optimization,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpecError {
    // ---- Validation ----
    /// Parallel input sequences differ in length.
    LengthMismatch { column: &'static str, expected: usize, found: usize },

    /// An input value is NaN or ±inf.
    NonFiniteInput { column: &'static str, index: usize, value: f64 },

    /// Flux variant name not understood.
    UnknownVariant { name: String },

    /// Integration end lies below integration start.
    ReversedBounds { start: f64, end: f64 },

    /// A dataset with this name is already registered.
    DuplicateDataset { name: String },

    /// Fit requested with no registered datasets.
    NoDatasets,

    /// Fit requested before a flux function was installed.
    NoFluxFunction,

    /// Correction function does not match the declared parameter schema.
    SchemaMismatch { dataset: String, reason: &'static str },

    /// Parameter vector has the wrong length.
    ParameterLengthMismatch { expected: usize, found: usize },

    /// Comma-separated list could not be parsed.
    InvalidList { text: String, reason: &'static str },

    /// Row of a four-column table is malformed.
    MalformedTableRow { line: usize, reason: &'static str },

    /// Scalar argument out of its admissible range.
    InvalidArgument { name: &'static str, value: f64, reason: &'static str },

    /// Reading or writing a table file failed.
    Io { path: String, text: String },

    // ---- Numerical ----
    /// Integrand magnitude at the start point is not representable.
    IntegrandUnderflow { x: f64, value: f64 },

    /// Observed counts in a bin where the model predicts (almost) nothing.
    UndefinedDeviance { dataset: String, index: usize, observed: f64, predicted: f64 },

    /// Adaptive quadrature ran out of subdivisions.
    QuadratureNotConverged { start: f64, end: f64, estimate: f64, error: f64 },

    // ---- Lookup ----
    UnknownDataset { name: String },

    DatasetIndexOutOfRange { index: usize, len: usize },

    ParameterIndexOutOfRange { index: usize, len: usize },

    UnknownParameter { name: String },

    // ---- Optimization ----
    /// Error raised by the optimizer layer.
    Optimization(OptError),

    /// Operation requires a completed fit.
    NotFitted,

    // ---- Statistics ----
    Statistics(StatError),
}

impl SpecError {
    /// Classify the error into one of the [`ErrorKind`] families.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SpecError::LengthMismatch { .. }
            | SpecError::NonFiniteInput { .. }
            | SpecError::UnknownVariant { .. }
            | SpecError::ReversedBounds { .. }
            | SpecError::DuplicateDataset { .. }
            | SpecError::NoDatasets
            | SpecError::NoFluxFunction
            | SpecError::SchemaMismatch { .. }
            | SpecError::ParameterLengthMismatch { .. }
            | SpecError::InvalidList { .. }
            | SpecError::MalformedTableRow { .. }
            | SpecError::InvalidArgument { .. }
            | SpecError::Io { .. }
            | SpecError::NotFitted
            | SpecError::Statistics(_) => ErrorKind::Validation,
            SpecError::IntegrandUnderflow { .. }
            | SpecError::UndefinedDeviance { .. }
            | SpecError::QuadratureNotConverged { .. } => ErrorKind::Numerical,
            SpecError::UnknownDataset { .. }
            | SpecError::DatasetIndexOutOfRange { .. }
            | SpecError::ParameterIndexOutOfRange { .. }
            | SpecError::UnknownParameter { .. } => ErrorKind::Lookup,
            SpecError::Optimization(_) => ErrorKind::Optimization,
        }
    }
}

impl std::error::Error for SpecError {}

impl std::fmt::Display for SpecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Validation ----
            SpecError::LengthMismatch { column, expected, found } => {
                write!(f, "Column '{column}' has length {found}, expected {expected}")
            }
            SpecError::NonFiniteInput { column, index, value } => {
                write!(f, "Column '{column}' has a non-finite value at index {index}: {value}")
            }
            SpecError::UnknownVariant { name } => {
                write!(
                    f,
                    "Function type '{name}' not understood; use 'J', 'J>', 'EJ', 'E3J', or 'E2J>'"
                )
            }
            SpecError::ReversedBounds { start, end } => {
                write!(f, "Integration end ({end}) must not be below start ({start})")
            }
            SpecError::DuplicateDataset { name } => {
                write!(f, "Dataset '{name}' is already registered")
            }
            SpecError::NoDatasets => write!(f, "No datasets registered for fitting"),
            SpecError::NoFluxFunction => write!(f, "Flux function has not been set"),
            SpecError::SchemaMismatch { dataset, reason } => {
                write!(f, "Correction function of dataset '{dataset}' rejected: {reason}")
            }
            SpecError::ParameterLengthMismatch { expected, found } => {
                write!(f, "Parameter vector has length {found}, expected {expected}")
            }
            SpecError::InvalidList { text, reason } => {
                write!(f, "Failed to parse '{text}': {reason}")
            }
            SpecError::MalformedTableRow { line, reason } => {
                write!(f, "Malformed table row at line {line}: {reason}")
            }
            SpecError::InvalidArgument { name, value, reason } => {
                write!(f, "Invalid {name} = {value}: {reason}")
            }
            SpecError::Io { path, text } => write!(f, "I/O error on '{path}': {text}"),

            // ---- Numerical ----
            SpecError::IntegrandUnderflow { x, value } => {
                write!(f, "Integrand at x = {x} is not representable ({value:e})")
            }
            SpecError::UndefinedDeviance { dataset, index, observed, predicted } => {
                write!(
                    f,
                    "Dataset '{dataset}' bin {index}: {observed} observed but {predicted:e} predicted"
                )
            }
            SpecError::QuadratureNotConverged { start, end, estimate, error } => {
                write!(
                    f,
                    "Quadrature on [{start}, {end}] did not converge: {estimate:e} ± {error:e}"
                )
            }

            // ---- Lookup ----
            SpecError::UnknownDataset { name } => write!(f, "No dataset named '{name}'"),
            SpecError::DatasetIndexOutOfRange { index, len } => {
                write!(f, "Dataset index {index} out of range (have {len})")
            }
            SpecError::ParameterIndexOutOfRange { index, len } => {
                write!(f, "Parameter index {index} out of range (have {len})")
            }
            SpecError::UnknownParameter { name } => write!(f, "No parameter named '{name}'"),

            // ---- Optimization ----
            SpecError::Optimization(err) => write!(f, "Optimization failed: {err}"),
            SpecError::NotFitted => write!(f, "Session has not been fitted yet"),

            // ---- Statistics ----
            SpecError::Statistics(err) => write!(f, "{err}"),
        }
    }
}

impl From<OptError> for SpecError {
    fn from(err: OptError) -> Self {
        match err {
            OptError::Model(inner) => *inner,
            other => SpecError::Optimization(other),
        }
    }
}

impl From<StatError> for SpecError {
    fn from(err: StatError) -> Self {
        SpecError::Statistics(err)
    }
}

/// Convert a [`SpecError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl From<SpecError> for PyErr {
    fn from(err: SpecError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Error classification via `kind`.
    // - Round trip of model errors through `OptError::Model`.
    //
    // They intentionally DO NOT cover:
    // - Every `Display` string; those are exercised indirectly by callers.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Check that representative variants land in the expected family.
    //
    // Given
    // -----
    // - One variant from each family.
    //
    // Expect
    // ------
    // - `kind` reports Validation, Numerical, Lookup and Optimization.
    fn kind_classifies_each_family() {
        // Arrange
        let validation = SpecError::DuplicateDataset { name: "TA".to_string() };
        let numerical = SpecError::IntegrandUnderflow { x: 18.0, value: 0.0 };
        let lookup = SpecError::UnknownDataset { name: "HiRes".to_string() };
        let optimization = SpecError::Optimization(OptError::MissingThetaHat);

        // Act & Assert
        assert_eq!(validation.kind(), ErrorKind::Validation);
        assert_eq!(numerical.kind(), ErrorKind::Numerical);
        assert_eq!(lookup.kind(), ErrorKind::Lookup);
        assert_eq!(optimization.kind(), ErrorKind::Optimization);
    }

    #[test]
    // Purpose
    // -------
    // Ensure a model error wrapped by the objective is recovered unchanged.
    //
    // Given
    // -----
    // - An `UndefinedDeviance` error boxed into `OptError::Model`.
    //
    // Expect
    // ------
    // - Converting back yields the original numerical error.
    fn model_error_survives_optimizer_round_trip() {
        // Arrange
        let original = SpecError::UndefinedDeviance {
            dataset: "auger".to_string(),
            index: 3,
            observed: 12.0,
            predicted: 0.0,
        };

        // Act
        let back: SpecError = OptError::from(original.clone()).into();

        // Assert
        assert_eq!(back, original);
        assert_eq!(back.kind(), ErrorKind::Numerical);
    }
}
