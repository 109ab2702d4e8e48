//! statistical_tests::errors — error types for count statistics.
//!
//! Purpose
//! -------
//! Provide the error enum and result alias used by the Poisson chance
//! probability helpers, the fit-quality statistics and the count-interval
//! tables. Failures here are all input-validation problems; none of the
//! routines in this subtree retry or repair bad inputs.
//!
//! Key behaviors
//! -------------
//! - Define [`StatResult`] and [`StatError`] as the canonical result and
//!   error types for [`poisson_chance`](super::poisson_chance) and
//!   [`intervals`](super::intervals).
//! - Attach `Display` messages that embed the offending value.
//! - Map into `PyValueError` at the Python boundary when the
//!   `python-bindings` feature is enabled.
//!
//! Conventions
//! -----------
//! - Counts are carried as `f64` so that rescaled or interpolated counts can
//!   share the same surface; negative or non-finite counts are rejected.
//! - Higher layers convert [`StatError`] into
//!   [`SpecError`](crate::spectrum::errors::SpecError) via `From`.

#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

pub type StatResult<T> = Result<T, StatError>;

/// StatError — validation failures for count statistics.
///
/// Variants
/// --------
/// - `InvalidCount { value }`
///   Observed count is negative or non-finite.
/// - `InvalidExpectation { value }`
///   Expected count is non-finite.
/// - `InvalidDegreesOfFreedom { ndof }`
///   Degrees of freedom must be positive for a χ² tail probability.
/// - `InvalidIntervalTable { reason }`
///   Tabulated interval curve is empty, ragged or has negative entries.
#[derive(Debug, Clone, PartialEq)]
pub enum StatError {
    InvalidCount { value: f64 },
    InvalidExpectation { value: f64 },
    InvalidDegreesOfFreedom { ndof: i64 },
    InvalidIntervalTable { reason: &'static str },
}

impl std::error::Error for StatError {}

impl std::fmt::Display for StatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatError::InvalidCount { value } => {
                write!(f, "Invalid count {value}: must be finite and non-negative.")
            }
            StatError::InvalidExpectation { value } => {
                write!(f, "Invalid expected count {value}: must be finite.")
            }
            StatError::InvalidDegreesOfFreedom { ndof } => {
                write!(f, "Invalid degrees of freedom {ndof}: must be positive.")
            }
            StatError::InvalidIntervalTable { reason } => {
                write!(f, "Invalid interval table: {reason}")
            }
        }
    }
}

#[cfg(feature = "python-bindings")]
impl From<StatError> for PyErr {
    fn from(err: StatError) -> PyErr {
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
    // - Embedding of payload values into `Display` messages.
    //
    // They intentionally DO NOT cover:
    // - The `From<StatError> for PyErr` conversion, which needs the Python
    //   C API at link time.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Verify that `InvalidCount` reports the offending value.
    //
    // Given
    // -----
    // - `StatError::InvalidCount { value: -3.0 }`.
    //
    // Expect
    // ------
    // - The message contains "-3".
    fn invalid_count_includes_payload_in_display() {
        // Arrange
        let err = StatError::InvalidCount { value: -3.0 };

        // Act
        let msg = err.to_string();

        // Assert
        assert!(msg.contains("-3"), "Display message should include the count.\nGot: {msg}");
    }

    #[test]
    // Purpose
    // -------
    // Verify that `InvalidDegreesOfFreedom` reports the offending ndof.
    //
    // Given
    // -----
    // - `StatError::InvalidDegreesOfFreedom { ndof: 0 }`.
    //
    // Expect
    // ------
    // - The message is non-empty and contains "0".
    fn invalid_ndof_includes_payload_in_display() {
        // Arrange
        let err = StatError::InvalidDegreesOfFreedom { ndof: 0 };

        // Act
        let msg = err.to_string();

        // Assert
        assert!(!msg.trim().is_empty());
        assert!(msg.contains('0'));
    }
}
