//! Declared layout of the shared correction parameters.
//!
//! All datasets of a session share one block of correction parameters. The
//! block is declared once as a [`CorrectionSchema`]; every correction
//! function registered afterwards must take exactly these parameters, in
//! this order and under these names. Datasets without a correction ignore
//! the block.
use crate::spectrum::{
    errors::{SpecError, SpecResult},
    function::SpecFunction,
};

/// Names, start values, step sizes and limits of the correction parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrectionSchema {
    names: Vec<String>,
    values: Vec<f64>,
    steps: Vec<f64>,
    limits: Vec<(f64, f64)>,
}

impl CorrectionSchema {
    /// No correction parameters.
    pub fn none() -> Self {
        Self::default()
    }

    /// Copy the parameter metadata of `correction`.
    pub fn from_function(correction: &SpecFunction) -> Self {
        CorrectionSchema {
            names: correction.names().to_vec(),
            values: correction.values().to_vec(),
            steps: correction.errors().to_vec(),
            limits: correction.limits().to_vec(),
        }
    }

    /// Check that `correction` takes exactly the declared parameters.
    ///
    /// # Errors
    /// `SpecError::SchemaMismatch` naming `dataset` when the parameter count
    /// or names differ.
    pub fn validate(&self, dataset: &str, correction: Option<&SpecFunction>) -> SpecResult<()> {
        let Some(correction) = correction else {
            return Ok(());
        };
        if correction.n_params() != self.len() {
            return Err(SpecError::SchemaMismatch {
                dataset: dataset.to_string(),
                reason: "parameter count differs from the declared correction schema",
            });
        }
        if correction.names() != self.names.as_slice() {
            return Err(SpecError::SchemaMismatch {
                dataset: dataset.to_string(),
                reason: "parameter names differ from the declared correction schema",
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn steps(&self) -> &[f64] {
        &self.steps
    }

    pub fn limits(&self) -> &[(f64, f64)] {
        &self.limits
    }

    pub(crate) fn set_values(&mut self, values: &[f64]) {
        self.values.copy_from_slice(values);
    }

    pub(crate) fn set_steps(&mut self, steps: &[f64]) {
        self.steps.copy_from_slice(steps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::presets::correction_preset;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover schema construction from a correction and the two
    // mismatch reasons.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Corrections with the declared parameters pass; others are rejected.
    //
    // Given
    // -----
    // - A schema from `fNONLINCORRPAR0` (logEs, S).
    //
    // Expect
    // ------
    // - Same preset and `None` pass; `fCONSTCORRPAR` fails on count; a renamed
    //   copy fails on names.
    fn validate_checks_count_and_names() {
        // Arrange
        let declared = correction_preset("fNONLINCORRPAR0").unwrap();
        let schema = CorrectionSchema::from_function(&declared);
        let other = correction_preset("fCONSTCORRPAR").unwrap();
        let renamed = declared.clone().with_names(&["a", "b"]).unwrap();

        // Act & Assert
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.values(), &[19.5, 0.08]);
        assert!(schema.validate("TA", Some(&declared)).is_ok());
        assert!(schema.validate("TA", None).is_ok());
        assert!(matches!(
            schema.validate("TA", Some(&other)),
            Err(SpecError::SchemaMismatch { reason, .. }) if reason.contains("count")
        ));
        assert!(matches!(
            schema.validate("TA", Some(&renamed)),
            Err(SpecError::SchemaMismatch { reason, .. }) if reason.contains("names")
        ));
        assert!(CorrectionSchema::none().validate("A", Some(&declared)).is_err());
    }
}
