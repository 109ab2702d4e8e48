//! Errors of the optimizer layer: configuration, derivatives, solver
//! backend and model failures raised inside an objective.
use argmin::core::{ArgminError, Error};

use crate::spectrum::errors::SpecError;

/// Result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Objective ----
    /// The objective has no analytic gradient; finite differences are used.
    GradientNotImplemented,
    /// The spectral model failed while evaluating the objective.
    Model(Box<SpecError>),
    /// The internal parameter vector has a non-finite entry.
    InvalidThetaInput { index: usize, value: f64 },
    /// The cost came back NaN or infinite.
    NonFiniteCost { value: f64 },

    // ---- Derivatives ----
    GradientDimMismatch { expected: usize, found: usize },
    InvalidGradient { index: usize, value: f64, reason: &'static str },
    HessianDimMismatch { expected: usize, found: (usize, usize) },
    InvalidHessian { row: usize, col: usize, value: f64 },

    // ---- Options ----
    InvalidTolGrad { tol: f64, reason: &'static str },
    InvalidTolCost { tol: f64, reason: &'static str },
    InvalidMaxIter { max_iter: usize, reason: &'static str },
    NoTolerancesProvided,
    InvalidLineSearch { name: String, reason: &'static str },
    InvalidLBFGSMem { mem: usize, reason: &'static str },

    // ---- Solver result ----
    InvalidThetaHat { index: usize, value: f64, reason: &'static str },
    MissingThetaHat,

    // ---- argmin ----
    /// An `ArgminError`, tagged with its kind.
    Argmin { kind: &'static str, text: String },
    /// Any other error surfaced by the solver backend.
    Backend { text: String },
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptError::GradientNotImplemented => write!(f, "Analytic gradient not implemented"),
            OptError::Model(err) => write!(f, "{err}"),
            OptError::InvalidThetaInput { index, value } => {
                write!(f, "Invalid theta input at index {index}: {value}, must be finite")
            }
            OptError::NonFiniteCost { value } => write!(f, "Non-finite cost value: {value}"),

            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient dimension mismatch: expected {expected}, found {found}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Invalid gradient at index {index}: {value}: {reason}")
            }
            OptError::HessianDimMismatch { expected, found } => write!(
                f,
                "Hessian dimension mismatch: expected ({expected}, {expected}), found {found:?}"
            ),
            OptError::InvalidHessian { row, col, value } => {
                write!(f, "Invalid Hessian at ({row}, {col}): {value}, must be finite")
            }

            OptError::InvalidTolGrad { tol, reason } => {
                write!(f, "Invalid gradient tolerance {tol}: {reason}")
            }
            OptError::InvalidTolCost { tol, reason } => {
                write!(f, "Invalid cost change tolerance {tol}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OptError::NoTolerancesProvided => write!(f, "No stopping tolerance provided"),
            OptError::InvalidLineSearch { name, reason } => {
                write!(f, "Invalid line searcher '{name}': {reason}")
            }
            OptError::InvalidLBFGSMem { mem, reason } => {
                write!(f, "Invalid L-BFGS memory {mem}: {reason}")
            }

            OptError::InvalidThetaHat { index, value, reason } => {
                write!(f, "Invalid fitted parameter at index {index}: {value}: {reason}")
            }
            OptError::MissingThetaHat => write!(f, "Solver finished without a best parameter vector"),

            OptError::Argmin { kind, text } => write!(f, "argmin {kind}: {text}"),
            OptError::Backend { text } => write!(f, "Solver backend error: {text}"),
        }
    }
}

fn argmin_kind(err: &ArgminError) -> &'static str {
    match err {
        ArgminError::InvalidParameter { .. } => "invalid parameter",
        ArgminError::NotImplemented { .. } => "not implemented",
        ArgminError::NotInitialized { .. } => "not initialized",
        ArgminError::ConditionViolated { .. } => "condition violated",
        ArgminError::CheckpointNotFound { .. } => "checkpoint not found",
        ArgminError::PotentialBug { .. } => "potential bug",
        ArgminError::ImpossibleError { .. } => "impossible error",
        _ => "error",
    }
}

impl From<Error> for OptError {
    /// Recover an `OptError` that travelled through argmin, otherwise tag the
    /// argmin error.
    fn from(err: Error) -> Self {
        let err = match err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        let err = match err.downcast::<SpecError>() {
            Ok(spec_err) => return spec_err.into(),
            Err(err) => err,
        };
        match err.downcast::<ArgminError>() {
            Ok(argmin_err) => {
                OptError::Argmin { kind: argmin_kind(&argmin_err), text: argmin_err.to_string() }
            }
            Err(err) => OptError::Backend { text: err.to_string() },
        }
    }
}

impl From<SpecError> for OptError {
    fn from(err: SpecError) -> Self {
        match err {
            SpecError::Optimization(inner) => inner,
            other => OptError::Model(Box::new(other)),
        }
    }
}
