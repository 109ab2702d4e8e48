//! fit — joint maximum-likelihood fits of a flux model to several datasets.
//!
//! Purpose
//! -------
//! Combine registered datasets, a shared flux model and shared
//! energy-scale correction parameters into one binned-Poisson likelihood,
//! maximize it, and report parameters, errors and goodness of fit.
//!
//! Key behaviors
//! -------------
//! - [`FitSession`] owns datasets and functions; [`FitSession::fit`] runs
//!   L-BFGS through [`FitObjective`], which receives the session as its data.
//! - [`ParameterLayout`] declares parameters (start, step, limits), handles
//!   fixed parameters and maps errors back to model space.
//! - [`CorrectionSchema`] pins the correction parameters all datasets share.
//! - [`FitSession::scan_parameter`] produces chi2 scans; [`FitStatistics`]
//!   summarizes the three deviance sums.
//!
//! Downstream usage
//! ----------------
//! - The Python bindings wrap a single [`FitSession`].
pub mod collection;
pub mod layout;
pub mod objective;
pub mod options;
pub mod scan;
pub mod schema;
pub mod session;
pub mod stats;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::collection::{DatasetCollection, DatasetEntry};
pub use self::layout::{ParamSpec, ParameterLayout};
pub use self::objective::FitObjective;
pub use self::options::{FitOptions, ScanMode};
pub use self::scan::ParameterScan;
pub use self::schema::CorrectionSchema;
pub use self::session::{
    DEFAULT_EMAX, DEFAULT_EMIN, DEFAULT_WINDOW, FitOutcome, FitSession, NullSignificance,
};
pub use self::stats::{FitStatistic, FitStatistics, chi2_tail_prob};

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::options::{FitOptions, ScanMode};
    pub use super::schema::CorrectionSchema;
    pub use super::session::{FitOutcome, FitSession};
}
