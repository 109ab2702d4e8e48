//! dataset — binned count spectra and their Poisson likelihood.
//!
//! Purpose
//! -------
//! Represent one experiment's binned measurement and evaluate it against a
//! flux model with an optional energy-scale correction.
//!
//! Key behaviors
//! -------------
//! - [`Dataset`] validates columns, restricts ranges and derives flux points.
//! - [`Dataset::calc_log_likelihood`] sums binned Poisson deviances and
//!   [`Dataset::accumulate_gradient`] their analytic gradient.
//! - [`Dataset::eval_null`] compares counts with a null-hypothesis flux.
//! - [`parse_table`] and [`Dataset::from_table_file`] read the four-column
//!   text format; [`Dataset::to_table_file`] writes it.
//!
//! Invariants & assumptions
//! ------------------------
//! - A correction `c(x)` shifts the energy at which the flux is evaluated to
//!   `x + log10 c(x)` and multiplies the predicted count by `c(x)`.
pub mod data;
pub mod likelihood;
pub mod null;
pub mod table;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::data::{DEFAULT_RESTRICTED_MIN, Dataset, FluxPoints, linear_bin_size};
pub use self::likelihood::{
    LikelihoodPair, LikelihoodSummary, ModelDerivatives, ZERO_COUNT_CUTOFF, deviance,
    deviance_slope,
};
pub use self::null::NullCounts;
pub use self::table::{TableColumns, parse_table};

pub mod prelude {
    pub use super::data::Dataset;
    pub use super::likelihood::{LikelihoodPair, LikelihoodSummary};
    pub use super::null::NullCounts;
}
