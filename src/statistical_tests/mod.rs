//! statistical_tests — count statistics for binned Poisson data.
//!
//! Purpose
//! -------
//! Collect the small statistical helpers used around a spectral fit:
//! Poisson chance probabilities of observed vs expected counts, conversion
//! between tail probabilities and Gaussian sigma, and error bars for
//! observed counts.
//!
//! Key behaviors
//! -------------
//! - [`poisson_chance`] evaluates one-sided Poisson tails via `statrs`.
//! - [`pchance_to_sigma`] / [`sigma_to_pchance`] translate between
//!   probabilities and sigma units.
//! - [`CountInterval`] abstracts count error bars, with [`SqrtInterval`] and
//!   [`TabulatedInterval`] implementations.
//!
//! Conventions
//! -----------
//! - Validation failures surface as [`StatError`]; invalid probabilities in
//!   reporting helpers degrade to 0 sigma with a `log::warn!`.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each helper and compare against direct pmf
//!   sums and known Gaussian quantiles.

pub mod errors;
pub mod intervals;
pub mod poisson_chance;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{StatError, StatResult};
pub use self::intervals::{CountInterval, SqrtInterval, TabulatedInterval};
pub use self::poisson_chance::{
    pchance_to_sigma, poisson_chance, poisson_chance_sigma, sigma_to_pchance,
};

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::errors::{StatError, StatResult};
    pub use super::intervals::{CountInterval, SqrtInterval, TabulatedInterval};
    pub use super::poisson_chance::{pchance_to_sigma, poisson_chance, sigma_to_pchance};
}
