//! statistical_tests::poisson_chance — chance probabilities of Poisson counts.
//!
//! Purpose
//! -------
//! Quantify how surprising an observed event count is under a Poisson
//! expectation, and translate between one-sided tail probabilities and
//! Gaussian significance ("sigma") units. These helpers back the
//! null-hypothesis significance reported by the fit session.
//!
//! Key behaviors
//! -------------
//! - [`poisson_chance`] returns the tail probability on the side of the
//!   expectation the observation falls on: `P(X ≤ n)` for a deficit and
//!   `P(X ≥ n)` for an excess.
//! - [`pchance_to_sigma`] maps a one-sided tail probability `p` to
//!   `√2·erfc⁻¹(2p)`, returning 0 for `p ≥ 0.5`.
//! - [`sigma_to_pchance`] is the inverse map `½(1 − erf(s/√2))`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Observed counts are non-negative integers; expected counts are finite
//!   and non-negative.
//! - A zero expectation is degenerate: observing nothing is certain
//!   (probability 1) and observing anything is impossible (probability 0).
//!
//! Conventions
//! -----------
//! - Probabilities outside `(0, 1]` passed to [`pchance_to_sigma`] yield
//!   0 sigma and a `log::warn!` diagnostic rather than an error, so that
//!   reporting code can print a value for every dataset.
//!
//! Testing notes
//! -------------
//! - Unit tests check both tails against direct pmf sums, the degenerate
//!   zero-expectation case, and the sigma round trip.
use crate::statistical_tests::errors::{StatError, StatResult};
use statrs::distribution::{DiscreteCDF, Poisson};
use statrs::function::erf::{erf, erfc_inv};
use std::f64::consts::SQRT_2;

/// poisson_chance — one-sided chance probability of an observed count.
///
/// Parameters
/// ----------
/// - `n_observed`: `u64`
///   Observed number of events.
/// - `n_expected`: `f64`
///   Poisson mean under the hypothesis being tested.
///
/// Returns
/// -------
/// `StatResult<f64>`
///   - `P(X ≤ n_observed)` when `n_observed ≤ n_expected`.
///   - `P(X ≥ n_observed)` otherwise.
///
/// Errors
/// ------
/// - `StatError::InvalidExpectation`
///   Returned when `n_expected` is negative or non-finite.
pub fn poisson_chance(n_observed: u64, n_expected: f64) -> StatResult<f64> {
    if !n_expected.is_finite() || n_expected < 0.0 {
        return Err(StatError::InvalidExpectation { value: n_expected });
    }
    if n_expected == 0.0 {
        return Ok(if n_observed == 0 { 1.0 } else { 0.0 });
    }
    let poisson = Poisson::new(n_expected)
        .map_err(|_| StatError::InvalidExpectation { value: n_expected })?;
    if (n_observed as f64) <= n_expected {
        Ok(poisson.cdf(n_observed))
    } else {
        // n_observed >= 1 here since n_observed > n_expected > 0.
        Ok(poisson.sf(n_observed - 1))
    }
}

/// Same as [`poisson_chance`] but expressed in sigma units.
pub fn poisson_chance_sigma(n_observed: u64, n_expected: f64) -> StatResult<f64> {
    Ok(pchance_to_sigma(poisson_chance(n_observed, n_expected)?))
}

/// pchance_to_sigma — convert a one-sided tail probability to sigma units.
///
/// Parameters
/// ----------
/// - `pchance`: `f64`
///   One-sided chance probability.
///
/// Returns
/// -------
/// `f64`
///   `√2·erfc⁻¹(2p)` for `p ∈ (0, 0.5)`; 0 for `p ∈ [0.5, 1]`; 0 with a
///   warning for `p` outside `(0, 1]`.
pub fn pchance_to_sigma(pchance: f64) -> f64 {
    if !(pchance > 0.0 && pchance <= 1.0) {
        log::warn!("invalid chance probability {pchance}, must be in (0.0, 1.0] range");
        return 0.0;
    }
    if pchance >= 0.5 {
        return 0.0;
    }
    SQRT_2 * erfc_inv(2.0 * pchance)
}

/// Convert a significance in sigma units to a one-sided tail probability.
pub fn sigma_to_pchance(sigma: f64) -> f64 {
    0.5 * (1.0 - erf(sigma / SQRT_2))
}
