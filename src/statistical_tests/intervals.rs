//! statistical_tests::intervals — error bars for observed event counts.
//!
//! Purpose
//! -------
//! Supply asymmetric low/high error bars for an observed count `n`, used
//! when binned counts are turned into flux points. Two strategies are
//! provided behind the [`CountInterval`] trait:
//!
//! - [`SqrtInterval`]: symmetric `√n` errors.
//! - [`TabulatedInterval`]: a precomputed curve of `(n − lower, upper − n)`
//!   for `n = 0, 1, …, len−1`, linearly interpolated in `n`, with a `√n`
//!   fallback beyond the table. [`TabulatedInterval::feldman_cousins_68`]
//!   ships the 68.27% Feldman–Cousins band for zero background.
//!
//! Invariants & assumptions
//! ------------------------
//! - Counts are non-negative; negative inputs are clamped to 0.
//! - Tabulated curves are non-empty, have matching low/high lengths and
//!   contain only finite, non-negative widths.
use crate::statistical_tests::errors::{StatError, StatResult};

/// Low and high error bars for an observed count.
pub trait CountInterval {
    /// Return `(low, high)` error bar widths for count `n`.
    fn errors(&self, n: f64) -> (f64, f64);

    fn low(&self, n: f64) -> f64 {
        self.errors(n).0
    }

    fn high(&self, n: f64) -> f64 {
        self.errors(n).1
    }
}

/// Symmetric Poisson errors `(√n, √n)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SqrtInterval;

impl CountInterval for SqrtInterval {
    fn errors(&self, n: f64) -> (f64, f64) {
        let s = n.max(0.0).sqrt();
        (s, s)
    }
}

/// Interpolated interval widths from a precomputed table.
#[derive(Debug, Clone, PartialEq)]
pub struct TabulatedInterval {
    low: Vec<f64>,
    high: Vec<f64>,
}

impl TabulatedInterval {
    /// Build from low and high widths tabulated at `n = 0, 1, …`.
    ///
    /// # Errors
    /// - `StatError::InvalidIntervalTable` if the table is empty, the two
    ///   columns differ in length, or any width is negative or non-finite.
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> StatResult<Self> {
        if low.is_empty() {
            return Err(StatError::InvalidIntervalTable { reason: "table is empty" });
        }
        if low.len() != high.len() {
            return Err(StatError::InvalidIntervalTable {
                reason: "low and high columns differ in length",
            });
        }
        if low.iter().chain(high.iter()).any(|w| !w.is_finite() || *w < 0.0) {
            return Err(StatError::InvalidIntervalTable {
                reason: "widths must be finite and non-negative",
            });
        }
        Ok(Self { low, high })
    }

    /// Build from tabulated `(lower, upper)` confidence limits at `n = 0, 1, …`.
    pub fn from_limits(limits: &[(f64, f64)]) -> StatResult<Self> {
        let (low, high) = limits
            .iter()
            .enumerate()
            .map(|(n, &(lo, hi))| (n as f64 - lo, hi - n as f64))
            .unzip();
        Self::new(low, high)
    }

    /// 68.27% Feldman–Cousins limits for zero background, n = 0..=10.
    pub fn feldman_cousins_68() -> Self {
        const LIMITS: [(f64, f64); 11] = [
            (0.00, 1.29),
            (0.37, 2.75),
            (0.74, 4.25),
            (1.10, 5.30),
            (2.34, 6.78),
            (2.75, 7.81),
            (3.82, 9.28),
            (4.25, 10.30),
            (5.30, 11.32),
            (6.33, 12.79),
            (6.78, 13.81),
        ];
        let low = LIMITS.iter().enumerate().map(|(n, l)| n as f64 - l.0).collect();
        let high = LIMITS.iter().enumerate().map(|(n, l)| l.1 - n as f64).collect();
        Self { low, high }
    }

    /// Number of tabulated points.
    pub fn len(&self) -> usize {
        self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.low.is_empty()
    }
}

impl CountInterval for TabulatedInterval {
    fn errors(&self, n: f64) -> (f64, f64) {
        let n = n.max(0.0);
        let last = self.low.len() - 1;
        if n >= self.low.len() as f64 {
            return SqrtInterval.errors(n);
        }
        let i = (n.floor() as usize).min(last);
        if i == last {
            return (self.low[last], self.high[last]);
        }
        let t = n - i as f64;
        let lerp = |col: &[f64]| col[i] + t * (col[i + 1] - col[i]);
        (lerp(&self.low), lerp(&self.high))
    }
}
