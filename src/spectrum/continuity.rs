//! spectrum::continuity — continuity coefficients of a broken power law.
//!
//! A broken power law with `n` breaks is written per segment as
//! `10^(pcf(i) + slope_{i+1}·(x − xmin))`. The offsets
//!
//! ```text
//! pcf(i) = Σ_{j=0..=i} (slope_j − slope_{j+1}) · (break_j − xmin),   0 ≤ i < n
//! ```
//!
//! make adjacent segments meet at every break. They are returned as
//! expressions over the free parameters, not numbers, so the model stays
//! continuous while the fitter moves slopes and breaks.
use crate::spectrum::expr::Expr;

/// Parameter slot of slope `k` in `[norm, slope_0..slope_n, break_0..break_{n-1}]`.
pub fn slope_index(k: usize) -> usize {
    k + 1
}

/// Parameter slot of break `j` for a model with `n_breaks` breaks.
pub fn break_index(n_breaks: usize, j: usize) -> usize {
    n_breaks + 2 + j
}

/// Continuity offset `pcf(i)` for a model with `n_breaks` breaks.
///
/// Returns the constant 0 when `n_breaks == 0` or `i >= n_breaks`.
pub fn continuity_coefficient(i: usize, n_breaks: usize, xmin: f64) -> Expr {
    if n_breaks == 0 || i >= n_breaks {
        return Expr::Const(0.0);
    }
    let terms = (0..=i)
        .map(|j| {
            Expr::product(vec![
                Expr::sub(Expr::Par(slope_index(j)), Expr::Par(slope_index(j + 1))),
                Expr::sub(Expr::Par(break_index(n_breaks, j)), Expr::Const(xmin)),
            ])
        })
        .collect();
    Expr::sum(terms)
}
