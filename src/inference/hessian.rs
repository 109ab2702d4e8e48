//! inference::hessian — parameter covariance from the curvature of the cost.
//!
//! Purpose
//! -------
//! Turn the Hessian of a fit's cost at its minimum into a covariance matrix
//! and standard errors. For a binned-Poisson fit the cost is `chi2/2`, whose
//! Hessian is the observed information, so its inverse is the covariance of
//! the estimates.
//!
//! Key behaviors
//! -------------
//! - Build the Hessian with [`compute_hessian`] over a gradient map (central
//!   differences of an analytic gradient, with a forward fallback).
//! - Copy it into a `nalgebra::DMatrix` and invert it through a symmetric
//!   eigendecomposition, dropping eigenvalues at or below [`EIGEN_EPS`].
//!
//! Invariants & assumptions
//! ------------------------
//! - The input Hessian is symmetric; `compute_hessian` enforces this.
//! - Directions the data do not constrain get zero variance rather than an
//!   infinite one; callers read a zero error as "not determined".
//!
//! Conventions
//! -----------
//! - No explicit matrix inverse is formed.
//! - Errors are reported via [`OptResult<T>`].
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{Grad, Theta, finite_diff::compute_hessian},
    numerical_stability::EIGEN_EPS,
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// Covariance of `theta_hat` from the gradient map `f` of the cost.
///
/// Errors
/// ------
/// - Any error from [`compute_hessian`].
///
/// Example
/// -------
/// ```rust
/// # use ndarray::array;
/// # use specfit::inference::hessian::{calc_covariance, standard_errors};
/// // cost = 2θ₀² + θ₁²/2, gradient (4θ₀, θ₁)
/// let f = |t: &ndarray::Array1<f64>| array![4.0 * t[0], t[1]];
/// let cov = calc_covariance(&f, &array![0.0, 0.0])?;
/// let se = standard_errors(&cov);
/// assert!((se[0] - 0.5).abs() < 1e-6);
/// assert!((se[1] - 1.0).abs() < 1e-6);
/// # Ok::<(), specfit::optimization::errors::OptError>(())
/// ```
pub fn calc_covariance<F: Fn(&Theta) -> Grad>(f: &F, theta_hat: &Theta) -> OptResult<Array2<f64>> {
    let hessian = compute_hessian(f, theta_hat)?;
    Ok(pseudo_inverse(&hessian))
}

/// Moore–Penrose inverse of a symmetric matrix.
///
/// `A⁺ = Σ_{k: λ_k > EIGEN_EPS} q_k q_kᵀ / λ_k` over the eigenpairs of `A`.
pub fn pseudo_inverse(hessian: &Array2<f64>) -> Array2<f64> {
    let n = hessian.nrows();
    let mut hess_nalg = DMatrix::<f64>::zeros(n, n);
    fill_dmatrix(hessian, &mut hess_nalg);
    let eigen_decomp = hess_nalg.symmetric_eigen();
    let q = eigen_decomp.eigenvectors;
    let mut inv = Array2::<f64>::zeros((n, n));
    for (k, &lambda) in eigen_decomp.eigenvalues.iter().enumerate() {
        if lambda <= EIGEN_EPS {
            continue;
        }
        for i in 0..n {
            for j in 0..n {
                inv[[i, j]] += q[(i, k)] * q[(j, k)] / lambda;
            }
        }
    }
    inv
}

/// Square roots of the covariance diagonal; negative round-off reads as 0.
pub fn standard_errors(cov: &Array2<f64>) -> Array1<f64> {
    cov.diag().mapv(|v| v.max(0.0).sqrt())
}

// ---- Helper methods ----

/// Copy a square `ndarray` matrix into a preallocated `DMatrix`,
/// column by column.
fn fill_dmatrix(src: &Array2<f64>, dst: &mut DMatrix<f64>) {
    let n = src.ncols();
    for j in 0..n {
        for i in 0..src.nrows() {
            dst[(i, j)] = src[[i, j]];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Copying into `DMatrix`.
    // - Inversion of a correlated 2×2 information matrix.
    // - Dropping a flat direction in a singular matrix.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // `fill_dmatrix` copies values unchanged.
    //
    // Given
    // -----
    // - [[2, 0.5], [0.5, 1]].
    //
    // Expect
    // ------
    // - Identical entries in the `DMatrix`.
    fn fill_dmatrix_copies_entries() {
        let src = array![[2.0, 0.5], [0.5, 1.0]];
        let mut dst = DMatrix::<f64>::zeros(2, 2);
        fill_dmatrix(&src, &mut dst);
        assert_eq!(dst[(0, 0)], 2.0);
        assert_eq!(dst[(0, 1)], 0.5);
        assert_eq!(dst[(1, 0)], 0.5);
        assert_eq!(dst[(1, 1)], 1.0);
    }

    #[test]
    // Purpose
    // -------
    // A full-rank Hessian is inverted exactly.
    //
    // Given
    // -----
    // - The gradient map of cost = θ₀² + θ₀θ₁ + θ₁², so H = [[2, 1], [1, 2]].
    //
    // Expect
    // ------
    // - Cov = H⁻¹ = [[2, −1], [−1, 2]] / 3.
    fn covariance_of_correlated_quadratic() {
        // Arrange
        let f = |t: &Theta| array![2.0 * t[0] + t[1], t[0] + 2.0 * t[1]];

        // Act
        let cov = calc_covariance(&f, &array![0.1, -0.2]).unwrap();

        // Assert
        assert_relative_eq!(cov[[0, 0]], 2.0 / 3.0, epsilon = 1e-6);
        assert_relative_eq!(cov[[0, 1]], -1.0 / 3.0, epsilon = 1e-6);
        assert_relative_eq!(cov[[1, 1]], 2.0 / 3.0, epsilon = 1e-6);
        let se = standard_errors(&cov);
        assert_relative_eq!(se[0], (2.0f64 / 3.0).sqrt(), epsilon = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // Flat directions get no variance.
    //
    // Given
    // -----
    // - diag(4, 0).
    //
    // Expect
    // ------
    // - diag(0.25, 0).
    fn singular_direction_is_dropped() {
        let inv = pseudo_inverse(&array![[4.0, 0.0], [0.0, 0.0]]);
        assert_relative_eq!(inv[[0, 0]], 0.25, epsilon = 1e-12);
        assert_eq!(inv[[1, 1]], 0.0);
    }
}
