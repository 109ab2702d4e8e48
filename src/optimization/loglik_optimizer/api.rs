//! Entry point: maximize a [`LogLikelihood`] with L-BFGS.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        OptimOutcome, Theta,
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, LogLikelihood, MLEOptions},
    },
};

/// Maximize `ℓ(θ)` starting from `theta0`.
///
/// Runs `f.check` first, then builds L-BFGS with the line search named in
/// `opts` and runs it on `c(θ) = -ℓ(θ)`. `data` is passed by reference to
/// every evaluation; the spectral fit passes its session here.
///
/// Errors
/// ------
/// - Whatever `f.check` reports.
/// - Solver construction and runtime errors as `OptError`.
///
/// Example
/// -------
/// ```
/// use ndarray::array;
/// use specfit::optimization::errors::OptResult;
/// use specfit::optimization::loglik_optimizer::{LogLikelihood, MLEOptions, Theta, maximize};
///
/// // Poisson deviance of 12 observed counts against a rate exp(θ₀).
/// struct Rate;
/// impl LogLikelihood for Rate {
///     type Data = f64;
///     fn value(&self, theta: &Theta, observed: &f64) -> OptResult<f64> {
///         let mu = theta[0].exp();
///         Ok(-((mu - observed) + observed * (observed / mu).ln()))
///     }
///     fn check(&self, _: &Theta, _: &f64) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let out = maximize(&Rate, array![1.0], &12.0, &MLEOptions::default())?;
/// assert!((out.theta_hat[0].exp() - 12.0).abs() < 1e-3);
/// # Ok::<(), specfit::optimization::errors::OptError>(())
/// ```
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}
