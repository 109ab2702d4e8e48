//! Runs a configured L-BFGS solver and normalizes the final state.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, LogLikelihood, MLEOptions, OptimOutcome, Theta, adapter::ArgMinAdapter,
    },
};
#[cfg(feature = "obs_slog")]
use argmin::core::{CostFunction, Gradient};
use argmin::core::{Executor, State};
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;

/// Execute `solver` on `problem` starting from `theta0`.
///
/// `opts.tols.max_iter` caps the iteration count. With the `obs_slog`
/// feature and `opts.verbose`, a terminal slog observer is attached and the
/// starting point is logged once.
///
/// Errors
/// ------
/// - argmin runtime errors (line-search failures, objective errors raised
///   inside the solver) converted through `From<argmin::core::Error>`;
///   objective errors come back as the `OptError` they started as.
/// - Validation errors from [`OptimOutcome::new`].
pub fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &MLEOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: argmin::core::Solver<
            ArgMinAdapter<'a, F>,
            argmin::core::IterState<Theta, Grad, (), (), (), f64>,
        > + Send
        + 'static,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_initial_state(&theta0, &problem)?;
    }
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(theta0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    log::debug!(
        "L-BFGS finished after {iterations} iterations: {termination:?}, best cost {:.6}",
        result.get_best_cost()
    );
    OptimOutcome::new(
        result.take_best_param(),
        -result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        grad,
    )
}

#[cfg(feature = "obs_slog")]
fn log_initial_state<F>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()>
where
    F: LogLikelihood,
{
    let ll0 = -problem.cost(theta0)?;
    let g0n = problem.gradient(theta0).ok().map(|g| g.l2_norm());
    log::info!(
        "start: ell(theta0) = {:.6}{}",
        ll0,
        g0n.map(|n| format!(", ||grad|| = {n:.6}")).unwrap_or_default()
    );
    Ok(())
}
