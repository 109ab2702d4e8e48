//! Session-level fit configuration.
use crate::optimization::loglik_optimizer::MLEOptions;

/// How the other parameters behave while one parameter is scanned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanMode {
    /// Hold them at their fitted values.
    #[default]
    Fixed,
    /// Refit the free ones at every scan point.
    Profile,
}

impl std::str::FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(ScanMode::Fixed),
            "profile" => Ok(ScanMode::Profile),
            _ => Err(format!("unknown scan mode '{s}'; use 'fixed' or 'profile'")),
        }
    }
}

/// Options of [`FitSession::fit`](super::FitSession::fit) and
/// [`FitSession::scan_parameter`](super::FitSession::scan_parameter).
///
/// Default: [`MLEOptions::default`], fixed scans, Hessian errors on.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    pub mle_opts: MLEOptions,
    pub scan_mode: ScanMode,
    /// Derive parameter errors from the Hessian after the fit.
    pub hessian_errors: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions { mle_opts: MLEOptions::default(), scan_mode: ScanMode::Fixed, hessian_errors: true }
    }
}
