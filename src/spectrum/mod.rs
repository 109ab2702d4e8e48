//! spectrum — broken-power-law flux models and their building blocks.
//!
//! Purpose
//! -------
//! Provide everything needed to describe a cosmic-ray energy spectrum as a
//! function of `x = log10(E/eV)`: a small differentiable expression tree,
//! closed-form broken-power-law formulas with algebraic continuity, named
//! parametric functions, numeric integration in linear energy and a catalogue
//! of preset models and energy-scale corrections.
//!
//! Key behaviors
//! -------------
//! - [`expr::Expr`] evaluates against parameter snapshots and differentiates
//!   symbolically with respect to `x` or any parameter.
//! - [`formula::FormulaBuilder`] encodes continuity across every break via
//!   [`continuity::continuity_coefficient`].
//! - [`function::SpecFunction`] pairs a tree with parameter metadata;
//!   [`bpl::BrokenPowerLaw`] adds the structural inputs of a BPL.
//! - [`integrate::NumericIntegrator`] integrates in linear energy and splits
//!   at breaks.
//!
//! Invariants & assumptions
//! ------------------------
//! - A BPL with `n` breaks has `2n + 2` parameters laid out as
//!   `[norm, slope_0..slope_n, break_0..break_{n-1}]`.
//! - Evaluation never mutates a function; fitted values are written back by
//!   the owner of the function.
//!
//! Downstream usage
//! ----------------
//! - `dataset` evaluates fluxes and corrections per bin.
//! - `fit` differentiates them to build analytic likelihood gradients.
pub mod bpl;
pub mod continuity;
pub mod errors;
pub mod expr;
pub mod formula;
pub mod function;
pub mod integrate;
pub mod presets;
pub mod variant;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::bpl::BrokenPowerLaw;
pub use self::continuity::continuity_coefficient;
pub use self::errors::{ErrorKind, SpecError, SpecResult};
pub use self::expr::{Cmp, Expr, Wrt};
pub use self::formula::{FormulaBuilder, make_formula};
pub use self::function::{FunctionSnapshot, SpecFunction, e3j_companion_name};
pub use self::integrate::NumericIntegrator;
pub use self::presets::{combined_correction, correction_preset, flux_preset, shoulder_null};
pub use self::variant::FluxVariant;

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::bpl::BrokenPowerLaw;
    pub use super::errors::{SpecError, SpecResult};
    pub use super::expr::Expr;
    pub use super::function::SpecFunction;
    pub use super::presets::{combined_correction, correction_preset, flux_preset};
    pub use super::variant::FluxVariant;
}
