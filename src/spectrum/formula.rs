//! spectrum::formula — closed-form broken-power-law formulas.
//!
//! Purpose
//! -------
//! Build the expression tree of a continuous piecewise power law in
//! log-energy with an arbitrary number of free breaks, either as a
//! differential flux (`J`, `EJ`, `E3J`) or as its closed-form integral
//! above `x` in linear energy (`J>`, `E2J>`).
//!
//! Key behaviors
//! -------------
//! - Parameter layout is `[norm, slope_0..slope_n, break_0..break_{n-1}]`,
//!   so a model with `n` breaks has `2n + 2` parameters.
//! - Segments are selected with indicators: `x < b_0` for the first,
//!   `b_i ≤ x < b_{i+1}` for the middle ones and `b_{n-1} ≤ x` for the last.
//!   Continuity is carried by [`continuity_coefficient`] terms.
//! - Integral variants sum the tail of every segment above `x`:
//!   `∫_x^∞ J dE` with `E = 10^x`, prefactor `norm·scale·10^xmin`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Negative break counts are clamped to 0.
//! - Breaks are expected, not enforced, to be strictly increasing inside
//!   the domain; the formulas stay well defined otherwise but lose their
//!   physical meaning.
//! - Integral formulas assume the last slope is below −1 so that the tail
//!   converges.
//!
//! Downstream usage
//! ----------------
//! - [`BrokenPowerLaw`](crate::spectrum::bpl::BrokenPowerLaw) wraps the
//!   built tree together with parameter metadata.
use crate::spectrum::{
    continuity::{break_index, continuity_coefficient, slope_index},
    errors::SpecResult,
    expr::Expr,
    variant::FluxVariant,
};

/// Inputs of a broken-power-law formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormulaBuilder {
    pub n_breaks: usize,
    pub variant: FluxVariant,
    pub scale: f64,
    pub xmin: f64,
}

impl FormulaBuilder {
    /// Create a builder; a negative `n_breaks` is clamped to 0.
    pub fn new(n_breaks: i32, variant: FluxVariant, scale: f64, xmin: f64) -> Self {
        Self { n_breaks: n_breaks.max(0) as usize, variant, scale, xmin }
    }

    /// Number of parameters of the built formula.
    pub fn n_params(&self) -> usize {
        2 * self.n_breaks + 2
    }

    /// Build the expression tree.
    pub fn build(&self) -> Expr {
        if self.variant.is_integral() { self.integral() } else { self.differential() }
    }

    // ---- Differential variants ----

    fn differential(&self) -> Expr {
        let n = self.n_breaks;
        let body = if n == 0 {
            Expr::pow10(self.slope_term(0))
        } else {
            let mut segments = Vec::with_capacity(n + 1);
            segments.push(Expr::product(vec![
                Expr::lt(Expr::X, self.brk(0)),
                Expr::pow10(self.slope_term(0)),
            ]));
            for i in 0..n - 1 {
                segments.push(Expr::product(vec![
                    Expr::le(self.brk(i), Expr::X),
                    Expr::lt(Expr::X, self.brk(i + 1)),
                    Expr::pow10(Expr::sum(vec![self.pcf(i), self.slope_term(i + 1)])),
                ]));
            }
            segments.push(Expr::product(vec![
                Expr::le(self.brk(n - 1), Expr::X),
                Expr::pow10(Expr::sum(vec![self.pcf(n - 1), self.slope_term(n)])),
            ]));
            Expr::Sum(segments)
        };
        let mut factors = vec![Expr::Par(0), Expr::Const(self.scale)];
        if let Some(weight) = self.energy_weight() {
            factors.push(weight);
        }
        factors.push(body);
        Expr::product(factors)
    }

    // ---- Integral variants ----

    fn integral(&self) -> Expr {
        let n = self.n_breaks;
        let body = if n == 0 {
            let g0 = self.gamma(0);
            Expr::sum(vec![
                Expr::neg(Expr::product(vec![
                    Expr::lt(Expr::X, Expr::Const(self.xmin)),
                    Expr::recip(g0.clone()),
                ])),
                Expr::neg(Expr::product(vec![
                    Expr::le(Expr::Const(self.xmin), Expr::X),
                    Expr::pow10(Expr::product(vec![g0.clone(), self.offset(Expr::X)])),
                    Expr::recip(g0),
                ])),
            ])
        } else {
            let mut pieces = Vec::with_capacity(n + 1);

            // below the first break: rest of segment 0 plus every full tail above
            let g0 = self.gamma(0);
            let mut first = vec![Expr::product(vec![
                Expr::sub(
                    Expr::pow10(Expr::product(vec![g0.clone(), self.offset(self.brk(0))])),
                    Expr::pow10(Expr::product(vec![g0.clone(), self.offset(Expr::X)])),
                ),
                Expr::recip(g0),
            ])];
            first.extend((0..n).map(|j| self.segment_tail(j)));
            pieces.push(Expr::product(vec![Expr::le(Expr::X, self.brk(0)), Expr::sum(first)]));

            for i in 0..n - 1 {
                let g = self.gamma(i + 1);
                let mut inner = vec![Expr::product(vec![
                    Expr::pow10(self.pcf(i)),
                    Expr::sub(
                        Expr::pow10(Expr::product(vec![g.clone(), self.offset(self.brk(i + 1))])),
                        Expr::pow10(Expr::product(vec![g.clone(), self.offset(Expr::X)])),
                    ),
                    Expr::recip(g),
                ])];
                inner.extend((i + 1..n).map(|j| self.segment_tail(j)));
                pieces.push(Expr::product(vec![
                    Expr::lt(self.brk(i), Expr::X),
                    Expr::le(Expr::X, self.brk(i + 1)),
                    Expr::sum(inner),
                ]));
            }

            let g = self.gamma(n);
            pieces.push(Expr::neg(Expr::product(vec![
                Expr::lt(self.brk(n - 1), Expr::X),
                Expr::pow10(Expr::sum(vec![
                    self.pcf(n - 1),
                    Expr::product(vec![g.clone(), self.offset(Expr::X)]),
                ])),
                Expr::recip(g),
            ])));
            Expr::Sum(pieces)
        };
        let mut factors = vec![Expr::Par(0), Expr::Const(self.scale)];
        if let Some(weight) = self.energy_weight() {
            factors.push(weight);
        }
        factors.push(Expr::Const(10f64.powf(self.xmin)));
        factors.push(body);
        Expr::product(factors)
    }

    /// Integral over segment `j + 1` (between `b_j` and `b_{j+1}`, or above
    /// `b_{n-1}` for the last one).
    fn segment_tail(&self, j: usize) -> Expr {
        let n = self.n_breaks;
        let g = self.gamma(j + 1);
        if j + 1 < n {
            Expr::product(vec![
                Expr::pow10(self.pcf(j)),
                Expr::sub(
                    Expr::pow10(Expr::product(vec![g.clone(), self.offset(self.brk(j + 1))])),
                    Expr::pow10(Expr::product(vec![g.clone(), self.offset(self.brk(j))])),
                ),
                Expr::recip(g),
            ])
        } else {
            Expr::neg(Expr::product(vec![
                Expr::pow10(Expr::sum(vec![
                    self.pcf(j),
                    Expr::product(vec![g.clone(), self.offset(self.brk(j))]),
                ])),
                Expr::recip(g),
            ]))
        }
    }

    // ---- Building blocks ----

    fn brk(&self, j: usize) -> Expr {
        Expr::Par(break_index(self.n_breaks, j))
    }

    fn pcf(&self, i: usize) -> Expr {
        continuity_coefficient(i, self.n_breaks, self.xmin)
    }

    /// `e − xmin`.
    fn offset(&self, e: Expr) -> Expr {
        Expr::sub(e, Expr::Const(self.xmin))
    }

    /// `slope_k · (x − xmin)`.
    fn slope_term(&self, k: usize) -> Expr {
        Expr::product(vec![Expr::Par(slope_index(k)), self.offset(Expr::X)])
    }

    /// `1 + slope_k`.
    fn gamma(&self, k: usize) -> Expr {
        Expr::sum(vec![Expr::Const(1.0), Expr::Par(slope_index(k))])
    }

    fn energy_weight(&self) -> Option<Expr> {
        match self.variant.energy_power() {
            0 => None,
            k => Some(Expr::pow10(Expr::product(vec![Expr::Const(k as f64), Expr::X]))),
        }
    }
}

/// make_formula — build a broken-power-law tree from a variant name.
///
/// Parameters
/// ----------
/// - `n_breaks`: `i32`
///   Number of breaks; negative values are treated as 0.
/// - `variant`: `&str`
///   One of `J`, `EJ`, `E3J`, `J>`, `E2J>` (case-insensitive).
/// - `scale`: `f64`
///   Scale factor multiplying the normalization.
/// - `xmin`: `f64`
///   Lower edge of the domain; slopes are measured from here.
///
/// Errors
/// ------
/// - `SpecError::UnknownVariant` when `variant` is not recognized.
pub fn make_formula(n_breaks: i32, variant: &str, scale: f64, xmin: f64) -> SpecResult<Expr> {
    let variant: FluxVariant = variant.parse()?;
    Ok(FormulaBuilder::new(n_breaks, variant, scale, xmin).build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::errors::SpecError;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The zero-break degenerate case and a worked single-segment example.
    // - Continuity across breaks for several break counts.
    // - Energy weights of EJ / E3J and variant parsing errors.
    // - The integral variants against their defining limits.
    //
    // They intentionally DO NOT cover:
    // - Agreement with numeric quadrature; see the integration tests.
    // -------------------------------------------------------------------------

    const XMIN: f64 = 18.0;

    fn params_for(n: usize) -> Vec<f64> {
        let mut p = vec![2.0];
        p.extend((0..=n).map(|k| -2.6 - 0.4 * k as f64));
        p.extend((0..n).map(|j| 18.5 + 0.6 * j as f64));
        p
    }

    #[test]
    // Purpose
    // -------
    // Check the zero-break formula against explicit values.
    //
    // Given
    // -----
    // - n = 0, J, scale 1, xmin 18, params [1e-30, -3].
    //
    // Expect
    // ------
    // - value(18) = 1e-30 and value(19) = 1e-33.
    fn zero_breaks_reduces_to_single_power_law() {
        // Arrange
        let f = make_formula(0, "J", 1.0, XMIN).unwrap();
        let p = [1e-30, -3.0];

        // Act & Assert
        assert_relative_eq!(f.eval(18.0, &p), 1e-30, max_relative = 1e-12);
        assert_relative_eq!(f.eval(19.0, &p), 1e-33, max_relative = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Negative break counts are clamped.
    //
    // Given
    // -----
    // - n = -2.
    //
    // Expect
    // ------
    // - Same tree as n = 0.
    fn negative_breaks_are_clamped() {
        let a = make_formula(-2, "J", 1.0, XMIN).unwrap();
        let b = make_formula(0, "J", 1.0, XMIN).unwrap();
        assert_eq!(a, b);
        assert_eq!(FormulaBuilder::new(-1, FluxVariant::J, 1.0, XMIN).n_params(), 2);
    }

    #[test]
    // Purpose
    // -------
    // The differential model is continuous at every break.
    //
    // Given
    // -----
    // - n = 1..4 with slopes and breaks from `params_for`.
    //
    // Expect
    // ------
    // - Values just below and at each break agree to 1e-6 relative.
    fn differential_is_continuous_at_breaks() {
        for n in 1..=4 {
            let f = make_formula(n as i32, "J", 1e-30, XMIN).unwrap();
            let p = params_for(n);
            for j in 0..n {
                let b = p[n + 2 + j];
                let left = f.eval(b - 1e-9, &p);
                let right = f.eval(b, &p);
                assert_relative_eq!(left, right, max_relative = 1e-6);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // EJ and E3J multiply J by 10^x and 10^(3x).
    //
    // Given
    // -----
    // - n = 2, evaluated at x = 19.3.
    //
    // Expect
    // ------
    // - EJ = 10^x · J and E3J = 10^(3x) · J.
    fn energy_weighted_variants_scale_j() {
        // Arrange
        let p = params_for(2);
        let x = 19.3;
        let j = make_formula(2, "J", 1e-30, XMIN).unwrap().eval(x, &p);

        // Act
        let ej = make_formula(2, "EJ", 1e-30, XMIN).unwrap().eval(x, &p);
        let e3j = make_formula(2, "E3J", 1e-30, XMIN).unwrap().eval(x, &p);

        // Assert
        assert_relative_eq!(ej, 10f64.powf(x) * j, max_relative = 1e-12);
        assert_relative_eq!(e3j, 10f64.powf(3.0 * x) * j, max_relative = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Unknown variants fail and produce no model.
    //
    // Given
    // -----
    // - Variant "E4J".
    //
    // Expect
    // ------
    // - `SpecError::UnknownVariant`.
    fn unknown_variant_is_rejected() {
        assert!(matches!(make_formula(1, "E4J", 1.0, XMIN), Err(SpecError::UnknownVariant { .. })));
    }

    #[test]
    // Purpose
    // -------
    // The zero-break integral matches the analytic tail.
    //
    // Given
    // -----
    // - n = 0, J>, params [1, -3], scale 1, xmin 18, evaluated at x = 18.5.
    //
    // Expect
    // ------
    // - ∫_E^∞ (E'/E0)^-3 dE' = E·(E/E0)^-3/2 with E0 = 10^18.
    fn zero_break_integral_matches_analytic_tail() {
        // Arrange
        let f = make_formula(0, "J>", 1.0, XMIN).unwrap();
        let x: f64 = 18.5;
        let e = 10f64.powf(x);
        let e0 = 10f64.powf(XMIN);

        // Act
        let v = f.eval(x, &[1.0, -3.0]);

        // Assert
        assert_relative_eq!(v, e * (e / e0).powf(-3.0) / 2.0, max_relative = 1e-10);
    }

    #[test]
    // Purpose
    // -------
    // The integral flux is continuous at breaks, decreasing, and E2J> is
    // 10^(2x) times J>.
    //
    // Given
    // -----
    // - n = 3 integral formulas.
    //
    // Expect
    // ------
    // - Left/right agreement at breaks; J>(x1) > J>(x2) for x1 < x2.
    fn integral_is_continuous_and_decreasing() {
        // Arrange
        let n = 3;
        let p = params_for(n);
        let f = make_formula(n as i32, "J>", 1.0, XMIN).unwrap();
        let g = make_formula(n as i32, "E2J>", 1.0, XMIN).unwrap();

        // Act & Assert
        for j in 0..n {
            let b = p[n + 2 + j];
            assert_relative_eq!(f.eval(b, &p), f.eval(b + 1e-9, &p), max_relative = 1e-6);
        }
        let mut prev = f.eval(18.1, &p);
        for k in 1..20 {
            let x = 18.1 + 0.15 * k as f64;
            let v = f.eval(x, &p);
            assert!(v > 0.0 && v < prev, "J> must be positive and decreasing at x = {x}");
            prev = v;
        }
        let x = 19.05;
        assert_relative_eq!(g.eval(x, &p), 10f64.powf(2.0 * x) * f.eval(x, &p), max_relative = 1e-12);
    }
}
