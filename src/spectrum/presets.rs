//! spectrum::presets — ready-made flux models and energy-scale corrections.
//!
//! Flux presets are broken power laws named `fJ<n>B_<start>`: `n` breaks,
//! starting at 10^18 eV (`_18`, below the ankle) or 10^18.8 eV (`_19`).
//! Corrections come in two families, constant and nonlinear, combined into
//! a multiplicative factor `1 + constant(x) + nonlinear(x)` by
//! [`combined_correction`].
use crate::spectrum::{
    bpl::BrokenPowerLaw,
    expr::Expr,
    function::SpecFunction,
};

/// Names of the flux presets.
pub const FLUX_PRESETS: [&str; 4] = ["fJ2B_18", "fJ3B_18", "fJ1B_19", "fJ2B_19"];

/// Names of the constant correction presets.
pub const CONSTANT_CORRECTIONS: [&str; 3] = ["fNOCONSTCORR", "fCONSTCORR", "fCONSTCORRPAR"];

/// Names of the nonlinear correction presets.
pub const NONLINEAR_CORRECTIONS: [&str; 5] =
    ["fNONONLINCORR", "fNONLINCORR0", "fNONLINCORR1", "fNONLINCORRPAR0", "fNONLINCORRPAR1"];

/// Domain of every correction preset.
const CORRECTION_RANGE: (f64, f64) = (17.0, 21.0);

/// Look up a flux preset by name.
pub fn flux_preset(name: &str) -> Option<BrokenPowerLaw> {
    let (n, scale, xmin, names, values): (i32, f64, f64, &str, &str) = match name {
        "fJ2B_18" => {
            (2, 1e-30, 18.0, "const,p1,p2,p3,logEank,logEgzk", "2.0,-3.25,-2.7,-4.2,18.75,19.75")
        }
        "fJ3B_18" => (
            3,
            1e-30,
            18.0,
            "const,p1,p2,p3,p4,logEank,logEshld,logEgzk",
            "2.0,-3.25,-2.7,-3.0,-5.1,18.75,19.1,19.7",
        ),
        "fJ1B_19" => (1, 1e-33, 18.8, "const,p1,p2,logEgzk", "2.0,-2.7,-4.2,19.75"),
        "fJ2B_19" => {
            (2, 1e-33, 18.8, "const,p1,p2,p3,logEshld,logEgzk", "6.0,-2.8,-2.9,-5.1,19.1,19.7")
        }
        _ => return None,
    };
    let steps = vec!["0.1"; 2 * n as usize + 2].join(",");
    BrokenPowerLaw::from_cs(name, n, "J", scale, xmin, 21.0, names, values, &steps).ok()
}

/// Look up a constant or nonlinear correction preset by name.
pub fn correction_preset(name: &str) -> Option<SpecFunction> {
    let (lo, hi) = CORRECTION_RANGE;
    let x_above = |edge: Expr| Expr::lt(edge, Expr::X);
    let function = match name {
        "fNOCONSTCORR" | "fNONONLINCORR" => SpecFunction::new(name, Expr::Const(0.0), lo, hi),
        "fCONSTCORR" => SpecFunction::new(name, Expr::Const(0.052), lo, hi),
        "fCONSTCORRPAR" => SpecFunction::new(name, Expr::Par(0), lo, hi)
            .with_cs(Some("S0"), Some("0.052"), Some("0.01"))
            .ok()?,
        "fNONLINCORR0" => SpecFunction::new(
            name,
            Expr::product(vec![x_above(Expr::Const(19.5)), Expr::Const(0.08)]),
            lo,
            hi,
        ),
        "fNONLINCORR1" => SpecFunction::new(
            name,
            Expr::product(vec![
                x_above(Expr::Const(19.0)),
                Expr::Const(0.1),
                Expr::sub(Expr::X, Expr::Const(19.0)),
            ]),
            lo,
            hi,
        ),
        "fNONLINCORRPAR0" => SpecFunction::new(
            name,
            Expr::product(vec![x_above(Expr::Par(0)), Expr::Par(1)]),
            lo,
            hi,
        )
        .with_cs(Some("logEs,S"), Some("19.5,0.08"), Some("0.1,0.01"))
        .ok()?,
        "fNONLINCORRPAR1" => SpecFunction::new(
            name,
            Expr::product(vec![
                x_above(Expr::Par(0)),
                Expr::Par(1),
                Expr::sub(Expr::X, Expr::Par(0)),
            ]),
            lo,
            hi,
        )
        .with_cs(Some("logEs,slope"), Some("19.5,0.1"), Some("0.1,0.01"))
        .ok()?,
        _ => return None,
    };
    Some(function)
}

/// Multiplicative energy-scale correction `1 + constant + nonlinear`.
///
/// Parameters of `constant` precede those of `nonlinear`.
pub fn combined_correction(constant: &SpecFunction, nonlinear: &SpecFunction) -> SpecFunction {
    SpecFunction::combine("fENCORR", Expr::Const(1.0), &[(1.0, constant), (1.0, nonlinear)])
}

/// Null hypothesis of "no feature between the shoulder and the cutoff".
///
/// Copies `flux`, pushes `logEshld` and `logEgzk` to 21 so that the spectrum
/// continues unbroken past the shoulder, and restricts the domain to the
/// fitted `[logEshld, logEgzk]` interval. Returns `None` for models without
/// both breaks.
pub fn shoulder_null(flux: &SpecFunction) -> Option<SpecFunction> {
    let shld = flux.par_index("logEshld")?;
    let gzk = flux.par_index("logEgzk")?;
    let (lo, hi) = (flux.values()[shld], flux.values()[gzk]);
    let mut null = flux.clone();
    null.rename("fJ_null");
    null.set_value(shld, 21.0);
    null.set_value(gzk, 21.0);
    null.set_range(lo, hi);
    Some(null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Every preset name resolves; unknown names do not.
    // - Correction shapes and their combination.
    // - The shoulder null hypothesis.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Every advertised preset resolves with consistent metadata.
    //
    // Given
    // -----
    // - All names in the preset tables and an unknown name.
    //
    // Expect
    // ------
    // - `Some` for each preset with steps 0.1 on flux models; `None` otherwise.
    fn all_presets_resolve() {
        for name in FLUX_PRESETS {
            let f = flux_preset(name).unwrap();
            assert_eq!(f.function().name(), name);
            assert!(f.function().errors().iter().all(|e| *e == 0.1));
        }
        for name in CONSTANT_CORRECTIONS.iter().chain(NONLINEAR_CORRECTIONS.iter()) {
            assert!(correction_preset(name).is_some(), "{name}");
        }
        assert!(flux_preset("fJ9B_18").is_none());
        assert!(correction_preset("fNOPE").is_none());
    }

    #[test]
    // Purpose
    // -------
    // The combined correction adds the two shapes to one.
    //
    // Given
    // -----
    // - fCONSTCORRPAR and fNONLINCORRPAR1 combined.
    //
    // Expect
    // ------
    // - Parameters S0, logEs, slope; value 1.052 below 19.5 and
    //   1.052 + 0.1·(x − 19.5) above.
    fn combined_correction_adds_shapes() {
        // Arrange
        let c = correction_preset("fCONSTCORRPAR").unwrap();
        let n = correction_preset("fNONLINCORRPAR1").unwrap();

        // Act
        let corr = combined_correction(&c, &n);

        // Assert
        assert_eq!(corr.names(), &["S0", "logEs", "slope"]);
        assert_relative_eq!(corr.eval(19.0), 1.052, epsilon = 1e-12);
        assert_relative_eq!(corr.eval(20.0), 1.052 + 0.05, epsilon = 1e-12);
        assert_eq!((corr.xmin(), corr.xmax()), (17.0, 21.0));
    }

    #[test]
    // Purpose
    // -------
    // The shoulder null removes both upper breaks inside its window.
    //
    // Given
    // -----
    // - fJ3B_18 and fJ1B_19.
    //
    // Expect
    // ------
    // - Null on [19.1, 19.7] equal to the unbroken p2 extrapolation; no
    //   null for a model without a shoulder.
    fn shoulder_null_extends_segment() {
        let flux = flux_preset("fJ3B_18").unwrap().into_function();
        let null = shoulder_null(&flux).unwrap();
        assert_eq!((null.xmin(), null.xmax()), (19.1, 19.7));
        assert_relative_eq!(null.eval(19.05), flux.eval(19.05), max_relative = 1e-12);
        assert!(null.eval(19.5) > flux.eval(19.5));
        assert!(shoulder_null(&flux_preset("fJ1B_19").unwrap().into_function()).is_none());
    }
}
