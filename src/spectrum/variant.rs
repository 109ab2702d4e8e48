//! spectrum::variant — which physical quantity a flux formula represents.
use crate::spectrum::errors::{SpecError, SpecResult};
use std::fmt;
use std::str::FromStr;

/// Flux quantity produced by a broken-power-law formula.
///
/// - `J`: differential flux.
/// - `EJ`, `E3J`: differential flux weighted by `E` or `E³`.
/// - `IntegralJ` (`"J>"`): integral flux above `E`.
/// - `IntegralE2J` (`"E2J>"`): integral flux above `E` weighted by `E²`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FluxVariant {
    J,
    EJ,
    E3J,
    IntegralJ,
    IntegralE2J,
}

impl FluxVariant {
    /// Whether the variant is a closed-form integral (`J>` or `E2J>`).
    pub fn is_integral(self) -> bool {
        matches!(self, FluxVariant::IntegralJ | FluxVariant::IntegralE2J)
    }

    /// Power `k` of the `10^(k·x)` energy weight applied to the base quantity.
    pub fn energy_power(self) -> i32 {
        match self {
            FluxVariant::J | FluxVariant::IntegralJ => 0,
            FluxVariant::EJ => 1,
            FluxVariant::IntegralE2J => 2,
            FluxVariant::E3J => 3,
        }
    }

    /// Canonical short name (`"J"`, `"EJ"`, `"E3J"`, `"J>"`, `"E2J>"`).
    pub fn as_str(self) -> &'static str {
        match self {
            FluxVariant::J => "J",
            FluxVariant::EJ => "EJ",
            FluxVariant::E3J => "E3J",
            FluxVariant::IntegralJ => "J>",
            FluxVariant::IntegralE2J => "E2J>",
        }
    }

    /// Axis title used when the function is plotted or tabulated.
    pub fn axis_title(self) -> &'static str {
        match self {
            FluxVariant::J => ";log_{10}(E/eV);J",
            FluxVariant::EJ => ";log_{10}(E/eV);EJ",
            FluxVariant::E3J => ";log_{10}(E/eV);E^{3}J",
            FluxVariant::IntegralJ => ";log_{10}(E/eV);J_{>}",
            FluxVariant::IntegralE2J => ";log_{10}(E/eV);E^{2}J_{>}",
        }
    }
}

impl FromStr for FluxVariant {
    type Err = SpecError;

    /// Parse a variant name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "J" => Ok(FluxVariant::J),
            "EJ" => Ok(FluxVariant::EJ),
            "E3J" => Ok(FluxVariant::E3J),
            "J>" => Ok(FluxVariant::IntegralJ),
            "E2J>" => Ok(FluxVariant::IntegralE2J),
            _ => Err(SpecError::UnknownVariant { name: s.to_string() }),
        }
    }
}

impl fmt::Display for FluxVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a variant name; thin wrapper over `FromStr` for call sites that
/// prefer a free function.
pub fn parse_variant(name: &str) -> SpecResult<FluxVariant> {
    name.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Case-insensitive parsing and the rejection of unknown names.
    // - Classification helpers.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Parse every known name in mixed case and reject an unknown one.
    //
    // Given
    // -----
    // - "j", "Ej", "e3j", "j>", "e2J>", and "E2J".
    //
    // Expect
    // ------
    // - Known names map to their variants; "E2J" fails with UnknownVariant.
    fn parse_is_case_insensitive() {
        assert_eq!("j".parse::<FluxVariant>().unwrap(), FluxVariant::J);
        assert_eq!("Ej".parse::<FluxVariant>().unwrap(), FluxVariant::EJ);
        assert_eq!("e3j".parse::<FluxVariant>().unwrap(), FluxVariant::E3J);
        assert_eq!("j>".parse::<FluxVariant>().unwrap(), FluxVariant::IntegralJ);
        assert_eq!(parse_variant("e2J>").unwrap(), FluxVariant::IntegralE2J);
        assert!(matches!(parse_variant("E2J"), Err(SpecError::UnknownVariant { .. })));
    }

    #[test]
    // Purpose
    // -------
    // Check integral classification and energy weights.
    //
    // Given
    // -----
    // - All variants.
    //
    // Expect
    // ------
    // - Only J> and E2J> are integral; powers are 0, 1, 3, 0, 2.
    fn classification_helpers() {
        assert!(!FluxVariant::E3J.is_integral());
        assert!(FluxVariant::IntegralE2J.is_integral());
        assert_eq!(FluxVariant::EJ.energy_power(), 1);
        assert_eq!(FluxVariant::E3J.energy_power(), 3);
        assert_eq!(FluxVariant::IntegralE2J.energy_power(), 2);
        assert_eq!(FluxVariant::IntegralJ.to_string(), "J>");
    }
}
