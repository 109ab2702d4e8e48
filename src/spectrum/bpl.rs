//! spectrum::bpl — broken-power-law flux models.
//!
//! [`BrokenPowerLaw`] couples a [`FormulaBuilder`] tree with the
//! [`SpecFunction`] metadata a fit needs and remembers the structural inputs
//! (break count, variant, scale factor) so that the model can be copied into
//! another flux quantity or integrated numerically across its breaks.
use crate::spectrum::{
    continuity::break_index,
    errors::SpecResult,
    formula::FormulaBuilder,
    function::{SpecFunction, parse_cs_doubles, parse_cs_strings},
    integrate::NumericIntegrator,
    variant::FluxVariant,
};

/// A continuous piecewise power law in log-energy with free breaks.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokenPowerLaw {
    function: SpecFunction,
    n_breaks: usize,
    variant: FluxVariant,
    scale: f64,
}

impl BrokenPowerLaw {
    /// Build a model on `[xmin, xmax]` with default names and zero values.
    ///
    /// Default names are `const, p1 … p{n+1}, logEbreak1 … logEbreak{n}`.
    /// A negative `n_breaks` is treated as 0.
    pub fn new(
        name: &str, n_breaks: i32, variant: FluxVariant, scale: f64, xmin: f64, xmax: f64,
    ) -> Self {
        let builder = FormulaBuilder::new(n_breaks, variant, scale, xmin);
        let n = builder.n_breaks;
        let mut names = Vec::with_capacity(builder.n_params());
        names.push("const".to_string());
        names.extend((1..=n + 1).map(|k| format!("p{k}")));
        names.extend((1..=n).map(|k| format!("logEbreak{k}")));

        let mut function = SpecFunction::new(name, builder.build(), xmin, xmax)
            .with_title(variant.axis_title());
        // lengths match by construction
        let _ = function.set_names(&names);
        Self { function, n_breaks: n, variant, scale }
    }

    /// Build a model from comma-separated names, values and step sizes.
    ///
    /// Errors
    /// ------
    /// - `SpecError::UnknownVariant` for an unrecognized `variant`.
    /// - `SpecError::InvalidList` / `ParameterLengthMismatch` when a list does
    ///   not parse or has the wrong length.
    #[allow(clippy::too_many_arguments)]
    pub fn from_cs(
        name: &str, n_breaks: i32, variant: &str, scale: f64, xmin: f64, xmax: f64,
        names: &str, values: &str, errors: &str,
    ) -> SpecResult<Self> {
        let variant: FluxVariant = variant.parse()?;
        let mut bpl = Self::new(name, n_breaks, variant, scale, xmin, xmax);
        bpl.function.set_names(&parse_cs_strings(names))?;
        bpl.function.set_values(&parse_cs_doubles(values)?)?;
        bpl.function.set_errors(&parse_cs_doubles(errors)?)?;
        Ok(bpl)
    }

    pub fn with_values(mut self, values: &[f64]) -> SpecResult<Self> {
        self.function.set_values(values)?;
        Ok(self)
    }

    pub fn with_errors(mut self, errors: &[f64]) -> SpecResult<Self> {
        self.function.set_errors(errors)?;
        Ok(self)
    }

    /// Same model restricted to another domain; slopes keep their origin.
    pub fn with_range(mut self, xmin: f64, xmax: f64) -> Self {
        self.function.set_range(xmin, xmax);
        self
    }

    /// Copy into another flux quantity keeping names, values and errors.
    pub fn to_variant(&self, new_name: &str, variant: FluxVariant) -> Self {
        let mut out = Self::new(
            new_name,
            self.n_breaks as i32,
            variant,
            self.scale,
            self.function.xmin(),
            self.function.xmax(),
        );
        // same break count means same parameter count
        let _ = out.function.set_names(self.function.names());
        let _ = out.function.set_values(self.function.values());
        let _ = out.function.set_errors(self.function.errors());
        let _ = out.function.set_limits(self.function.limits());
        out
    }

    /// Multiply the model by `c`; the scale factor follows.
    pub fn scale(&mut self, c: f64) {
        self.function.scale(c);
        self.scale *= c;
    }

    pub fn n_breaks(&self) -> usize {
        self.n_breaks
    }

    pub fn variant(&self) -> FluxVariant {
        self.variant
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale
    }

    /// Current break positions.
    pub fn breaks(&self) -> Vec<f64> {
        let values = self.function.values();
        (0..self.n_breaks).map(|j| values[break_index(self.n_breaks, j)]).collect()
    }

    pub fn function(&self) -> &SpecFunction {
        &self.function
    }

    pub fn function_mut(&mut self) -> &mut SpecFunction {
        &mut self.function
    }

    pub fn into_function(self) -> SpecFunction {
        self.function
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.function.eval(x)
    }

    /// `∫ J dE` over `[start, end]` in log-energy, split at the breaks.
    pub fn integrate_de(&self, start: f64, end: f64) -> SpecResult<f64> {
        self.multiply_and_integrate_de(|_| 1.0, start, end)
    }

    /// `∫ J·aux dE` over `[start, end]`, split at the breaks.
    ///
    /// Errors
    /// ------
    /// - See [`NumericIntegrator::integrate_de`].
    pub fn multiply_and_integrate_de<A>(&self, aux: A, start: f64, end: f64) -> SpecResult<f64>
    where
        A: Fn(f64) -> f64,
    {
        NumericIntegrator::default().integrate_de(
            |x| self.function.eval(x),
            aux,
            &self.breaks(),
            start,
            end,
        )
    }
}

impl From<BrokenPowerLaw> for SpecFunction {
    fn from(bpl: BrokenPowerLaw) -> Self {
        bpl.into_function()
    }
}
