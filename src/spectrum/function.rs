//! spectrum::function — named parametric functions of log-energy.
//!
//! Purpose
//! -------
//! Pair an [`Expr`] with the metadata a fit needs: a name, a domain
//! `[xmin, xmax]`, and per-parameter names, values, step sizes ("errors")
//! and optional limits. Flux models, energy-scale corrections and null
//! hypotheses are all [`SpecFunction`]s.
//!
//! Key behaviors
//! -------------
//! - Builder-style setters that validate lengths against the parameter
//!   count, including comma-separated (`"a,b,c"`) variants.
//! - Read-only evaluation against the stored parameters or an external
//!   snapshot via [`FunctionSnapshot`].
//! - Algebra that keeps parameter metadata aligned:
//!   [`SpecFunction::combine`] (`c₀-formula + Σ cᵢ·fᵢ`),
//!   [`SpecFunction::multiply`], [`SpecFunction::scale`] and
//!   [`SpecFunction::multiply_by_energy_power`].
//!
//! Invariants & assumptions
//! ------------------------
//! - `values`, `errors`, `names` and `limits` always have length
//!   [`SpecFunction::n_params`].
//! - An error (step size) of 0 marks the parameter as fixed in a fit.
//! - A limit `(lo, hi)` with `lo < hi` bounds the parameter; `(0, 0)`
//!   leaves it free.
//!
//! Conventions
//! -----------
//! - Comma-separated numbers render with nine significant decimals in
//!   C-style exponent form (`1.000000000e+00`).
//! - Default parameter names are `p0, p1, …`.
use crate::spectrum::errors::{SpecError, SpecResult};
use crate::spectrum::expr::Expr;
use crate::utils::format_c_exp;

/// Borrowed view of a function's expression with a parameter snapshot.
#[derive(Debug, Clone, Copy)]
pub struct FunctionSnapshot<'a> {
    pub expr: &'a Expr,
    pub params: &'a [f64],
    pub xmin: f64,
    pub xmax: f64,
}

impl FunctionSnapshot<'_> {
    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        self.expr.eval(x, self.params)
    }
}

/// A named parametric function of log10 energy.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecFunction {
    name: String,
    title: String,
    expr: Expr,
    xmin: f64,
    xmax: f64,
    values: Vec<f64>,
    errors: Vec<f64>,
    names: Vec<String>,
    limits: Vec<(f64, f64)>,
}

impl SpecFunction {
    /// Create a function on `[xmin, xmax]` with zeroed parameters named `p0, p1, …`.
    pub fn new(name: &str, expr: Expr, xmin: f64, xmax: f64) -> Self {
        let n = expr.n_params();
        Self {
            name: name.to_string(),
            title: String::new(),
            expr,
            xmin,
            xmax,
            values: vec![0.0; n],
            errors: vec![0.0; n],
            names: (0..n).map(|i| format!("p{i}")).collect(),
            limits: vec![(0.0, 0.0); n],
        }
    }

    // ---- Builders ----

    pub fn with_names<S: AsRef<str>>(mut self, names: &[S]) -> SpecResult<Self> {
        self.set_names(names)?;
        Ok(self)
    }

    pub fn with_values(mut self, values: &[f64]) -> SpecResult<Self> {
        self.set_values(values)?;
        Ok(self)
    }

    pub fn with_errors(mut self, errors: &[f64]) -> SpecResult<Self> {
        self.set_errors(errors)?;
        Ok(self)
    }

    pub fn with_limits(mut self, limits: &[(f64, f64)]) -> SpecResult<Self> {
        self.set_limits(limits)?;
        Ok(self)
    }

    /// Set names, values and errors from comma-separated lists; `None`
    /// leaves the corresponding metadata untouched.
    pub fn with_cs(
        mut self, names: Option<&str>, values: Option<&str>, errors: Option<&str>,
    ) -> SpecResult<Self> {
        if let Some(text) = names {
            self.set_names(&parse_cs_strings(text))?;
        }
        if let Some(text) = values {
            self.set_values(&parse_cs_doubles(text)?)?;
        }
        if let Some(text) = errors {
            self.set_errors(&parse_cs_doubles(text)?)?;
        }
        Ok(self)
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    // ---- Setters ----

    pub fn set_names<S: AsRef<str>>(&mut self, names: &[S]) -> SpecResult<()> {
        self.check_len(names.len())?;
        self.names = names.iter().map(|s| s.as_ref().to_string()).collect();
        Ok(())
    }

    pub fn set_values(&mut self, values: &[f64]) -> SpecResult<()> {
        self.check_len(values.len())?;
        self.values.copy_from_slice(values);
        Ok(())
    }

    pub fn set_errors(&mut self, errors: &[f64]) -> SpecResult<()> {
        self.check_len(errors.len())?;
        self.errors.copy_from_slice(errors);
        Ok(())
    }

    pub fn set_limits(&mut self, limits: &[(f64, f64)]) -> SpecResult<()> {
        self.check_len(limits.len())?;
        self.limits.copy_from_slice(limits);
        Ok(())
    }

    pub fn set_limits_cs(&mut self, text: &str) -> SpecResult<()> {
        let pairs = parse_cs_pairs(text)?;
        self.set_limits(&pairs)
    }

    /// Set a single parameter value; returns `false` when out of range.
    pub fn set_value(&mut self, index: usize, value: f64) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Set a single step size; returns `false` when out of range.
    pub fn set_error(&mut self, index: usize, error: f64) -> bool {
        match self.errors.get_mut(index) {
            Some(slot) => {
                *slot = error;
                true
            }
            None => false,
        }
    }

    pub fn set_range(&mut self, xmin: f64, xmax: f64) {
        self.xmin = xmin;
        self.xmax = xmax;
    }

    pub fn rename(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn check_len(&self, found: usize) -> SpecResult<()> {
        if found != self.n_params() {
            return Err(SpecError::ParameterLengthMismatch { expected: self.n_params(), found });
        }
        Ok(())
    }

    // ---- Accessors ----

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    pub fn n_params(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn errors(&self) -> &[f64] {
        &self.errors
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn limits(&self) -> &[(f64, f64)] {
        &self.limits
    }

    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Index of the parameter called `name`.
    pub fn par_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Value of the parameter called `name`.
    pub fn parameter_named(&self, name: &str) -> SpecResult<f64> {
        self.par_index(name)
            .map(|i| self.values[i])
            .ok_or_else(|| SpecError::UnknownParameter { name: name.to_string() })
    }

    pub fn names_cs(&self) -> String {
        self.names.join(",")
    }

    pub fn values_cs(&self) -> String {
        format_cs_doubles(&self.values)
    }

    pub fn errors_cs(&self) -> String {
        format_cs_doubles(&self.errors)
    }

    pub fn limits_cs(&self) -> String {
        self.limits
            .iter()
            .map(|(lo, hi)| format!("({},{})", format_c_exp(*lo, 9), format_c_exp(*hi, 9)))
            .collect::<Vec<_>>()
            .join(",")
    }

    // ---- Evaluation ----

    /// Evaluate with the stored parameters.
    pub fn eval(&self, x: f64) -> f64 {
        self.expr.eval(x, &self.values)
    }

    /// Evaluate with an external parameter snapshot.
    pub fn eval_with(&self, x: f64, params: &[f64]) -> f64 {
        self.expr.eval(x, params)
    }

    pub fn snapshot(&self) -> FunctionSnapshot<'_> {
        self.snapshot_with(&self.values)
    }

    pub fn snapshot_with<'a>(&'a self, params: &'a [f64]) -> FunctionSnapshot<'a> {
        FunctionSnapshot { expr: &self.expr, params, xmin: self.xmin, xmax: self.xmax }
    }

    // ---- Algebra ----

    /// combine — `start + Σ cᵢ·fᵢ` with concatenated parameters.
    ///
    /// Parameters of `start` come first (zero-valued, named `p0, p1, …`),
    /// followed by the parameters of each term in order. The domain is the
    /// union of the terms' domains; without terms it is `[18, 21]`.
    pub fn combine(name: &str, start: Expr, terms: &[(f64, &SpecFunction)]) -> SpecFunction {
        let start_npar = start.n_params();
        let mut offset = start_npar;
        let mut sum = vec![start];
        let mut values = vec![0.0; start_npar];
        let mut errors = vec![0.0; start_npar];
        let mut names: Vec<String> = (0..start_npar).map(|i| format!("p{i}")).collect();
        let mut limits = vec![(0.0, 0.0); start_npar];
        let (mut xmin, mut xmax) = (f64::INFINITY, f64::NEG_INFINITY);
        for (c, f) in terms {
            sum.push(Expr::product(vec![Expr::Const(*c), f.expr.shift_params(offset)]));
            offset += f.n_params();
            values.extend_from_slice(&f.values);
            errors.extend_from_slice(&f.errors);
            names.extend(f.names.iter().cloned());
            limits.extend_from_slice(&f.limits);
            xmin = xmin.min(f.xmin);
            xmax = xmax.max(f.xmax);
        }
        if terms.is_empty() {
            (xmin, xmax) = (18.0, 21.0);
        }
        let expr = Expr::sum(sum);
        let npar = values.len();
        // parameters may be referenced by no term (e.g. a constant start)
        let expr = if expr.n_params() < npar { pad_params(expr, npar) } else { expr };
        SpecFunction {
            name: name.to_string(),
            title: String::new(),
            expr,
            xmin,
            xmax,
            values,
            errors,
            names,
            limits,
        }
    }

    /// Product `f1 · f2` with concatenated parameters and the union domain.
    pub fn multiply(name: &str, f1: &SpecFunction, f2: &SpecFunction) -> SpecFunction {
        let expr =
            Expr::product(vec![f1.expr.clone(), f2.expr.shift_params(f1.n_params())]);
        let npar = f1.n_params() + f2.n_params();
        let expr = if expr.n_params() < npar { pad_params(expr, npar) } else { expr };
        let concat = |a: &[f64], b: &[f64]| [a, b].concat();
        SpecFunction {
            name: name.to_string(),
            title: String::new(),
            expr,
            xmin: f1.xmin.min(f2.xmin),
            xmax: f1.xmax.max(f2.xmax),
            values: concat(&f1.values, &f2.values),
            errors: concat(&f1.errors, &f2.errors),
            names: [f1.names.clone(), f2.names.clone()].concat(),
            limits: [f1.limits.clone(), f2.limits.clone()].concat(),
        }
    }

    /// Multiply the formula by `c` in place, keeping parameters.
    pub fn scale(&mut self, c: f64) {
        let expr = std::mem::replace(&mut self.expr, Expr::Const(0.0));
        let npar = self.n_params();
        let scaled = Expr::product(vec![Expr::Const(c), expr]);
        self.expr = if scaled.n_params() < npar { pad_params(scaled, npar) } else { scaled };
    }

    /// Copy of the function multiplied by `10^(k·x)`, same parameters.
    pub fn multiply_by_energy_power(&self, name: &str, k: f64) -> SpecFunction {
        let mut out = self.clone();
        out.name = name.to_string();
        let weight = Expr::pow10(Expr::product(vec![Expr::Const(k), Expr::X]));
        out.expr = Expr::product(vec![weight, self.expr.clone()]);
        out
    }

    /// E³-weighted companion used for plotting and flux points.
    pub fn e3j_companion(&self) -> SpecFunction {
        let mut out = self.multiply_by_energy_power(&e3j_companion_name(&self.name), 3.0);
        out.title = ";log_{10}(E/eV);E^{3}J".to_string();
        out
    }
}

/// Name of the E³J companion of a function called `name`.
///
/// `fJ…` becomes `fE3J…`; any other name gets an `_E3` suffix.
pub fn e3j_companion_name(name: &str) -> String {
    match name.strip_prefix("fJ") {
        Some(rest) => format!("fE3J{rest}"),
        None => format!("{name}_E3"),
    }
}

/// Keep a trailing parameter referenced so `n_params` matches metadata.
fn pad_params(expr: Expr, npar: usize) -> Expr {
    // 0·[npar-1] contributes nothing but pins the parameter count.
    Expr::Sum(vec![
        expr,
        Expr::Product(vec![Expr::Const(0.0), Expr::Par(npar - 1)]),
    ])
}

// ---- Comma-separated helpers ----

/// Parse `"a, b, c"` into numbers; blanks are skipped.
///
/// # Errors
/// - `SpecError::InvalidList` when a token is not a number.
pub fn parse_cs_doubles(text: &str) -> SpecResult<Vec<f64>> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<f64>().map_err(|_| SpecError::InvalidList {
                text: text.to_string(),
                reason: "entries must be numbers",
            })
        })
        .collect()
}

/// Parse `"a, b, c"` into trimmed names; blanks are skipped.
pub fn parse_cs_strings(text: &str) -> Vec<String> {
    text.split(',').map(str::trim).filter(|t| !t.is_empty()).map(String::from).collect()
}

/// Parse `"(lo,hi),(lo,hi)"` into pairs.
///
/// # Errors
/// - `SpecError::InvalidList` when a group does not hold exactly two numbers.
pub fn parse_cs_pairs(text: &str) -> SpecResult<Vec<(f64, f64)>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let invalid = || SpecError::InvalidList {
        text: text.to_string(),
        reason: "expected comma-separated (lo,hi) pairs",
    };
    let mut out = Vec::new();
    for group in compact.split(')').filter(|g| !g.is_empty()) {
        let group = group.trim_start_matches(',');
        let inner = group.strip_prefix('(').ok_or_else(invalid)?;
        let values = parse_cs_doubles(inner)?;
        match values.as_slice() {
            [lo, hi] => out.push((*lo, *hi)),
            _ => return Err(invalid()),
        }
    }
    Ok(out)
}

pub fn format_cs_doubles(values: &[f64]) -> String {
    values.iter().map(|v| format_c_exp(*v, 9)).collect::<Vec<_>>().join(",")
}
