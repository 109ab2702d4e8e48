//! spectrum::expr — tagged expression tree for parametric spectral formulas.
//!
//! Purpose
//! -------
//! Represent closed-form model formulas (broken power laws, their
//! antiderivatives, energy-scale corrections) as a small algebraic tree
//! over one free variable `x` (log10 energy) and an indexed parameter
//! vector. The tree is built once, evaluated many times against read-only
//! parameter snapshots, and differentiated symbolically for analytic
//! gradients.
//!
//! Key behaviors
//! -------------
//! - [`Expr::eval`] evaluates at `(x, params)` without allocation.
//! - [`Expr::derivative`] returns a new tree for `∂/∂x` or `∂/∂p_i`,
//!   treating piecewise indicators as locally constant.
//! - Smart constructors ([`Expr::sum`], [`Expr::product`], …) fold
//!   constants and drop neutral terms so derivative trees stay compact.
//! - `Display` renders a human-readable formula with `[i]` for parameters,
//!   mainly for diagnostics and logging.
//!
//! Invariants & assumptions
//! ------------------------
//! - A parameter index beyond the supplied slice evaluates to `NaN`; callers
//!   validate parameter lengths before evaluation.
//! - Products short-circuit on an exactly-zero factor, so a switched-off
//!   segment indicator masks an overflowing power in the same product.
//!
//! Conventions
//! -----------
//! - Indicators evaluate to `1.0` or `0.0`.
//! - `Pow` with a constant base of 10 is the workhorse; natural logs only
//!   appear in derivatives.
use std::fmt;

/// Comparison used by piecewise indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Lt,
    Le,
}

/// Differentiation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrt {
    X,
    Param(usize),
}

/// Algebraic expression over `x` and an indexed parameter vector.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(f64),
    X,
    Par(usize),
    Sum(Vec<Expr>),
    Product(Vec<Expr>),
    Pow { base: Box<Expr>, exponent: Box<Expr> },
    Ln(Box<Expr>),
    /// Indicator `lhs cmp rhs` evaluating to 1 or 0.
    Step { lhs: Box<Expr>, cmp: Cmp, rhs: Box<Expr> },
}

impl Expr {
    // ---- Smart constructors ----

    /// Sum with constant folding; nested sums are flattened.
    pub fn sum(terms: Vec<Expr>) -> Expr {
        let mut constant = 0.0;
        let mut out = Vec::with_capacity(terms.len());
        for term in terms {
            match term {
                Expr::Const(c) => constant += c,
                Expr::Sum(inner) => {
                    for t in inner {
                        match t {
                            Expr::Const(c) => constant += c,
                            other => out.push(other),
                        }
                    }
                }
                other => out.push(other),
            }
        }
        if constant != 0.0 || out.is_empty() {
            out.push(Expr::Const(constant));
        }
        if out.len() == 1 { out.remove(0) } else { Expr::Sum(out) }
    }

    /// Product with constant folding; any zero constant collapses to 0.
    pub fn product(factors: Vec<Expr>) -> Expr {
        let mut constant = 1.0;
        let mut out = Vec::with_capacity(factors.len());
        for factor in factors {
            match factor {
                Expr::Const(c) => constant *= c,
                Expr::Product(inner) => {
                    for f in inner {
                        match f {
                            Expr::Const(c) => constant *= c,
                            other => out.push(other),
                        }
                    }
                }
                other => out.push(other),
            }
        }
        if constant == 0.0 {
            return Expr::Const(0.0);
        }
        if constant != 1.0 || out.is_empty() {
            out.insert(0, Expr::Const(constant));
        }
        if out.len() == 1 { out.remove(0) } else { Expr::Product(out) }
    }

    pub fn pow(base: Expr, exponent: Expr) -> Expr {
        match (&base, &exponent) {
            (_, Expr::Const(e)) if *e == 0.0 => Expr::Const(1.0),
            (_, Expr::Const(e)) if *e == 1.0 => base,
            (Expr::Const(b), Expr::Const(e)) => Expr::Const(b.powf(*e)),
            _ => Expr::Pow { base: Box::new(base), exponent: Box::new(exponent) },
        }
    }

    /// `10^exponent`.
    pub fn pow10(exponent: Expr) -> Expr {
        Expr::pow(Expr::Const(10.0), exponent)
    }

    pub fn recip(e: Expr) -> Expr {
        Expr::pow(e, Expr::Const(-1.0))
    }

    pub fn neg(e: Expr) -> Expr {
        Expr::product(vec![Expr::Const(-1.0), e])
    }

    pub fn sub(a: Expr, b: Expr) -> Expr {
        Expr::sum(vec![a, Expr::neg(b)])
    }

    pub fn ln(e: Expr) -> Expr {
        match e {
            Expr::Const(c) => Expr::Const(c.ln()),
            other => Expr::Ln(Box::new(other)),
        }
    }

    /// Indicator `a < b`.
    pub fn lt(a: Expr, b: Expr) -> Expr {
        Expr::Step { lhs: Box::new(a), cmp: Cmp::Lt, rhs: Box::new(b) }
    }

    /// Indicator `a ≤ b`.
    pub fn le(a: Expr, b: Expr) -> Expr {
        Expr::Step { lhs: Box::new(a), cmp: Cmp::Le, rhs: Box::new(b) }
    }

    // ---- Evaluation ----

    /// Evaluate at log-energy `x` with parameter snapshot `params`.
    pub fn eval(&self, x: f64, params: &[f64]) -> f64 {
        match self {
            Expr::Const(c) => *c,
            Expr::X => x,
            Expr::Par(i) => params.get(*i).copied().unwrap_or(f64::NAN),
            Expr::Sum(terms) => terms.iter().map(|t| t.eval(x, params)).sum(),
            Expr::Product(factors) => {
                let mut acc = 1.0;
                for f in factors {
                    let v = f.eval(x, params);
                    if v == 0.0 {
                        return 0.0;
                    }
                    acc *= v;
                }
                acc
            }
            Expr::Pow { base, exponent } => {
                let e = exponent.eval(x, params);
                match **base {
                    Expr::Const(b) if b == 10.0 => 10f64.powf(e),
                    _ => base.eval(x, params).powf(e),
                }
            }
            Expr::Ln(inner) => inner.eval(x, params).ln(),
            Expr::Step { lhs, cmp, rhs } => {
                let (l, r) = (lhs.eval(x, params), rhs.eval(x, params));
                let on = match cmp {
                    Cmp::Lt => l < r,
                    Cmp::Le => l <= r,
                };
                if on { 1.0 } else { 0.0 }
            }
        }
    }

    // ---- Structure ----

    /// Number of parameters referenced, i.e. highest `Par` index + 1.
    pub fn n_params(&self) -> usize {
        match self {
            Expr::Const(_) | Expr::X => 0,
            Expr::Par(i) => i + 1,
            Expr::Sum(v) | Expr::Product(v) => v.iter().map(Expr::n_params).max().unwrap_or(0),
            Expr::Pow { base, exponent } => base.n_params().max(exponent.n_params()),
            Expr::Ln(e) => e.n_params(),
            Expr::Step { lhs, rhs, .. } => lhs.n_params().max(rhs.n_params()),
        }
    }

    /// Return a copy with every `Par(i)` renumbered to `Par(i + offset)`.
    pub fn shift_params(&self, offset: usize) -> Expr {
        self.map_leaves(&|leaf| match leaf {
            Expr::Par(i) => Expr::Par(i + offset),
            other => other.clone(),
        })
    }

    /// Return a copy with `x` replaced by `replacement`.
    pub fn substitute_x(&self, replacement: &Expr) -> Expr {
        self.map_leaves(&|leaf| match leaf {
            Expr::X => replacement.clone(),
            other => other.clone(),
        })
    }

    fn map_leaves(&self, f: &dyn Fn(&Expr) -> Expr) -> Expr {
        match self {
            Expr::Const(_) | Expr::X | Expr::Par(_) => f(self),
            Expr::Sum(v) => Expr::Sum(v.iter().map(|e| e.map_leaves(f)).collect()),
            Expr::Product(v) => Expr::Product(v.iter().map(|e| e.map_leaves(f)).collect()),
            Expr::Pow { base, exponent } => Expr::Pow {
                base: Box::new(base.map_leaves(f)),
                exponent: Box::new(exponent.map_leaves(f)),
            },
            Expr::Ln(e) => Expr::Ln(Box::new(e.map_leaves(f))),
            Expr::Step { lhs, cmp, rhs } => Expr::Step {
                lhs: Box::new(lhs.map_leaves(f)),
                cmp: *cmp,
                rhs: Box::new(rhs.map_leaves(f)),
            },
        }
    }

    /// Whether the expression varies with `wrt` (indicators included).
    pub fn depends_on(&self, wrt: Wrt) -> bool {
        match self {
            Expr::Const(_) => false,
            Expr::X => wrt == Wrt::X,
            Expr::Par(i) => wrt == Wrt::Param(*i),
            Expr::Sum(v) | Expr::Product(v) => v.iter().any(|e| e.depends_on(wrt)),
            Expr::Pow { base, exponent } => base.depends_on(wrt) || exponent.depends_on(wrt),
            Expr::Ln(e) => e.depends_on(wrt),
            Expr::Step { lhs, rhs, .. } => lhs.depends_on(wrt) || rhs.depends_on(wrt),
        }
    }

    // ---- Differentiation ----

    /// Symbolic derivative with respect to `wrt`.
    ///
    /// Indicators are piecewise constant, so their derivative is 0; at a
    /// switching point the result is the one-sided derivative of whichever
    /// branch is active.
    pub fn derivative(&self, wrt: Wrt) -> Expr {
        if !self.depends_on(wrt) {
            return Expr::Const(0.0);
        }
        match self {
            Expr::Const(_) | Expr::Step { .. } => Expr::Const(0.0),
            Expr::X | Expr::Par(_) => Expr::Const(1.0),
            Expr::Sum(terms) => Expr::sum(terms.iter().map(|t| t.derivative(wrt)).collect()),
            Expr::Product(factors) => {
                let mut terms = Vec::new();
                for (k, fk) in factors.iter().enumerate() {
                    let dk = fk.derivative(wrt);
                    if matches!(dk, Expr::Const(c) if c == 0.0) {
                        continue;
                    }
                    let mut prod: Vec<Expr> = factors
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != k)
                        .map(|(_, f)| f.clone())
                        .collect();
                    prod.push(dk);
                    terms.push(Expr::product(prod));
                }
                Expr::sum(terms)
            }
            Expr::Pow { base, exponent } => {
                let base_dep = base.depends_on(wrt);
                let exp_dep = exponent.depends_on(wrt);
                let this = Expr::pow((**base).clone(), (**exponent).clone());
                if !exp_dep {
                    // k * b^(k-1) * b'
                    let reduced =
                        Expr::pow((**base).clone(), Expr::sum(vec![(**exponent).clone(), Expr::Const(-1.0)]));
                    Expr::product(vec![(**exponent).clone(), reduced, base.derivative(wrt)])
                } else if !base_dep {
                    // b^e * ln(b) * e'
                    Expr::product(vec![this, Expr::ln((**base).clone()), exponent.derivative(wrt)])
                } else {
                    // b^e * (e' ln b + e b'/b)
                    let inner = Expr::sum(vec![
                        Expr::product(vec![exponent.derivative(wrt), Expr::ln((**base).clone())]),
                        Expr::product(vec![
                            (**exponent).clone(),
                            base.derivative(wrt),
                            Expr::recip((**base).clone()),
                        ]),
                    ]);
                    Expr::product(vec![this, inner])
                }
            }
            Expr::Ln(inner) => {
                Expr::product(vec![inner.derivative(wrt), Expr::recip((**inner).clone())])
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(c) => {
                if *c < 0.0 {
                    write!(f, "({c})")
                } else {
                    write!(f, "{c}")
                }
            }
            Expr::X => write!(f, "x"),
            Expr::Par(i) => write!(f, "[{i}]"),
            Expr::Sum(terms) => {
                write!(f, "(")?;
                for (k, t) in terms.iter().enumerate() {
                    if k > 0 {
                        write!(f, "+")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, ")")
            }
            Expr::Product(factors) => {
                for (k, t) in factors.iter().enumerate() {
                    if k > 0 {
                        write!(f, "*")?;
                    }
                    write!(f, "{t}")?;
                }
                Ok(())
            }
            Expr::Pow { base, exponent } => write!(f, "pow({base},{exponent})"),
            Expr::Ln(e) => write!(f, "log({e})"),
            Expr::Step { lhs, cmp, rhs } => {
                let op = match cmp {
                    Cmp::Lt => "<",
                    Cmp::Le => "<=",
                };
                write!(f, "({lhs}{op}{rhs})")
            }
        }
    }
}
