//! # Symbolic Engine Module
//!
//! Core expression tree used by the integral calculator. Every other symbolic module
//! (parser, simplifier, derivatives, integration, lambdify, LaTeX printer) adds methods
//! to the same `Expr` type in its own `impl Expr` block.
//!
//! ## Main Structures and Methods
//!
//! ### `Expr` Enum
//! - **Variables**: `Var(String)` - the integration variable, usually "x"
//! - **Constants**: `Const(BigRational)` - exact rational numbers, `Pi` and `E`
//! - **Operations**: `Add`, `Sub`, `Mul`, `Div`, `Pow` - basic arithmetic
//! - **Functions**: `Exp`, `Ln`, `Abs`, `sin`, `cos`, `tg`, ... - elementary functions
//!
//! ### Key Methods
//! - `substitute(var, value)` - replace a variable by another expression
//! - `set_variable(var, value)` - replace a variable by a floating point value (exactly)
//! - `replace(target, with)` - structural replacement of a whole subexpression
//! - `eval_expression(var, x)` - direct numerical evaluation
//! - `as_unary()` - uniform access to the elementary function nodes
//!
//! ## Interesting Code Features
//!
//! 1. **Exact arithmetic**: constants are `BigRational`, so `8/3` stays `8/3` until the
//!    very end, floating point values are always derived from the exact value
//!
//! 2. **Operator Overloading**: std::ops traits (Add, Sub, Mul, Div, Neg) give the
//!    natural syntax `x.clone() * x - Expr::int(1)`
//!
//! 3. **Non-standard Function Names**: mathematical notation (tg, ctg, arctg) is used
//!    for the trigonometric variants

#![allow(non_camel_case_types)]

use num::{BigInt, BigRational, One, Signed, ToPrimitive, Zero};
use std::collections::BTreeSet;
use std::f64::consts::{E, PI};
use std::fmt;

/// Symbolic expression tree.
///
/// `Ord` is derived so that sums and products can be put into a canonical,
/// deterministic order by the simplifier.
///
/// # Examples
/// ```rust, ignore
/// use RustedIntegral::symbolic::symbolic_engine::Expr;
/// let x = Expr::Var("x".to_string());
/// let f = Expr::Add(Box::new(x), Box::new(Expr::int(2)));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expr {
    /// Symbolic variable with a name (e.g., "x")
    Var(String),
    /// Exact rational constant
    Const(BigRational),
    /// The number pi
    Pi,
    /// Euler's number e
    E,
    /// Addition operation: left + right
    Add(Box<Expr>, Box<Expr>),
    /// Subtraction operation: left - right
    Sub(Box<Expr>, Box<Expr>),
    /// Multiplication operation: left * right
    Mul(Box<Expr>, Box<Expr>),
    /// Division operation: left / right
    Div(Box<Expr>, Box<Expr>),
    /// Power operation: base ^ exponent (square roots are `Pow(u, 1/2)`)
    Pow(Box<Expr>, Box<Expr>),
    /// Exponential function: e^x
    Exp(Box<Expr>),
    /// Natural logarithm: ln(x)
    Ln(Box<Expr>),
    /// Absolute value: |x|
    Abs(Box<Expr>),
    /// Sine function: sin(x)
    sin(Box<Expr>),
    /// Cosine function: cos(x)
    cos(Box<Expr>),
    /// Tangent function: tan(x) - uses mathematical notation 'tg'
    tg(Box<Expr>),
    /// Cotangent function: cot(x) - uses mathematical notation 'ctg'
    ctg(Box<Expr>),
    /// Arcsine function: arcsin(x)
    arcsin(Box<Expr>),
    /// Arccosine function: arccos(x)
    arccos(Box<Expr>),
    /// Arctangent function: arctan(x) - uses mathematical notation 'arctg'
    arctg(Box<Expr>),
    /// Arccotangent function: arccot(x) - uses mathematical notation 'arcctg'
    arcctg(Box<Expr>),
    /// Hyperbolic sine
    sinh(Box<Expr>),
    /// Hyperbolic cosine
    cosh(Box<Expr>),
    /// Hyperbolic tangent
    tanh(Box<Expr>),
}

/// Tag for the single-argument function nodes of `Expr`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Func {
    Exp,
    Ln,
    Abs,
    Sin,
    Cos,
    Tg,
    Ctg,
    Arcsin,
    Arccos,
    Arctg,
    Arcctg,
    Sinh,
    Cosh,
    Tanh,
}

impl Func {
    /// wraps `arg` into the node this tag stands for
    pub fn apply(self, arg: Expr) -> Expr {
        let arg = arg.boxed();
        match self {
            Func::Exp => Expr::Exp(arg),
            Func::Ln => Expr::Ln(arg),
            Func::Abs => Expr::Abs(arg),
            Func::Sin => Expr::sin(arg),
            Func::Cos => Expr::cos(arg),
            Func::Tg => Expr::tg(arg),
            Func::Ctg => Expr::ctg(arg),
            Func::Arcsin => Expr::arcsin(arg),
            Func::Arccos => Expr::arccos(arg),
            Func::Arctg => Expr::arctg(arg),
            Func::Arcctg => Expr::arcctg(arg),
            Func::Sinh => Expr::sinh(arg),
            Func::Cosh => Expr::cosh(arg),
            Func::Tanh => Expr::tanh(arg),
        }
    }

    /// numerical value of the function, NaN outside of the real domain
    pub fn eval(self, v: f64) -> f64 {
        match self {
            Func::Exp => v.exp(),
            Func::Ln => v.ln(),
            Func::Abs => v.abs(),
            Func::Sin => v.sin(),
            Func::Cos => v.cos(),
            Func::Tg => v.tan(),
            Func::Ctg => 1.0 / v.tan(),
            Func::Arcsin => v.asin(),
            Func::Arccos => v.acos(),
            Func::Arctg => v.atan(),
            Func::Arcctg => {
                if v == 0.0 {
                    PI / 2.0
                } else {
                    (1.0 / v).atan()
                }
            }
            Func::Sinh => v.sinh(),
            Func::Cosh => v.cosh(),
            Func::Tanh => v.tanh(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::Exp => "exp",
            Func::Ln => "ln",
            Func::Abs => "abs",
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tg => "tg",
            Func::Ctg => "ctg",
            Func::Arcsin => "arcsin",
            Func::Arccos => "arccos",
            Func::Arctg => "arctg",
            Func::Arcctg => "arcctg",
            Func::Sinh => "sinh",
            Func::Cosh => "cosh",
            Func::Tanh => "tanh",
        }
    }
}

/// Display implementation for pretty printing symbolic expressions.
///
/// Fully parenthesized, so the printed form parses back into the same tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Const(val) => {
                if val.is_integer() {
                    write!(f, "{}", val.numer())
                } else {
                    write!(f, "({}/{})", val.numer(), val.denom())
                }
            }
            Expr::Pi => write!(f, "pi"),
            Expr::E => write!(f, "e"),
            Expr::Add(lhs, rhs) => write!(f, "({} + {})", lhs, rhs),
            Expr::Sub(lhs, rhs) => write!(f, "({} - {})", lhs, rhs),
            Expr::Mul(lhs, rhs) => write!(f, "({} * {})", lhs, rhs),
            Expr::Div(lhs, rhs) => write!(f, "({} / {})", lhs, rhs),
            Expr::Pow(base, exp) => write!(f, "({} ^ {})", base, exp),
            other => match other.as_unary() {
                Some((func, arg)) => write!(f, "{}({})", func.name(), arg),
                None => unreachable!("all binary and atomic nodes handled above"),
            },
        }
    }
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::Mul(Box::new(Expr::int(-1)), Box::new(self))
    }
}

impl Expr {
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    pub fn int(n: i64) -> Expr {
        Expr::Const(BigRational::from_integer(BigInt::from(n)))
    }

    /// exact p/q, panics on q == 0 like `BigRational::new`
    pub fn rational(p: i64, q: i64) -> Expr {
        Expr::Const(BigRational::new(BigInt::from(p), BigInt::from(q)))
    }

    pub fn zero() -> Expr {
        Expr::Const(BigRational::zero())
    }

    pub fn one() -> Expr {
        Expr::Const(BigRational::one())
    }

    pub fn pow(self, exponent: Expr) -> Expr {
        Expr::Pow(self.boxed(), exponent.boxed())
    }

    pub fn sqrt(self) -> Expr {
        Expr::Pow(self.boxed(), Expr::rational(1, 2).boxed())
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(c) if c.is_zero())
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Const(c) if c.is_one())
    }

    pub fn as_rational(&self) -> Option<&BigRational> {
        match self {
            Expr::Const(c) => Some(c),
            _ => None,
        }
    }

    /// integer value of a constant if it is one and fits into i64
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Expr::Const(c) if c.is_integer() => c.numer().to_i64(),
            _ => None,
        }
    }

    /// true for a negative rational constant
    pub fn is_negative_const(&self) -> bool {
        matches!(self, Expr::Const(c) if c.is_negative())
    }

    /// Uniform view of the single-argument function nodes.
    pub fn as_unary(&self) -> Option<(Func, &Expr)> {
        let res = match self {
            Expr::Exp(a) => (Func::Exp, a.as_ref()),
            Expr::Ln(a) => (Func::Ln, a.as_ref()),
            Expr::Abs(a) => (Func::Abs, a.as_ref()),
            Expr::sin(a) => (Func::Sin, a.as_ref()),
            Expr::cos(a) => (Func::Cos, a.as_ref()),
            Expr::tg(a) => (Func::Tg, a.as_ref()),
            Expr::ctg(a) => (Func::Ctg, a.as_ref()),
            Expr::arcsin(a) => (Func::Arcsin, a.as_ref()),
            Expr::arccos(a) => (Func::Arccos, a.as_ref()),
            Expr::arctg(a) => (Func::Arctg, a.as_ref()),
            Expr::arcctg(a) => (Func::Arcctg, a.as_ref()),
            Expr::sinh(a) => (Func::Sinh, a.as_ref()),
            Expr::cosh(a) => (Func::Cosh, a.as_ref()),
            Expr::tanh(a) => (Func::Tanh, a.as_ref()),
            _ => return None,
        };
        Some(res)
    }

    /// Rebuilds the node with every direct child mapped through `f`.
    pub fn map_children<F>(&self, mut f: F) -> Expr
    where
        F: FnMut(&Expr) -> Expr,
    {
        match self {
            Expr::Var(_) | Expr::Const(_) | Expr::Pi | Expr::E => self.clone(),
            Expr::Add(l, r) => Expr::Add(f(l.as_ref()).boxed(), f(r.as_ref()).boxed()),
            Expr::Sub(l, r) => Expr::Sub(f(l.as_ref()).boxed(), f(r.as_ref()).boxed()),
            Expr::Mul(l, r) => Expr::Mul(f(l.as_ref()).boxed(), f(r.as_ref()).boxed()),
            Expr::Div(l, r) => Expr::Div(f(l.as_ref()).boxed(), f(r.as_ref()).boxed()),
            Expr::Pow(l, r) => Expr::Pow(f(l.as_ref()).boxed(), f(r.as_ref()).boxed()),
            other => match other.as_unary() {
                Some((func, arg)) => func.apply(f(arg)),
                None => other.clone(),
            },
        }
    }

    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Var(_) | Expr::Const(_) | Expr::Pi | Expr::E => Vec::new(),
            Expr::Add(l, r)
            | Expr::Sub(l, r)
            | Expr::Mul(l, r)
            | Expr::Div(l, r)
            | Expr::Pow(l, r) => vec![l.as_ref(), r.as_ref()],
            other => other.as_unary().map(|(_, a)| vec![a]).unwrap_or_default(),
        }
    }

    pub fn contains_variable(&self, var: &str) -> bool {
        match self {
            Expr::Var(name) => name == var,
            _ => self.children().iter().any(|c| c.contains_variable(var)),
        }
    }

    /// sorted set of all variable names in the expression
    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables(&self, vars: &mut BTreeSet<String>) {
        if let Expr::Var(name) = self {
            vars.insert(name.clone());
        }
        for child in self.children() {
            child.collect_variables(vars);
        }
    }

    /// Replaces the variable `var` with `value` everywhere; no simplification.
    pub fn substitute(&self, var: &str, value: &Expr) -> Expr {
        match self {
            Expr::Var(name) if name == var => value.clone(),
            _ => self.map_children(|c| c.substitute(var, value)),
        }
    }

    /// Sets the variable to the exact rational value of the float `value`.
    pub fn set_variable(&self, var: &str, value: f64) -> Result<Expr, String> {
        let exact = BigRational::from_float(value)
            .ok_or_else(|| format!("cannot substitute non-finite value {} for {}", value, var))?;
        Ok(self.substitute(var, &Expr::Const(exact)))
    }

    /// Structural replacement of every occurrence of `target`.
    pub fn replace(&self, target: &Expr, with: &Expr) -> Expr {
        if self == target {
            return with.clone();
        }
        self.map_children(|c| c.replace(target, with))
    }

    /// pre-order list of the nodes
    pub fn subexpressions(&self) -> Vec<&Expr> {
        let mut out = vec![self];
        for child in self.children() {
            out.extend(child.subexpressions());
        }
        out
    }

    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(|c| c.node_count()).sum::<usize>()
    }

    /// height of the tree, walked with an explicit stack
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((e, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(e.children().into_iter().map(|c| (c, level + 1)));
        }
        deepest
    }

    /// Direct numerical evaluation; any variable other than `var` evaluates to NaN.
    pub fn eval_expression(&self, var: &str, x: f64) -> f64 {
        match self {
            Expr::Var(name) => {
                if name == var {
                    x
                } else {
                    f64::NAN
                }
            }
            Expr::Const(c) => rational_to_f64(c),
            Expr::Pi => PI,
            Expr::E => E,
            Expr::Add(l, r) => l.eval_expression(var, x) + r.eval_expression(var, x),
            Expr::Sub(l, r) => l.eval_expression(var, x) - r.eval_expression(var, x),
            Expr::Mul(l, r) => l.eval_expression(var, x) * r.eval_expression(var, x),
            Expr::Div(l, r) => l.eval_expression(var, x) / r.eval_expression(var, x),
            Expr::Pow(base, exp) => {
                let b = base.eval_expression(var, x);
                match exp.as_integer() {
                    Some(n) if n.abs() <= i32::MAX as i64 => b.powi(n as i32),
                    _ => b.powf(exp.eval_expression(var, x)),
                }
            }
            other => match other.as_unary() {
                Some((func, arg)) => func.eval(arg.eval_expression(var, x)),
                None => f64::NAN,
            },
        }
    }

    /// Numerical value of a variable-free expression (NaN if a variable is present).
    pub fn eval_f64(&self) -> f64 {
        self.eval_expression("", f64::NAN)
    }
}

/// BigRational -> f64 without panicking on huge numerators or denominators.
pub fn rational_to_f64(c: &BigRational) -> f64 {
    if let Some(v) = c.to_f64() {
        if v.is_finite() {
            return v;
        }
    }
    // both parts may overflow f64 while the ratio does not
    let (n, d) = (c.numer(), c.denom());
    let shift = n.bits().max(d.bits()).saturating_sub(900);
    let n = (n >> shift).to_f64().unwrap_or(f64::NAN);
    let d = (d >> shift).to_f64().unwrap_or(f64::NAN);
    n / d
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_operators_build_trees() {
        let x = Expr::var("x");
        let f = x.clone() * x.clone() + Expr::int(1);
        assert_eq!(
            f,
            Expr::Add(
                Box::new(Expr::Mul(Box::new(x.clone()), Box::new(x.clone()))),
                Box::new(Expr::int(1))
            )
        );
        assert_eq!(-x.clone(), Expr::Mul(Box::new(Expr::int(-1)), Box::new(x)));
    }

    #[test]
    fn test_display_rational() {
        let f = Expr::var("x").pow(Expr::rational(1, 2));
        assert_eq!(f.to_string(), "(x ^ (1/2))");
        assert_eq!(Expr::sin(Expr::Pi.boxed()).to_string(), "sin(pi)");
    }

    #[test]
    fn test_substitute_and_eval() {
        let x = Expr::var("x");
        let f = Expr::sin(x.clone().boxed()) + x.clone().pow(Expr::int(2));
        let g = f.substitute("x", &Expr::Pi);
        assert!(!g.contains_variable("x"));
        assert_relative_eq!(g.eval_f64(), PI * PI, epsilon = 1e-12);
        assert_relative_eq!(f.eval_expression("x", 2.0), 2f64.sin() + 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_set_variable_is_exact() {
        let f = Expr::var("x") * Expr::int(3);
        let g = f.set_variable("x", 0.5).unwrap();
        assert_eq!(g, Expr::rational(1, 2) * Expr::int(3));
        assert!(f.set_variable("x", f64::NAN).is_err());
    }

    #[test]
    fn test_free_variables_and_replace() {
        let f = Expr::var("x") + Expr::var("y") * Expr::var("x");
        let vars: Vec<String> = f.free_variables().into_iter().collect();
        assert_eq!(vars, vec!["x".to_string(), "y".to_string()]);
        let g = f.replace(&Expr::var("y"), &Expr::int(2));
        assert!(!g.contains_variable("y"));
    }

    #[test]
    fn test_negative_base_fractional_power_is_nan() {
        let f = Expr::var("x").pow(Expr::rational(1, 3));
        assert!(f.eval_expression("x", -8.0).is_nan());
        assert_relative_eq!(f.eval_expression("x", 8.0), 2.0, epsilon = 1e-12);
        let g = Expr::var("x").pow(Expr::int(3));
        assert_relative_eq!(g.eval_expression("x", -2.0), -8.0);
    }

    #[test]
    fn test_huge_rational_to_f64() {
        let big = BigInt::from(10).pow(400u32);
        let c = BigRational::new(big.clone() * BigInt::from(3), big);
        assert_relative_eq!(rational_to_f64(&c), 3.0, epsilon = 1e-12);
    }
}
