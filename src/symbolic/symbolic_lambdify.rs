//! # Lambdification
//!
//! Converting symbolic expressions into executable closures. The expression tree is
//! compiled once into a flat `Lambda` tree with f64 constants and variable indices,
//! so evaluating it on many points never touches `BigRational` arithmetic again.
//!
//! - `compile(vars)` - `Expr` -> `Lambda`
//! - `lambdify1(vars)` - closure over a slice of arguments
//! - `lambdify1D(var)` - closure of one argument, used by quadrature
//! - `lambdify_batch(var)` - vectorized closure over `ndarray::Array1`, used by the plot sampler
use crate::symbolic::symbolic_engine::{Expr, Func, rational_to_f64};
use ndarray::Array1;
use std::f64::consts::{E, PI};

/// vectorized evaluator over a grid of points
pub type BatchEvaluator = Box<dyn Fn(&Array1<f64>) -> Array1<f64> + Send + Sync>;

#[derive(Clone, Debug)]
pub enum Lambda {
    Var(usize),
    Const(f64),
    Add(Box<Lambda>, Box<Lambda>),
    Sub(Box<Lambda>, Box<Lambda>),
    Mul(Box<Lambda>, Box<Lambda>),
    Div(Box<Lambda>, Box<Lambda>),
    /// integer exponent, evaluated with `powi` like `Expr::eval_expression` does
    Powi(Box<Lambda>, i32),
    Pow(Box<Lambda>, Box<Lambda>),
    Unary(Func, Box<Lambda>),
}

impl Expr {
    /// Compiles the expression; every free variable must be listed in `vars`.
    pub fn compile(&self, vars: &[&str]) -> Result<Lambda, String> {
        let lambda = match self {
            Expr::Var(name) => {
                let idx = vars
                    .iter()
                    .position(|&v| v == name)
                    .ok_or_else(|| format!("unknown variable '{}' in {}", name, self))?;
                Lambda::Var(idx)
            }
            Expr::Const(c) => Lambda::Const(rational_to_f64(c)),
            Expr::Pi => Lambda::Const(PI),
            Expr::E => Lambda::Const(E),
            Expr::Add(a, b) => Lambda::Add(Box::new(a.compile(vars)?), Box::new(b.compile(vars)?)),
            Expr::Sub(a, b) => Lambda::Sub(Box::new(a.compile(vars)?), Box::new(b.compile(vars)?)),
            Expr::Mul(a, b) => Lambda::Mul(Box::new(a.compile(vars)?), Box::new(b.compile(vars)?)),
            Expr::Div(a, b) => Lambda::Div(Box::new(a.compile(vars)?), Box::new(b.compile(vars)?)),
            Expr::Pow(a, b) => match b.as_integer() {
                Some(n) if n.abs() <= i32::MAX as i64 => {
                    Lambda::Powi(Box::new(a.compile(vars)?), n as i32)
                }
                _ => Lambda::Pow(Box::new(a.compile(vars)?), Box::new(b.compile(vars)?)),
            },
            other => match other.as_unary() {
                Some((func, arg)) => Lambda::Unary(func, Box::new(arg.compile(vars)?)),
                None => return Err(format!("cannot compile {}", other)),
            },
        };
        Ok(lambda)
    } // end of compile

    pub fn lambdify1(&self, vars: &[&str]) -> Result<Box<dyn Fn(&[f64]) -> f64 + Send + Sync>, String> {
        let compiled = self.compile(vars)?;
        Ok(Box::new(compiled.as_closure()))
    }

    /// Closure of the single variable `var`. A variable-free expression gives a
    /// constant closure; any other variable is an error.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let f = Expr::parse_expression("x^2").unwrap();
    /// let func = f.lambdify1D("x").unwrap();
    /// assert_eq!(func(3.0), 9.0);
    /// ```
    pub fn lambdify1D(&self, var: &str) -> Result<Box<dyn Fn(f64) -> f64 + Send + Sync>, String> {
        let compiled = self.compile(&[var])?;
        Ok(Box::new(move |x| compiled.eval(&[x])))
    } // end of lambdify1D

    /// Vectorized closure: maps every element of the grid through the expression.
    pub fn lambdify_batch(&self, var: &str) -> Result<BatchEvaluator, String> {
        let compiled = self.compile(&[var])?;
        Ok(Box::new(move |xs: &Array1<f64>| {
            xs.mapv(|x| compiled.eval(&[x]))
        }))
    }
}

impl Lambda {
    #[inline(always)]
    pub fn eval(&self, args: &[f64]) -> f64 {
        match self {
            Lambda::Var(i) => args.get(*i).copied().unwrap_or(f64::NAN),
            Lambda::Const(v) => *v,
            Lambda::Add(a, b) => a.eval(args) + b.eval(args),
            Lambda::Sub(a, b) => a.eval(args) - b.eval(args),
            Lambda::Mul(a, b) => a.eval(args) * b.eval(args),
            Lambda::Div(a, b) => a.eval(args) / b.eval(args),
            Lambda::Powi(a, n) => a.eval(args).powi(*n),
            Lambda::Pow(a, b) => a.eval(args).powf(b.eval(args)),
            Lambda::Unary(func, e) => func.eval(e.eval(args)),
        }
    }

    pub fn as_closure(self) -> impl Fn(&[f64]) -> f64 + Send + Sync {
        move |args| self.eval(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lambdify1D_matches_eval_expression() {
        for src in [
            "x^2 + 3*x - 1",
            "sin(x)*exp(-x)",
            "sqrt(x) + ln(x)",
            "1/(1 + x^2)",
            "acot(x) + tanh(x)",
            "abs(x - 2)^(3/2)",
        ] {
            let f = Expr::parse_expression(src).unwrap();
            let func = f.lambdify1D("x").unwrap();
            for x in [0.3, 1.0, 2.5, 7.0] {
                assert_relative_eq!(func(x), f.eval_expression("x", x), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_constant_and_foreign_variable() {
        let c = Expr::parse_constant("pi/2").unwrap();
        let func = c.lambdify1D("x").unwrap();
        assert_relative_eq!(func(123.0), PI / 2.0);
        let g = Expr::var("x") * Expr::var("y");
        assert!(g.lambdify1D("x").is_err());
        let both = g.lambdify1(&["x", "y"]).unwrap();
        assert_relative_eq!(both(&[2.0, 3.0]), 6.0);
    }

    #[test]
    fn test_negative_base_integer_power() {
        let f = Expr::parse_expression("x^3").unwrap();
        assert_relative_eq!(f.lambdify1D("x").unwrap()(-2.0), -8.0);
        let g = Expr::parse_expression("x^(1/3)").unwrap();
        assert!(g.lambdify1D("x").unwrap()(-8.0).is_nan());
    }

    #[test]
    fn test_lambdify_batch() {
        let f = Expr::parse_expression("1/x").unwrap();
        let batch = f.lambdify_batch("x").unwrap();
        let xs = Array1::linspace(-1.0, 1.0, 5);
        let ys = batch(&xs);
        assert_eq!(ys.len(), 5);
        assert_relative_eq!(ys[0], -1.0);
        assert!(ys[2].is_infinite());
        assert_relative_eq!(ys[4], 1.0);
    }
}
