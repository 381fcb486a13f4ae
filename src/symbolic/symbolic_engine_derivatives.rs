//! # Symbolic Engine Derivatives Module
//!
//! Analytical differentiation of `Expr` and the numerical checks built on it.
//!
//! ## Key Methods
//!
//! ### Differentiation
//! - `diff(var: &str)` - analytical derivative, simplified
//! - `n_th_derivative1D()` - higher-order derivatives
//!
//! ### Numerical Analysis
//! - `compare_num1D()` - validate an analytical derivative against finite differences
//! - `check_antiderivative()` - validate that `F' == f` on a set of test points
//!
//! ## Interesting Code Features
//!
//! 1. **Recursive Differentiation Rules**: product, quotient and chain rule for every
//!    function node, general power rule `(b^e)' = b^e (e' ln b + e b'/b)`
//!
//! 2. **Numerical Validation**: the integrator never trusts its own table rules, every
//!    antiderivative is differentiated back and compared with the integrand

use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::{linspace, numerical_derivative};

/// test points for antiderivative verification, deliberately irregular
pub const CHECK_POINTS: [f64; 19] = [
    -9.7, -6.1, -4.4, -2.3, -1.7, -0.9, -0.35, -0.05, 0.013, 0.05, 0.27, 0.61, 1.3, 2.2, 3.7,
    4.1, 5.3, 7.9, 11.2,
];

impl Expr {
    /// Analytical derivative with respect to `var`, simplified.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let x = Expr::Var("x".to_string());
    /// let f = x.clone().pow(Expr::int(2)); // x^2
    /// let df_dx = f.diff("x"); // 2*x
    /// ```
    pub fn diff(&self, var: &str) -> Expr {
        self.diff_raw(var).simplify()
    }

    fn diff_raw(&self, var: &str) -> Expr {
        if !self.contains_variable(var) {
            return Expr::zero();
        }
        match self {
            Expr::Var(_) => Expr::one(),
            Expr::Const(_) | Expr::Pi | Expr::E => Expr::zero(),
            Expr::Add(lhs, rhs) => lhs.diff_raw(var) + rhs.diff_raw(var),
            Expr::Sub(lhs, rhs) => lhs.diff_raw(var) - rhs.diff_raw(var),
            Expr::Mul(lhs, rhs) => {
                lhs.diff_raw(var) * rhs.as_ref().clone() + lhs.as_ref().clone() * rhs.diff_raw(var)
            }
            Expr::Div(lhs, rhs) => {
                if !rhs.contains_variable(var) {
                    return lhs.diff_raw(var) / rhs.as_ref().clone();
                }
                (lhs.diff_raw(var) * rhs.as_ref().clone() - lhs.as_ref().clone() * rhs.diff_raw(var))
                    / rhs.as_ref().clone().pow(Expr::int(2))
            }
            Expr::Pow(base, exp) => {
                let b = base.as_ref().clone();
                let e = exp.as_ref().clone();
                if !exp.contains_variable(var) {
                    // power rule
                    e.clone() * b.clone().pow(e - Expr::one()) * base.diff_raw(var)
                } else if !base.contains_variable(var) {
                    self.clone() * Expr::Ln(b.boxed()) * exp.diff_raw(var)
                } else {
                    self.clone()
                        * (exp.diff_raw(var) * Expr::Ln(b.clone().boxed())
                            + e * base.diff_raw(var) / b)
                }
            }
            Expr::Exp(u) => Expr::Exp(u.clone()) * u.diff_raw(var),
            Expr::Ln(u) => u.diff_raw(var) / u.as_ref().clone(),
            Expr::Abs(u) => {
                u.diff_raw(var) * u.as_ref().clone() / Expr::Abs(u.clone())
            }
            Expr::sin(u) => Expr::cos(u.clone()) * u.diff_raw(var),
            Expr::cos(u) => -(Expr::sin(u.clone()) * u.diff_raw(var)),
            Expr::tg(u) => u.diff_raw(var) / Expr::cos(u.clone()).pow(Expr::int(2)),
            Expr::ctg(u) => -(u.diff_raw(var) / Expr::sin(u.clone()).pow(Expr::int(2))),
            Expr::arcsin(u) => {
                u.diff_raw(var) / (Expr::one() - u.as_ref().clone().pow(Expr::int(2))).sqrt()
            }
            Expr::arccos(u) => {
                -(u.diff_raw(var) / (Expr::one() - u.as_ref().clone().pow(Expr::int(2))).sqrt())
            }
            Expr::arctg(u) => {
                u.diff_raw(var) / (Expr::one() + u.as_ref().clone().pow(Expr::int(2)))
            }
            Expr::arcctg(u) => {
                -(u.diff_raw(var) / (Expr::one() + u.as_ref().clone().pow(Expr::int(2))))
            }
            Expr::sinh(u) => Expr::cosh(u.clone()) * u.diff_raw(var),
            Expr::cosh(u) => Expr::sinh(u.clone()) * u.diff_raw(var),
            Expr::tanh(u) => u.diff_raw(var) / Expr::cosh(u.clone()).pow(Expr::int(2)),
        }
    } // end of diff

    pub fn n_th_derivative1D(&self, var_name: &str, n: usize) -> Expr {
        let mut expr = self.clone();
        for _ in 0..n {
            expr = expr.diff(var_name);
        }
        expr
    }

    /// Compares the analytical derivative with a central finite difference on
    /// `num_values` points of `[start, end]`.
    ///
    /// # Returns
    /// Tuple of (max abs difference over finite points, is_within_tolerance)
    pub fn compare_num1D(
        &self,
        var: &str,
        start: f64,
        end: f64,
        num_values: usize,
        max_norm: f64,
    ) -> (f64, bool) {
        let diff = self.diff(var);
        let domain = linspace(start, end, num_values);
        let step = (1.0 / 1e4) * (end - start) / (num_values as f64 - 1.0);
        let numerical = numerical_derivative(|x| self.eval_expression(var, x), &domain, step);
        let norma_val = domain
            .iter()
            .zip(numerical.iter())
            .map(|(&x, &n)| (diff.eval_expression(var, x) - n).abs())
            .filter(|d| d.is_finite())
            .fold(0.0, f64::max);
        (norma_val, max_norm > norma_val)
    }

    /// true when `self` differentiates back to `integrand` on the test points
    /// where both are defined; at least three such points are required.
    pub fn check_antiderivative(&self, integrand: &Expr, var: &str) -> bool {
        let derivative = self.diff(var);
        let mut valid = 0;
        for &x in CHECK_POINTS.iter() {
            let expected = integrand.eval_expression(var, x);
            let got = derivative.eval_expression(var, x);
            if !expected.is_finite() || !got.is_finite() {
                continue;
            }
            let scale = expected.abs().max(1.0);
            if (expected - got).abs() > 1e-6 * scale {
                return false;
            }
            valid += 1;
        }
        valid >= 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn x() -> Expr {
        Expr::var("x")
    }

    #[test]
    fn test_polynomial_derivative() {
        let f = x().pow(Expr::int(3)) + Expr::int(2) * x();
        let df = f.diff("x");
        assert_relative_eq!(df.eval_expression("x", 2.0), 14.0, epsilon = 1e-12);
        assert_eq!(Expr::int(5).diff("x"), Expr::zero());
    }

    #[test]
    fn test_chain_and_quotient_rules() {
        let f = Expr::sin(Box::new(x().pow(Expr::int(2))));
        let df = f.diff("x");
        let at = 0.8;
        assert_relative_eq!(
            df.eval_expression("x", at),
            2.0 * at * (at * at).cos(),
            epsilon = 1e-12
        );
        let g = x() / (x() + Expr::one());
        assert_relative_eq!(g.diff("x").eval_expression("x", 1.0), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_variable_exponent() {
        let f = x().pow(x());
        let at = 1.5f64;
        let expected = at.powf(at) * (at.ln() + 1.0);
        assert_relative_eq!(f.diff("x").eval_expression("x", at), expected, epsilon = 1e-10);
        let g = Expr::int(2).pow(x());
        assert_relative_eq!(
            g.diff("x").eval_expression("x", 1.0),
            2.0 * 2f64.ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_compare_num1D() {
        for f in [
            Expr::arctg(x().boxed()),
            Expr::tanh(x().boxed()),
            Expr::Abs(Box::new(x() - Expr::int(5))),
            Expr::Exp(x().boxed()) * Expr::cos(x().boxed()),
        ] {
            let (norm, ok) = f.compare_num1D("x", 0.1, 2.0, 50, 1e-4);
            assert!(ok, "{} differs by {}", f, norm);
        }
    }

    #[test]
    fn test_check_antiderivative() {
        let f = x().pow(Expr::int(2));
        let good = x().pow(Expr::int(3)) / Expr::int(3);
        let bad = x().pow(Expr::int(3));
        assert!(good.check_antiderivative(&f, "x"));
        assert!(!bad.check_antiderivative(&f, "x"));
        // ln|x| is defined on every test point, ln(x) only on the positive ones
        let inv = Expr::one() / x();
        assert!(Expr::Ln(Box::new(Expr::Abs(x().boxed()))).check_antiderivative(&inv, "x"));
        assert!(Expr::Ln(x().boxed()).check_antiderivative(&inv, "x"));
    }

    #[test]
    fn test_nth_derivative() {
        let f = Expr::sin(x().boxed());
        let d4 = f.n_th_derivative1D("x", 4);
        assert_relative_eq!(d4.eval_expression("x", 0.4), 0.4f64.sin(), epsilon = 1e-12);
    }
}
