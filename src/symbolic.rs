#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// a module turns a String expression into a symbolic expression
///
///# Example
/// ```rust, ignore
/// use RustedIntegral::symbolic::symbolic_engine::Expr;
/// let parsed_expression = Expr::parse_expression("2x sin(x^2)").unwrap();
/// println!(" parsed_expression {}", parsed_expression);
/// let parsed_function = parsed_expression.lambdify1D("x").unwrap();
/// println!("f(1) = {}", parsed_function(1.0));
///  ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// a module
/// 1) holds the expression tree with exact rational constants
/// 2) substitutes, traverses and evaluates expressions
/// 3) turns a symbolic expression into a string expression for printing and control results
///# Example#
/// ```rust, ignore
/// use RustedIntegral::symbolic::symbolic_engine::Expr;
/// let f = Expr::parse_expression("x^3/3 + ln(x)").unwrap();
/// // differentiate with respect to x
/// let df_dx = f.diff("x");
/// println!("df_dx = {}", df_dx);
/// // compare numerical and analtical derivatives on 100 points of [1, 10]
/// let (norm, res) = f.compare_num1D("x", 1.0, 10.0, 100, 1e-6);
/// println!("norm = {}, res = {}", norm, res);
/// ```
/// ________________________________________________________________________________________________________________________________________________
pub mod symbolic_engine;
pub mod symbolic_engine_derivatives;
///________________________________________________________________________________________________________________________________________________
/// # Integration
/// antiderivatives (table, partial fractions, substitution, by parts, reduction formulas)
/// and exact definite integrals with a check of the singular points of the interval
/// Example#
/// ```rust, ignore
/// use RustedIntegral::symbolic::symbolic_engine::Expr;
/// let f = Expr::parse_expression("x*exp(x)").unwrap();
/// let F = f.integrate("x").unwrap();
/// let value = f.definite_integral("x", &Expr::int(0), &Expr::int(1)).unwrap();
/// println!("F(x) = {}, integral from 0 to 1 = {}", F.to_latex(), value.to_latex());
/// ```
pub mod symbolic_integration;
pub mod singularities;
/// exact univariate polynomials and partial fractions
pub mod polynomial;
/// algebraic simplification with exact constant folding
pub mod symbolic_simplify;
/// symbolic expression -> Rust closure
pub mod symbolic_lambdify;
pub mod symbolic_latex;
pub mod symbolic_traits;
///______________________________________________________________________________________________________________________________________________
/// the collection of utility functions: grids, root search, rational approximation, number formatting
/// _____________________________________________________________________________________________________________________________________________
pub mod utils;
