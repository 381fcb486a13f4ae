// SYMBOLIC TRAITS //////////////////////////////////////////////////////////////////
// The capability interface the integral pipeline talks to.
// The trait is implemented for the native engine (`Expr`) below;
// add other engines here as needed

use crate::symbolic::singularities::exact_to_f64;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_lambdify::BatchEvaluator;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

/// name of the integration variable
pub const VARIABLE: &str = "x";

pub trait SymbolicBackend: Send + Sync {
    /// engine name, for logs
    fn name(&self) -> &'static str;
    /// integrand in the single variable `x`
    fn parse(&self, input: &str) -> Result<Expr, String>;
    /// variable-free constant
    fn parse_bound(&self, input: &str) -> Result<Expr, String>;
    fn antiderivative(&self, f: &Expr) -> Result<Expr, String>;
    /// exact definite integral, using an antiderivative computed by `antiderivative`
    fn definite_integral(
        &self,
        f: &Expr,
        antiderivative: &Expr,
        lower: &Expr,
        upper: &Expr,
    ) -> Result<Expr, String>;
    /// `f` with `x` replaced by `value`, simplified
    fn substitute(&self, f: &Expr, value: &Expr) -> Expr;
    fn to_latex(&self, e: &Expr) -> String;
    /// floating value of a variable-free expression, Err unless finite
    fn to_f64(&self, e: &Expr) -> Result<f64, String>;
    /// slow path: exact substitution of one point; infinities pass through,
    /// values that are not real numbers are errors
    fn eval_point(&self, f: &Expr, x: f64) -> Result<f64, String>;
    /// fast path: vectorized numeric evaluator of `f`
    fn batch_evaluator(&self, f: &Expr) -> Result<BatchEvaluator, String>;
}

///////////////// IMPLEMENTATION OF THE TRAIT FOR THE NATIVE ENGINE /////////////////////////
pub struct NativeBackend;

impl SymbolicBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }
    fn parse(&self, input: &str) -> Result<Expr, String> {
        Expr::parse_expression(input)
    }
    fn parse_bound(&self, input: &str) -> Result<Expr, String> {
        Expr::parse_constant(input).map(|e| e.simplify())
    }
    fn antiderivative(&self, f: &Expr) -> Result<Expr, String> {
        f.integrate(VARIABLE)
    }
    fn definite_integral(
        &self,
        f: &Expr,
        antiderivative: &Expr,
        lower: &Expr,
        upper: &Expr,
    ) -> Result<Expr, String> {
        f.definite_integral_with(antiderivative, VARIABLE, lower, upper)
    }
    fn substitute(&self, f: &Expr, value: &Expr) -> Expr {
        f.substitute(VARIABLE, value).simplify()
    }
    fn to_latex(&self, e: &Expr) -> String {
        e.to_latex()
    }
    fn to_f64(&self, e: &Expr) -> Result<f64, String> {
        exact_to_f64(e)
    }
    fn eval_point(&self, f: &Expr, x: f64) -> Result<f64, String> {
        let value = f.set_variable(VARIABLE, x)?.simplify().eval_f64();
        if value.is_nan() {
            Err(format!("{} is not a real number at x = {}", f, x))
        } else {
            Ok(value)
        }
    }
    fn batch_evaluator(&self, f: &Expr) -> Result<BatchEvaluator, String> {
        f.lambdify_batch(VARIABLE)
    }
}

/////////////////////////////////////////////////////////////////////////////////////////
// FACTORY METHODS  ////////////////////////////////////////////////////////////////////
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SymbolicEngineType {
    Native,
    // Add other engines here as needed
}

pub fn get_symbolic_backend(engine_type: SymbolicEngineType) -> Arc<dyn SymbolicBackend> {
    match engine_type {
        SymbolicEngineType::Native => Arc::new(NativeBackend),
    }
}

pub fn symbolic_backend_from_string(engine_type: &str) -> Result<Arc<dyn SymbolicBackend>, String> {
    let engine_type: SymbolicEngineType = engine_type
        .parse()
        .map_err(|_| format!("unknown symbolic engine '{}'", engine_type))?;
    Ok(get_symbolic_backend(engine_type))
}

//___________________________________TESTS____________________________________
