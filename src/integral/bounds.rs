//! Integration bounds: two strings in, two exact constants with their floating values out.
use crate::integral::error::{CalculationError, CalculationResult};
use crate::integral::sampler::plot_window;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_traits::SymbolicBackend;
use log::debug;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    /// exact value, free of variables
    pub expr: Expr,
    /// finite floating value of `expr`
    pub value: f64,
}

impl Bound {
    pub fn new(backend: &dyn SymbolicBackend, input: &str) -> CalculationResult<Bound> {
        let expr = backend
            .parse_bound(input)
            .map_err(CalculationError::InvalidBound)?;
        let value = backend
            .to_f64(&expr)
            .map_err(CalculationError::InvalidBound)?;
        Ok(Bound { expr, value })
    }

    /// exact comparison when both are rational numbers, else on the floats
    pub fn compare(&self, other: &Bound) -> Ordering {
        match (self.expr.as_rational(), other.expr.as_rational()) {
            (Some(a), Some(b)) => a.cmp(b),
            _ => self.value.total_cmp(&other.value),
        }
    }
}

/// Resolves both bounds, then requires `lower < upper` strictly.
pub fn resolve_bounds(
    backend: &dyn SymbolicBackend,
    lower: &str,
    upper: &str,
) -> CalculationResult<(Bound, Bound)> {
    let lower = Bound::new(backend, lower)?;
    let upper = Bound::new(backend, upper)?;
    debug!("bounds resolved: [{}, {}]", lower.expr, upper.expr);
    validate_order(&lower, &upper)?;
    validate_span(&lower, &upper)?;
    Ok((lower, upper))
}

pub fn validate_order(lower: &Bound, upper: &Bound) -> CalculationResult<()> {
    if lower.compare(upper) == Ordering::Less {
        Ok(())
    } else {
        Err(CalculationError::BoundOrder)
    }
}

/// The padded plot window around `[lower, upper]` must stay within f64.
pub fn validate_span(lower: &Bound, upper: &Bound) -> CalculationResult<()> {
    let (start, end) = plot_window(lower.value, upper.value);
    if start.is_finite() && end.is_finite() {
        Ok(())
    } else {
        Err(CalculationError::InvalidBound(format!(
            "the interval [{:e}, {:e}] is too wide to evaluate numerically",
            lower.value, upper.value
        )))
    }
}
