//! Chart data: the integrand sampled over a padded window around the bounds, plus a
//! second, denser look at `[lower, upper]` for the shaded area.
//!
//! Values the chart cannot draw (poles, NaN outside of the domain) are replaced by 0.0
//! in both series, so the curve drops to the axis instead of breaking the plot.
use crate::integral::error::{CalculationError, CalculationResult};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_traits::SymbolicBackend;
use log::{debug, warn};
use ndarray::Array1;
use serde::Serialize;

pub const CURVE_POINTS: usize = 200;
pub const AREA_POINTS: usize = 100;
/// share of the span added on each side of the bounds
pub const PADDING: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSample {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub x_area: Vec<f64>,
    pub y_area: Vec<f64>,
}

/// `[lower - span/2, upper + span/2]`
pub fn plot_window(lower: f64, upper: f64) -> (f64, f64) {
    let span = upper - lower;
    (lower - span * PADDING, upper + span * PADDING)
}

/// Evaluates `f` on the grid with the backend's batched evaluator. When it cannot be
/// built (or gives a result of the wrong size) every point is evaluated on its own;
/// then the first point that fails fails the whole sample.
pub fn evaluate_on_grid(
    backend: &dyn SymbolicBackend,
    f: &Expr,
    xs: &Array1<f64>,
) -> CalculationResult<Array1<f64>> {
    match backend.batch_evaluator(f) {
        Ok(evaluator) => {
            let ys = evaluator(xs);
            if ys.len() == xs.len() {
                return Ok(ys);
            }
            warn!(
                "batched evaluation returned {} values for {} points, evaluating point by point",
                ys.len(),
                xs.len()
            );
        }
        Err(e) => warn!("batched evaluation unavailable ({}), evaluating point by point", e),
    }
    xs.iter()
        .map(|&x| backend.eval_point(f, x))
        .collect::<Result<Vec<f64>, String>>()
        .map(Array1::from)
        .map_err(CalculationError::Computation)
}

/// non-finite values -> 0.0
pub fn sanitize(ys: Array1<f64>) -> Array1<f64> {
    ys.mapv_into(|y| if y.is_finite() { y } else { 0.0 })
}

pub fn sample_curve(
    backend: &dyn SymbolicBackend,
    f: &Expr,
    lower: f64,
    upper: f64,
) -> CalculationResult<(Vec<f64>, Vec<f64>)> {
    let (start, end) = plot_window(lower, upper);
    let xs = Array1::linspace(start, end, CURVE_POINTS);
    let ys = sanitize(evaluate_on_grid(backend, f, &xs)?);
    debug!("curve sampled on [{}, {}]", start, end);
    Ok((xs.to_vec(), ys.to_vec()))
}

pub fn sample_area(
    backend: &dyn SymbolicBackend,
    f: &Expr,
    lower: f64,
    upper: f64,
) -> CalculationResult<(Vec<f64>, Vec<f64>)> {
    let xs = Array1::linspace(lower, upper, AREA_POINTS);
    let ys = sanitize(evaluate_on_grid(backend, f, &xs)?);
    Ok((xs.to_vec(), ys.to_vec()))
}

pub fn sample_plot(
    backend: &dyn SymbolicBackend,
    f: &Expr,
    lower: f64,
    upper: f64,
) -> CalculationResult<PlotSample> {
    let (x, y) = sample_curve(backend, f, lower, upper)?;
    let (x_area, y_area) = sample_area(backend, f, lower, upper)?;
    Ok(PlotSample { x, y, x_area, y_area })
}
