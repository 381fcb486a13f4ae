//! Definite integral calculator built on top of the symbolic engine.
///
/// # Example
/// ```rust, ignore
/// use RustedIntegral::integral::pipeline::{CalculationRequest, IntegralPipeline};
/// let pipeline = IntegralPipeline::default();
/// let response = pipeline.calculate(&CalculationRequest::new("x^2", "0", "2")).unwrap();
/// assert_eq!(response.latex_result, "\\frac{8}{3}");
/// println!("{}", response.steps.join("\n"));
/// ```
/// ________________________________________________________________________________________________________________________________
pub mod pipeline;
/// lower and upper bounds: parsing and ordering
pub mod bounds;
/// six-step LaTeX derivation
pub mod derivation;
/// error taxonomy of a calculation request
pub mod error;
/// curve and area samples for the chart
pub mod sampler;
