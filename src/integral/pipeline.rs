//! # Pipeline
//!
//! One calculation request goes through a fixed sequence of stages:
//!
//! ```text
//! ReceiveInput -> ValidatePresence -> ParseFunction -> ResolveBounds -> ValidateBoundOrder
//!   -> ComputeAntiderivative -> ComputeDefiniteIntegral -> FormatSteps -> SampleCurve
//!   -> SampleArea -> AssembleResponse
//! ```
//!
//! The first failing stage ends the run; there is no partial response. Everything is
//! request scoped, an `IntegralPipeline` only holds the (stateless) symbolic backend,
//! so it can be shared between threads.
use crate::integral::bounds::{Bound, validate_order, validate_span};
use crate::integral::derivation::{DerivationInput, derivation_steps};
use crate::integral::error::{CalculationError, CalculationResult};
use crate::integral::sampler::{PlotSample, sample_area, sample_curve};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_traits::{NativeBackend, SymbolicBackend};
use crate::symbolic::utils::format_significant;
use log::{debug, info, warn};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use strum_macros::{Display, EnumIter};

/// significant digits of the `result` field
pub const RESULT_DIGITS: usize = 15;

/// Raw user input. Every field is optional at this point, JSON numbers are accepted
/// and kept as their decimal text.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CalculationRequest {
    #[serde(default, deserialize_with = "text_or_number")]
    pub function: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub lower: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub upper: Option<String>,
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected a string or a number, found {}",
            other
        ))),
    }
}

impl CalculationRequest {
    pub fn new(function: &str, lower: &str, upper: &str) -> Self {
        CalculationRequest {
            function: Some(function.to_string()),
            lower: Some(lower.to_string()),
            upper: Some(upper.to_string()),
        }
    }

    /// the three inputs; empty strings count as missing
    pub fn required_fields(&self) -> CalculationResult<(&str, &str, &str)> {
        fn field<'a>(value: &'a Option<String>, name: &str) -> CalculationResult<&'a str> {
            match value.as_deref() {
                Some(s) if !s.is_empty() => Ok(s),
                _ => Err(CalculationError::MissingField(name.to_string())),
            }
        }
        Ok((
            field(&self.function, "function")?,
            field(&self.lower, "lower")?,
            field(&self.upper, "upper")?,
        ))
    }
}

/// Success payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationResponse {
    /// exact value printed with 15 significant digits
    pub result: String,
    pub latex_result: String,
    pub steps: Vec<String>,
    pub plot_data: PlotSample,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationResult {
    pub antiderivative: Expr,
    pub exact: Expr,
    /// floating value of `exact`, never computed any other way
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    ReceiveInput,
    ValidatePresence,
    ParseFunction,
    ResolveBounds,
    ValidateBoundOrder,
    ComputeAntiderivative,
    ComputeDefiniteIntegral,
    FormatSteps,
    SampleCurve,
    SampleArea,
    AssembleResponse,
}

#[derive(Clone)]
pub struct IntegralPipeline {
    backend: Arc<dyn SymbolicBackend>,
}

impl Default for IntegralPipeline {
    fn default() -> Self {
        IntegralPipeline::new(Arc::new(NativeBackend))
    }
}

impl IntegralPipeline {
    pub fn new(backend: Arc<dyn SymbolicBackend>) -> Self {
        IntegralPipeline { backend }
    }

    pub fn backend(&self) -> &dyn SymbolicBackend {
        self.backend.as_ref()
    }

    /// Runs every stage on `request`; logs the outcome.
    pub fn calculate(&self, request: &CalculationRequest) -> CalculationResult<CalculationResponse> {
        let outcome = self.run(request);
        match &outcome {
            Ok(response) => info!(
                "integral of {:?} on [{:?}, {:?}] = {}",
                request.function.as_deref().unwrap_or_default(),
                request.lower.as_deref().unwrap_or_default(),
                request.upper.as_deref().unwrap_or_default(),
                response.result
            ),
            Err(e) => warn!("calculation failed with status {}: {}", e.status_code(), e),
        }
        outcome
    }

    fn run(&self, request: &CalculationRequest) -> CalculationResult<CalculationResponse> {
        let backend = self.backend();
        enter(Stage::ReceiveInput);
        debug!("request: {:?}", request);

        enter(Stage::ValidatePresence);
        let (function, lower, upper) = request.required_fields()?;

        enter(Stage::ParseFunction);
        let f = backend
            .parse(function)
            .map_err(CalculationError::InvalidFunction)?;

        enter(Stage::ResolveBounds);
        let a = Bound::new(backend, lower)?;
        let b = Bound::new(backend, upper)?;

        enter(Stage::ValidateBoundOrder);
        validate_order(&a, &b)?;
        validate_span(&a, &b)?;

        let integration = self.integrate(&f, &a, &b)?;

        enter(Stage::FormatSteps);
        let at_upper = backend.substitute(&integration.antiderivative, &b.expr);
        let at_lower = backend.substitute(&integration.antiderivative, &a.expr);
        let steps = derivation_steps(&DerivationInput {
            function: backend.to_latex(&f),
            lower: backend.to_latex(&a.expr),
            upper: backend.to_latex(&b.expr),
            antiderivative: backend.to_latex(&integration.antiderivative),
            at_upper: backend.to_latex(&at_upper),
            at_lower: backend.to_latex(&at_lower),
            exact: backend.to_latex(&integration.exact),
            approx: integration.value,
        });

        enter(Stage::SampleCurve);
        let (x, y) = sample_curve(backend, &f, a.value, b.value)?;

        enter(Stage::SampleArea);
        let (x_area, y_area) = sample_area(backend, &f, a.value, b.value)?;

        enter(Stage::AssembleResponse);
        Ok(CalculationResponse {
            result: format_significant(integration.value, RESULT_DIGITS),
            latex_result: backend.to_latex(&integration.exact),
            steps: steps.to_vec(),
            plot_data: PlotSample { x, y, x_area, y_area },
        })
    }

    /// antiderivative, exact definite integral and its floating value
    pub fn integrate(&self, f: &Expr, lower: &Bound, upper: &Bound) -> CalculationResult<IntegrationResult> {
        let backend = self.backend();
        enter(Stage::ComputeAntiderivative);
        let antiderivative = backend
            .antiderivative(f)
            .map_err(CalculationError::Computation)?;
        debug!("F(x) = {}", antiderivative);

        enter(Stage::ComputeDefiniteIntegral);
        let exact = backend
            .definite_integral(f, &antiderivative, &lower.expr, &upper.expr)
            .map_err(CalculationError::Computation)?;
        let value = backend
            .to_f64(&exact)
            .map_err(CalculationError::Computation)?;
        debug!("definite integral = {} ~ {}", exact, value);
        Ok(IntegrationResult {
            antiderivative,
            exact,
            value,
        })
    }
}

fn enter(stage: Stage) {
    debug!("stage: {}", stage);
}

//___________________________________TESTS____________________________________

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integral::sampler::{AREA_POINTS, CURVE_POINTS};
    use approx::assert_relative_eq;
    use strum::IntoEnumIterator;

    fn calculate(function: &str, lower: &str, upper: &str) -> CalculationResult<CalculationResponse> {
        IntegralPipeline::default().calculate(&CalculationRequest::new(function, lower, upper))
    }

    #[test]
    fn scenario_a_square_on_0_2() {
        let response = calculate("x^2", "0", "2").unwrap();
        assert_eq!(response.result, "2.66666666666667");
        assert_eq!(response.latex_result, "\\frac{8}{3}");
        assert_eq!(
            response.steps[5],
            "6. Final result:<br>$$\\boxed{\\frac{8}{3}} \\approx 2.6667$$"
        );
    }

    #[test]
    fn scenario_b_sine_on_0_pi() {
        let response = calculate("sin(x)", "0", "pi").unwrap();
        assert_eq!(response.result, "2.00000000000000");
        assert_eq!(response.latex_result, "2");
        assert!(response.steps[5].ends_with("\\approx 2.0000$$"));
        assert!(response.steps[1].contains("\\int_{0}^{\\pi}"));
    }

    #[test]
    fn scenario_c_divergent() {
        match calculate("1/x", "-1", "1") {
            Err(CalculationError::Computation(msg)) => assert!(msg.contains("diverges"), "{}", msg),
            other => panic!("expected a computation error, got {:?}", other),
        }
    }

    #[test]
    fn scenario_d_missing_upper() {
        let request = CalculationRequest {
            function: Some("x".to_string()),
            lower: Some("0".to_string()),
            upper: None,
        };
        let err = IntegralPipeline::default().calculate(&request).unwrap_err();
        assert_eq!(err, CalculationError::MissingField("upper".to_string()));
        assert_eq!(err.status_code(), 400);
        let err = calculate("", "0", "1").unwrap_err();
        assert_eq!(err, CalculationError::MissingField("function".to_string()));
    }

    #[test]
    fn scenario_e_reversed_bounds() {
        let err = calculate("x", "3", "1").unwrap_err();
        assert_eq!(err, CalculationError::BoundOrder);
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_equal_bounds_rejected() {
        assert_eq!(calculate("x", "1", "1").unwrap_err(), CalculationError::BoundOrder);
        assert_eq!(calculate("x", "pi", "pi").unwrap_err(), CalculationError::BoundOrder);
    }

    #[test]
    fn test_input_errors() {
        assert!(matches!(
            calculate("x^", "0", "1"),
            Err(CalculationError::InvalidFunction(_))
        ));
        assert!(matches!(
            calculate("y + 1", "0", "1"),
            Err(CalculationError::InvalidFunction(_))
        ));
        assert!(matches!(
            calculate("x", "zero", "1"),
            Err(CalculationError::InvalidBound(_))
        ));
        // the function is checked before the bounds
        assert!(matches!(
            calculate("x^", "zero", "1"),
            Err(CalculationError::InvalidFunction(_))
        ));
    }

    #[test]
    fn test_oversized_functions_are_rejected() {
        let nested = |d: usize| format!("{}x{}", "(".repeat(d), ")".repeat(d));
        assert_eq!(calculate(&nested(10), "0", "1").unwrap().result, "0.500000000000000");
        for function in [nested(200), nested(2000), vec!["x"; 5000].join("+"), vec!["x"; 100].join("+")] {
            let err = calculate(&function, "0", "1").unwrap_err();
            assert!(matches!(err, CalculationError::InvalidFunction(_)), "{:?}", err);
            assert_eq!(err.status_code(), 400);
        }
    }

    #[test]
    fn test_interval_too_wide() {
        match calculate("x^2", "-1e308", "1e308") {
            Err(CalculationError::InvalidBound(msg)) => assert!(msg.contains("too wide"), "{}", msg),
            other => panic!("expected an invalid bound, got {:?}", other),
        }
    }

    #[test]
    fn test_overflowing_value_is_not_divergence() {
        for (f, a, b) in [("exp(x)", "0", "1000"), ("x^2", "-1e200", "1e200")] {
            match calculate(f, a, b) {
                Err(CalculationError::Computation(msg)) => {
                    assert!(msg.contains("outside the floating-point range"), "{}: {}", f, msg);
                    assert!(!msg.contains("diverges"), "{}: {}", f, msg);
                }
                other => panic!("{} on [{}, {}] gave {:?}", f, a, b, other),
            }
        }
    }

    #[test]
    fn test_unsupported_integrand_is_computation_error() {
        let err = calculate("exp(x^2)", "0", "1").unwrap_err();
        assert!(matches!(err, CalculationError::Computation(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_plot_data_shape_and_finiteness() {
        for (f, a, b) in [("x^2", "0", "2"), ("1/sqrt(x)", "0", "1"), ("ln(x)", "0", "1"), ("tan(x)", "0", "1")] {
            let response = calculate(f, a, b).unwrap();
            let plot = &response.plot_data;
            assert_eq!(plot.x.len(), CURVE_POINTS);
            assert_eq!(plot.y.len(), CURVE_POINTS);
            assert_eq!(plot.x_area.len(), AREA_POINTS);
            assert_eq!(plot.y_area.len(), AREA_POINTS);
            assert!(plot.y.iter().all(|v| v.is_finite()), "{}", f);
            assert!(plot.y_area.iter().all(|v| v.is_finite()), "{}", f);
        }
    }

    #[test]
    fn test_padded_window() {
        let response = calculate("x", "pi/2", "pi").unwrap();
        let plot = &response.plot_data;
        let (a, b) = (std::f64::consts::FRAC_PI_2, std::f64::consts::PI);
        let span = b - a;
        assert_relative_eq!(plot.x[0], a - span / 2.0, epsilon = 1e-12);
        assert_relative_eq!(plot.x[CURVE_POINTS - 1], b + span / 2.0, epsilon = 1e-12);
        assert_relative_eq!(plot.x_area[0], a, epsilon = 1e-12);
        assert_relative_eq!(plot.x_area[AREA_POINTS - 1], b, epsilon = 1e-12);
    }

    #[test]
    fn test_step_six_rounds_exact_value() {
        let response = calculate("1/(1+x^2)", "0", "1").unwrap();
        let value: f64 = response.result.parse().unwrap();
        assert_relative_eq!(value, std::f64::consts::FRAC_PI_4, epsilon = 1e-12);
        assert!(response.steps[5].ends_with("\\approx 0.7854$$"), "{}", response.steps[5]);
    }

    #[test]
    fn test_identical_inputs_identical_json() {
        let first = serde_json::to_string(&calculate("x*exp(x)", "-1", "2").unwrap()).unwrap();
        let second = serde_json::to_string(&calculate("x*exp(x)", "-1", "2").unwrap()).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("{\"result\":"));
    }

    #[test]
    fn test_request_accepts_numbers() {
        let request: CalculationRequest =
            serde_json::from_str(r#"{"function": "x", "lower": 0, "upper": 2.5}"#).unwrap();
        assert_eq!(request.lower.as_deref(), Some("0"));
        assert_eq!(request.upper.as_deref(), Some("2.5"));
        let request: CalculationRequest = serde_json::from_str(r#"{"function": "x"}"#).unwrap();
        assert_eq!(request.upper, None);
        assert!(serde_json::from_str::<CalculationRequest>(r#"{"function": [1]}"#).is_err());
        let response = IntegralPipeline::default()
            .calculate(&CalculationRequest::new("x", "0", "2.5"))
            .unwrap();
        assert_eq!(response.latex_result, "\\frac{25}{8}");
    }

    #[test]
    fn test_required_fields_borrow_the_request() {
        let request = CalculationRequest::new("x^2", "0", "1");
        assert_eq!(request.required_fields().unwrap(), ("x^2", "0", "1"));
        let request = CalculationRequest {
            function: Some("x".to_string()),
            lower: Some(String::new()),
            upper: Some("1".to_string()),
        };
        assert_eq!(
            request.required_fields().unwrap_err(),
            CalculationError::MissingField("lower".to_string())
        );
    }

    #[test]
    fn test_integrate_result() {
        let pipeline = IntegralPipeline::default();
        let backend = pipeline.backend();
        let f = backend.parse("cos(x)").unwrap();
        let a = Bound::new(backend, "0").unwrap();
        let b = Bound::new(backend, "pi/2").unwrap();
        let result = pipeline.integrate(&f, &a, &b).unwrap();
        assert_eq!(result.exact, Expr::one());
        assert_relative_eq!(result.value, 1.0);
        assert!(result.antiderivative.check_antiderivative(&f, "x"));
    }

    #[test]
    fn test_stage_names() {
        let names: Vec<String> = Stage::iter().map(|s| s.to_string()).collect();
        assert_eq!(names.len(), 11);
        assert_eq!(names[0], "receive_input");
        assert_eq!(names[10], "assemble_response");
    }
}
