//! HTTP front end: the calculator page and its JSON endpoint.
//!
//! - `GET /` - page shell
//! - `GET /static/{*path}` - script and stylesheet, embedded into the binary
//! - `POST /calculate` - `{function, lower, upper}` -> result, steps and plot data,
//!   or `{error}` with status 400 (bad input) / 500 (computation failure)
use crate::Utils::config::AppConfig;
use crate::integral::error::CalculationError;
use crate::integral::pipeline::{CalculationRequest, CalculationResponse, IntegralPipeline};
use crate::symbolic::symbolic_traits::symbolic_backend_from_string;
use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{info, warn};
use rust_embed::RustEmbed;
use serde_json::json;
use std::time::Duration;
use tower_http::cors::CorsLayer;

/// stack of every runtime thread, the blocking pool that runs calculations included
pub const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

#[derive(RustEmbed)]
#[folder = "static/"]
struct Assets;

#[derive(Clone)]
pub struct AppState {
    pipeline: IntegralPipeline,
    timeout: Duration,
}

impl AppState {
    pub fn new(pipeline: IntegralPipeline, timeout: Duration) -> Self {
        AppState { pipeline, timeout }
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let backend = symbolic_backend_from_string(&config.compute.engine).map_err(anyhow::Error::msg)?;
        Ok(AppState::new(
            IntegralPipeline::new(backend),
            Duration::from_secs(config.compute.timeout_secs),
        ))
    }
}

pub fn router(state: AppState, cors: bool) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route("/static/{*path}", get(static_asset))
        .route("/calculate", post(calculate))
        .with_state(state);
    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Multi-threaded runtime whose threads get `WORKER_STACK_SIZE`.
pub fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_stack_size(WORKER_STACK_SIZE)
        .build()
}

/// Binds the configured address and serves until the process is stopped.
pub async fn serve(config: &AppConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let app = router(state, config.server.cors);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("integral calculator listening on http://{}", addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

pub async fn index() -> Response {
    asset_response("index.html")
}

pub async fn static_asset(Path(path): Path<String>) -> Response {
    asset_response(&path)
}

fn asset_response(path: &str) -> Response {
    match Assets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

pub async fn calculate(
    State(state): State<AppState>,
    payload: Result<Json<CalculationRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("rejected request body: {}", rejection.body_text());
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };
    match compute(&state, request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            let status =
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            error_response(status, e.to_string())
        }
    }
}

/// Runs the pipeline on the blocking pool under the configured time limit. On timeout
/// the worker keeps running in the background, its result is dropped.
async fn compute(
    state: &AppState,
    request: CalculationRequest,
) -> Result<CalculationResponse, CalculationError> {
    let pipeline = state.pipeline.clone();
    let task = tokio::task::spawn_blocking(move || pipeline.calculate(&request));
    match tokio::time::timeout(state.timeout, task).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_error)) => Err(CalculationError::Computation(format!(
            "calculation task failed: {}",
            join_error
        ))),
        Err(_) => {
            warn!("calculation timed out after {:?}", state.timeout);
            Err(CalculationError::Computation(format!(
                "computation timed out after {} s",
                state.timeout.as_secs_f64()
            )))
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::symbolic_engine::Expr;
    use crate::symbolic::symbolic_lambdify::BatchEvaluator;
    use crate::symbolic::symbolic_traits::{NativeBackend, SymbolicBackend};
    use serde_json::Value;
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(IntegralPipeline::default(), Duration::from_secs(30))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn post(state: AppState, body: Value) -> (StatusCode, Value) {
        let request: CalculationRequest = serde_json::from_value(body).unwrap();
        let response = calculate(State(state), Ok(Json(request))).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    #[tokio::test]
    async fn test_calculate_ok() {
        let (status, body) = post(
            state(),
            json!({"function": "x^2", "lower": "0", "upper": "2"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "2.66666666666667");
        assert_eq!(body["latex_result"], "\\frac{8}{3}");
        assert_eq!(body["steps"].as_array().unwrap().len(), 6);
        assert_eq!(body["plot_data"]["x"].as_array().unwrap().len(), 200);
        assert_eq!(body["plot_data"]["y_area"].as_array().unwrap().len(), 100);
    }

    #[tokio::test]
    async fn test_client_errors() {
        let (status, body) = post(state(), json!({"function": "x", "lower": "0"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Required data is incomplete");

        let (status, body) = post(state(), json!({"function": "x", "lower": "3", "upper": "1"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Lower bound must be smaller than upper bound");

        let (status, body) = post(state(), json!({"function": "x^^2", "lower": "0", "upper": "1"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid function: "));

        let (status, body) = post(state(), json!({"function": "x", "lower": "0", "upper": "oops"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid bound: "));
    }

    #[tokio::test]
    async fn test_divergent_integral_is_server_error() {
        let (status, body) = post(state(), json!({"function": "1/x", "lower": "-1", "upper": "1"})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("diverges"));
    }

    /// native engine that takes its time over every antiderivative
    struct SlowBackend(Duration);

    impl SymbolicBackend for SlowBackend {
        fn name(&self) -> &'static str {
            "slow"
        }
        fn parse(&self, input: &str) -> Result<Expr, String> {
            NativeBackend.parse(input)
        }
        fn parse_bound(&self, input: &str) -> Result<Expr, String> {
            NativeBackend.parse_bound(input)
        }
        fn antiderivative(&self, f: &Expr) -> Result<Expr, String> {
            std::thread::sleep(self.0);
            NativeBackend.antiderivative(f)
        }
        fn definite_integral(
            &self,
            f: &Expr,
            antiderivative: &Expr,
            lower: &Expr,
            upper: &Expr,
        ) -> Result<Expr, String> {
            NativeBackend.definite_integral(f, antiderivative, lower, upper)
        }
        fn substitute(&self, f: &Expr, value: &Expr) -> Expr {
            NativeBackend.substitute(f, value)
        }
        fn to_latex(&self, e: &Expr) -> String {
            NativeBackend.to_latex(e)
        }
        fn to_f64(&self, e: &Expr) -> Result<f64, String> {
            NativeBackend.to_f64(e)
        }
        fn eval_point(&self, f: &Expr, x: f64) -> Result<f64, String> {
            NativeBackend.eval_point(f, x)
        }
        fn batch_evaluator(&self, f: &Expr) -> Result<BatchEvaluator, String> {
            NativeBackend.batch_evaluator(f)
        }
    }

    fn slow_state(delay: Duration, timeout: Duration) -> AppState {
        AppState::new(IntegralPipeline::new(Arc::new(SlowBackend(delay))), timeout)
    }

    #[tokio::test]
    async fn test_timeout() {
        let state = slow_state(Duration::from_millis(500), Duration::from_millis(20));
        let (status, body) = post(state, json!({"function": "x", "lower": "0", "upper": "1"})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("timed out"), "{}", body);
    }

    #[tokio::test]
    async fn test_slow_calculation_within_limit() {
        let state = slow_state(Duration::from_millis(20), Duration::from_secs(30));
        let (status, body) = post(state, json!({"function": "x", "lower": "0", "upper": "1"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "0.500000000000000");
    }

    #[test]
    fn test_runtime_builds() {
        let runtime = runtime().unwrap();
        let value = runtime.block_on(async { tokio::task::spawn_blocking(|| 2 + 2).await.unwrap() });
        assert_eq!(value, 4);
    }

    #[tokio::test]
    async fn test_assets() {
        let response = index().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
        let response = static_asset(Path("script.js".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = static_asset(Path("missing.css".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_state_from_config() {
        let mut config = AppConfig::default();
        assert!(AppState::from_config(&config).is_ok());
        config.compute.engine = "maxima".to_string();
        assert!(AppState::from_config(&config).is_err());
    }
}
