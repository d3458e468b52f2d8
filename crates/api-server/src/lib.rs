use analysis_core::AnalysisError;
use analysis_orchestrator::AnalysisOrchestrator;
use axum::{
    http::{HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use yahoo_client::YahooFinanceClient;

mod analyze_routes;
pub mod config;
mod request_id;


pub use analyze_routes::{analyze_routes, AnalyzeRequest};
pub use config::ServerConfig;
pub use request_id::RequestId;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AnalysisOrchestrator>,
}

/// Error returned from handlers. Client errors echo their message, server
/// errors are logged and reported generically.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.error);
            "Internal server error".to_string()
        } else {
            self.error.to_string()
        };

        (self.status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<AnalysisError> for AppError {
    fn from(e: AnalysisError) -> Self {
        let status = match &e {
            AnalysisError::Validation(_) => StatusCode::BAD_REQUEST,
            AnalysisError::NoBaselineData(_) | AnalysisError::DataUnavailable(_) => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::with_status(status, e.into())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

async fn ping() -> &'static str {
    "pong"
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", o);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ping", get(ping))
        .merge(analyze_routes())
        .with_state(state)
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
}

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        "Pipeline: baseline {}, ARIMA{}, max history {:?}, fit timeout {:?}, policy {:?}",
        config.pipeline.baseline_symbol,
        config.pipeline.order,
        config.pipeline.max_history,
        config.pipeline.fit_timeout,
        config.pipeline.batch_policy
    );

    let source = Arc::new(YahooFinanceClient::with_chart_url(
        config.yahoo_base_url.clone(),
        config.yahoo_timeout,
    ));
    let state = AppState {
        orchestrator: Arc::new(AnalysisOrchestrator::new(source, config.pipeline.clone())),
    };
    let app = build_router(state, &config.allowed_origins);

    let addr = format!("{}:{}", config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);
    tracing::info!("  POST /analyze");
    tracing::info!("  GET  /health");
    tracing::info!("  GET  /ping");

    axum::serve(listener, app).await?;
    Ok(())
}
