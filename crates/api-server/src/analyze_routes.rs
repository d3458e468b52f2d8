use analysis_core::AnalysisBatch;
use analysis_orchestrator::MAX_SYMBOLS;
use axum::{
    body::Bytes,
    extract::{Extension, State},
    routing::post,
    Json, Router,
};
use chrono::NaiveDate;
use serde_json::Value;

use crate::{AppError, AppState, RequestId};

/// Validated body of `POST /analyze`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeRequest {
    pub symbols: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl AnalyzeRequest {
    /// Checks run in a fixed order: symbols first, then presence of both
    /// dates, then date syntax.
    pub fn from_json(body: &Value) -> Result<Self, AppError> {
        let symbols = match body.get("symbols").and_then(Value::as_array) {
            Some(list) if !list.is_empty() && list.len() <= MAX_SYMBOLS => list,
            _ => {
                return Err(AppError::bad_request(format!(
                    "Provide between 1–{} symbols",
                    MAX_SYMBOLS
                )))
            }
        };
        let symbols = symbols
            .iter()
            .map(|s| {
                s.as_str()
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| AppError::bad_request("Symbols must be non-empty strings"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let start = date_field(body, "start");
        let end = date_field(body, "end");
        let (start, end) = match (start, end) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(AppError::bad_request("start and end required")),
        };

        Ok(Self {
            symbols,
            start: parse_date(start)?,
            end: parse_date(end)?,
        })
    }
}

fn date_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::bad_request(format!("Invalid date: {}", raw)))
}

pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze))
}

async fn analyze(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> Result<Json<AnalysisBatch>, AppError> {
    // A missing or unreadable body is treated like an empty object.
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let request = AnalyzeRequest::from_json(&body)?;

    tracing::info!(
        request_id = %request_id.0,
        "Analyze {:?} from {} to {}",
        request.symbols,
        request.start,
        request.end
    );

    let batch = state
        .orchestrator
        .run_analysis(&request.symbols, request.start, request.end)
        .await?;

    Ok(Json(batch))
}
