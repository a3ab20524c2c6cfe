use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::query::QueryError;
use crate::types::AppState;

/// Query params for range-scoped endpoints. Missing bounds default to the
/// dataset's first/last date.
#[derive(Debug, Default, Deserialize)]
pub struct RangeParams {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Body for the text-query endpoint
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub question: String,
    pub answer: String,
}

fn no_data() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": "No bars loaded"})),
    )
}

/// GET /api/range - Default date selector bounds
pub async fn get_range(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let Some(range) = state.chart.default_range() else {
        return no_data();
    };

    (
        StatusCode::OK,
        Json(json!({
            "start": range.start,
            "end": range.end,
            "bars": state.chart.bars().len(),
        })),
    )
}

/// GET /api/overlays - Ordered layer list for a date range
pub async fn get_overlays(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> impl IntoResponse {
    let Some(range) = state.chart.resolve_range(params.start, params.end) else {
        return no_data();
    };

    let overlays = state.chart.overlays(&range);
    (StatusCode::OK, Json(json!(overlays)))
}

/// GET /api/summary - Marker and band counts for a date range
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> impl IntoResponse {
    let Some(range) = state.chart.resolve_range(params.start, params.end) else {
        return no_data();
    };

    let summary = state.chart.summary(&range);
    (
        StatusCode::OK,
        Json(json!({
            "start": range.start,
            "end": range.end,
            "summary": summary,
        })),
    )
}

/// POST /api/query - Forward a free-form question to the query backend
pub async fn post_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> impl IntoResponse {
    let question = request.question.trim();
    if question.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Question must not be empty"})),
        );
    }

    info!("Text query via {} backend", state.query.name());

    match state.query.ask(question).await {
        Ok(answer) => (
            StatusCode::OK,
            Json(json!(QueryResponse {
                question: question.to_string(),
                answer,
            })),
        ),
        Err(e @ QueryError::Disabled) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"warning": e.to_string()})),
        ),
        Err(e @ QueryError::Failed(_)) => {
            warn!("Text query failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": e.to_string()})),
            )
        }
    }
}

/// API routes
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/range", get(get_range))
        .route("/api/overlays", get(get_overlays))
        .route("/api/summary", get(get_summary))
        .route("/api/query", post(post_query))
        .with_state(state)
}
