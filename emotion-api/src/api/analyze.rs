//! Analysis endpoints
//!
//! `POST /api/syncanalyze` runs the full pipeline and stores the result.
//! `POST /api/emotion/analyze` only relays the upstream result body.
//!
//! Each request runs under a child of the service shutdown token. The drop
//! guard cancels it when the handler future is dropped, so a disconnected
//! caller stops the poll loop.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, ApiResult};
use crate::models::AnalysisRequest;
use crate::AppState;

/// Confirmation message returned with a stored analysis
pub const SAVED_MESSAGE: &str = "Synchronous analysis saved.";

/// Stored analysis as returned to the caller
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAnalyzeResponse {
    pub message: String,
    pub username: String,
    pub text: String,
    pub label: String,
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

/// Body of the relay endpoint
#[derive(Debug, Deserialize)]
pub struct RawAnalyzeRequest {
    pub text: String,
}

/// POST /api/syncanalyze
pub async fn sync_analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> ApiResult<Json<SyncAnalyzeResponse>> {
    let Json(request) = payload.map_err(|e| AnalysisError::Validation(e.body_text()))?;

    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    match state.analyzer.analyze_and_persist(request, &cancel).await {
        Ok(record) => Ok(Json(SyncAnalyzeResponse {
            message: SAVED_MESSAGE.to_string(),
            username: record.username,
            text: record.text,
            label: record.label,
            score: record.score,
            created_at: record.created_at,
        })),
        Err(e) => {
            state.record_error(&e).await;
            Err(e.into())
        }
    }
}

/// POST /api/emotion/analyze
///
/// Returns the upstream result body unchanged; nothing is parsed or stored.
pub async fn analyze_raw(
    State(state): State<AppState>,
    payload: Result<Json<RawAnalyzeRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload.map_err(|e| AnalysisError::Validation(e.body_text()))?;

    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    match state
        .analyzer
        .client()
        .analyze_raw(&request.text, &cancel)
        .await
    {
        Ok(body) => Ok(([(header::CONTENT_TYPE, "application/json")], body)),
        Err(e) => {
            state.record_error(&e).await;
            Err(e.into())
        }
    }
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new()
        .route("/api/syncanalyze", post(sync_analyze))
        .route("/api/emotion/analyze", post(analyze_raw))
}
