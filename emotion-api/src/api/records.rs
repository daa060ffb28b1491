//! Emotion record history endpoints

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use emotion_common::EmotionRecord;
use serde::{Deserialize, Serialize};

use crate::db::records::{self, RecordFilter};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{PageRequest, DEFAULT_PAGE_SIZE};
use crate::AppState;

/// Query parameters for record listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordQuery {
    pub username: Option<String>,
    pub label: Option<String>,
    pub from_utc: Option<DateTime<Utc>>,
    pub to_utc: Option<DateTime<Utc>>,
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// One page of records
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordListResponse {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub items: Vec<EmotionRecord>,
}

/// GET /api/emotionrecords
pub async fn list_records(
    State(state): State<AppState>,
    query: Result<Query<RecordQuery>, QueryRejection>,
) -> ApiResult<Json<RecordListResponse>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let page = PageRequest::sanitize(query.page, query.page_size);
    let filter = RecordFilter {
        username: query.username,
        label: query.label,
        from: query.from_utc,
        to: query.to_utc,
    };

    let result = records::list_records(&state.db, &filter, page).await?;

    Ok(Json(RecordListResponse {
        page: page.page,
        page_size: page.page_size,
        total: result.total,
        items: result.items,
    }))
}

/// GET /api/emotionrecords/:id
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<EmotionRecord>> {
    records::get_record(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("emotion record {}", id)))
}

/// DELETE /api/emotionrecords/:id
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if records::delete_record(&state.db, id).await? {
        tracing::info!(id, "Emotion record deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("emotion record {}", id)))
    }
}

/// Build record routes
pub fn record_routes() -> Router<AppState> {
    Router::new()
        .route("/api/emotionrecords", get(list_records))
        .route(
            "/api/emotionrecords/:id",
            get(get_record).delete(delete_record),
        )
}
