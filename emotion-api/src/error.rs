//! Error types for emotion-api
//!
//! [`AnalysisError`] is the closed set of pipeline failures; [`ApiError`]
//! wraps it (and the storage/common errors) for HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Characters of an offending payload kept in error previews
pub const PREVIEW_CHARS: usize = 200;

/// Analysis pipeline failure, one variant per stage outcome
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Caller input rejected before any upstream call
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Upstream unreachable or refused the submission
    #[error("Upstream unavailable: {message}")]
    Connectivity {
        /// HTTP status when the upstream answered at all
        status: Option<u16>,
        message: String,
    },

    /// Upstream accepted the submission but returned no usable token
    #[error("Submission failed: {0}")]
    Submission(String),

    /// Poll attempts exhausted without a successful response
    #[error("Could not retrieve analysis result for token {token} after {attempts} attempts")]
    Timeout { token: String, attempts: u32 },

    /// Result payload could not be interpreted
    #[error("Could not interpret analysis result: {message}")]
    Parse {
        message: String,
        /// Leading characters of the raw payload
        preview: Option<String>,
    },

    /// Storage write failed after a successful analysis
    #[error("Failed to persist analysis result: {0}")]
    Persistence(String),

    /// Caller went away or the service is shutting down
    #[error("Analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Parse failure carrying a bounded preview of `raw`
    pub fn parse(message: impl Into<String>, raw: &str) -> Self {
        AnalysisError::Parse {
            message: message.into(),
            preview: Some(preview(raw)),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::Validation(_) => "VALIDATION_ERROR",
            AnalysisError::Connectivity { .. } => "UPSTREAM_UNAVAILABLE",
            AnalysisError::Submission(_) => "SUBMISSION_FAILED",
            AnalysisError::Timeout { .. } => "ANALYSIS_TIMEOUT",
            AnalysisError::Parse { .. } => "PARSE_ERROR",
            AnalysisError::Persistence(_) => "PERSISTENCE_ERROR",
            AnalysisError::Cancelled => "CANCELLED",
        }
    }

    /// HTTP status class the failure is surfaced as
    pub fn status_code(&self) -> StatusCode {
        match self {
            AnalysisError::Validation(_) => StatusCode::BAD_REQUEST,
            AnalysisError::Connectivity { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AnalysisError::Submission(_) => StatusCode::BAD_GATEWAY,
            AnalysisError::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AnalysisError::Parse { .. } => StatusCode::BAD_REQUEST,
            AnalysisError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AnalysisError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Variant-specific fields added to the error body
    fn details(&self) -> Map<String, Value> {
        let mut details = Map::new();
        match self {
            AnalysisError::Connectivity {
                status: Some(status),
                ..
            } => {
                details.insert("upstreamStatus".to_string(), json!(status));
            }
            AnalysisError::Timeout { token, attempts } => {
                details.insert("token".to_string(), json!(token));
                details.insert("attempts".to_string(), json!(attempts));
            }
            AnalysisError::Parse {
                preview: Some(preview),
                ..
            } => {
                details.insert("preview".to_string(), json!(preview));
            }
            _ => {}
        }
        details
    }
}

/// First [`PREVIEW_CHARS`] characters of `raw` (char-boundary safe)
pub fn preview(raw: &str) -> String {
    raw.chars().take(PREVIEW_CHARS).collect()
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Analysis pipeline failure (status depends on stage)
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// emotion-common error
    #[error("Common error: {0}")]
    Common(#[from] emotion_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, Map::new()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, Map::new()),
            ApiError::Analysis(ref err) => {
                (err.status_code(), err.code(), err.to_string(), err.details())
            }
            ApiError::Common(ref err) => {
                tracing::error!(error = %err, "Request failed with storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMMON_ERROR",
                    "internal storage error".to_string(),
                    Map::new(),
                )
            }
        };

        let mut error = Map::new();
        error.insert("code".to_string(), json!(error_code));
        error.insert("message".to_string(), json!(message));
        error.extend(details);

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
