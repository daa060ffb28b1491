//! Analysis orchestrator
//!
//! Sequences validation → submission → polling → normalization →
//! persistence for one request. Stage failures are returned as-is; only the
//! poll loop retries.

use chrono::Utc;
use emotion_common::db::NewEmotionRecord;
use emotion_common::EmotionRecord;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::AnalysisError;
use crate::models::AnalysisRequest;
use crate::services::inference_client::InferenceClient;
use crate::services::response_parser::parse_label_score;

/// Runs the analysis pipeline and records its outcome
pub struct AnalysisOrchestrator {
    client: Arc<InferenceClient>,
    db: SqlitePool,
}

impl AnalysisOrchestrator {
    pub fn new(client: Arc<InferenceClient>, db: SqlitePool) -> Self {
        Self { client, db }
    }

    pub fn client(&self) -> &InferenceClient {
        &self.client
    }

    /// Analyze `request.text` and persist the normalized result
    ///
    /// The returned record is always durably stored; a storage failure
    /// discards the computed result.
    pub async fn analyze_and_persist(
        &self,
        request: AnalysisRequest,
        cancel: &CancellationToken,
    ) -> Result<EmotionRecord, AnalysisError> {
        request.validate()?;

        let token = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AnalysisError::Cancelled),
            token = self.client.submit(&request.text) => token?,
        };

        let raw = self.client.poll(&token, cancel).await?;

        let result = parse_label_score(&raw).map_err(|e| {
            tracing::error!(
                token = %token,
                username = %request.username,
                error = %e,
                "Failed to parse analysis result"
            );
            e
        })?;

        let new_record = NewEmotionRecord {
            username: request.username,
            text: request.text,
            label: result.label,
            score: result.score,
            created_at: Utc::now(),
        };

        let record = crate::db::records::insert_record(&self.db, new_record)
            .await
            .map_err(|e| {
                tracing::error!(token = %token, error = %e, "Failed to persist analysis result");
                AnalysisError::Persistence("analysis result could not be stored".to_string())
            })?;

        tracing::info!(
            id = record.id,
            username = %record.username,
            label = %record.label,
            score = record.score,
            "Synchronous analysis saved"
        );

        Ok(record)
    }
}
