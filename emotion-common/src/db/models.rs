//! Database models

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Maximum stored username length (characters)
pub const MAX_USERNAME_CHARS: usize = 100;
/// Maximum stored text length (characters)
pub const MAX_TEXT_CHARS: usize = 5000;

/// Persisted analysis outcome
///
/// Created once per successful analysis; never updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionRecord {
    /// Assigned by SQLite on insert
    pub id: i64,
    pub username: String,
    pub text: String,
    pub label: String,
    /// Classifier confidence in [0.0, 1.0]
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

/// Record fields prior to insertion (no id yet)
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmotionRecord {
    pub username: String,
    pub text: String,
    pub label: String,
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

impl NewEmotionRecord {
    /// Attach the storage-assigned id
    pub fn with_id(self, id: i64) -> EmotionRecord {
        EmotionRecord {
            id,
            username: self.username,
            text: self.text,
            label: self.label,
            score: self.score,
            created_at: self.created_at,
        }
    }
}

/// Storage encoding for `created_at`
///
/// Fixed-width RFC 3339 with a `Z` suffix so string comparison in SQL
/// orders chronologically.
pub fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Inverse of [`encode_timestamp`]
pub fn decode_timestamp(raw: &str) -> crate::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| crate::Error::Internal(format!("Failed to parse timestamp '{}': {}", raw, e)))
}
