//! Analysis request/result types

use emotion_common::db::{MAX_TEXT_CHARS, MAX_USERNAME_CHARS};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AnalysisError;

/// Caller input to the analysis pipeline
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisRequest {
    pub username: String,
    pub text: String,
}

impl AnalysisRequest {
    pub fn new(username: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            text: text.into(),
        }
    }

    /// Both fields non-blank and within length bounds (characters)
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.username.trim().is_empty() {
            return Err(AnalysisError::Validation("username is required".to_string()));
        }
        if self.text.trim().is_empty() {
            return Err(AnalysisError::Validation("text is required".to_string()));
        }
        if self.username.chars().count() > MAX_USERNAME_CHARS {
            return Err(AnalysisError::Validation(format!(
                "username cannot exceed {} characters",
                MAX_USERNAME_CHARS
            )));
        }
        if self.text.chars().count() > MAX_TEXT_CHARS {
            return Err(AnalysisError::Validation(format!(
                "text cannot exceed {} characters",
                MAX_TEXT_CHARS
            )));
        }
        Ok(())
    }
}

/// Canonical classifier output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub label: String,
    /// Confidence in [0.0, 1.0]
    pub score: f64,
}

/// Opaque upstream handle linking a submission to its result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    /// Returns None for blank tokens
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
