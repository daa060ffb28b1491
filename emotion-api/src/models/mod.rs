//! Domain types for emotion-api

pub mod analysis;

pub use analysis::{AnalysisRequest, AnalysisResult, CorrelationToken};
