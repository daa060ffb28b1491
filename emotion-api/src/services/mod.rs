//! Services for emotion-api

pub mod analysis_orchestrator;
pub mod correlation_cache;
pub mod inference_client;
pub mod response_parser;

pub use analysis_orchestrator::AnalysisOrchestrator;
pub use correlation_cache::{spawn_sweeper, CachedCorrelation, CorrelationCache};
pub use inference_client::{InferenceClient, RetryPolicy};
pub use response_parser::parse_label_score;
