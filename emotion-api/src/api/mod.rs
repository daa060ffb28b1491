//! HTTP API handlers for emotion-api

pub mod analyze;
pub mod health;
pub mod records;

pub use analyze::analyze_routes;
pub use health::health_routes;
pub use records::record_routes;
