//! # Emotion Common Library
//!
//! Shared code for the emotion analysis service:
//! - Error and result types
//! - Service configuration (TOML + environment resolution)
//! - SQLite schema initialization and the persisted record model

pub mod config;
pub mod db;
pub mod error;

pub use config::ServiceConfig;
pub use db::models::EmotionRecord;
pub use error::{Error, Result};
