//! Database access for emotion-api

pub mod records;

use emotion_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open the records database, creating file and schema if missing
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::debug!("Connecting to database: {}", db_path.display());
    emotion_common::db::init_database(db_path).await
}
