//! Database initialization
//!
//! Opens (or creates) the SQLite file and applies the idempotent schema.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open the database, creating file, parent directory and tables as needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets history reads proceed while an analysis result is written
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_emotion_records_table(&pool).await?;

    Ok(pool)
}

/// Create the emotion_records table and its lookup indexes
pub async fn create_emotion_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS emotion_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL CHECK (length(username) BETWEEN 1 AND 100),
            text TEXT NOT NULL CHECK (length(text) BETWEEN 1 AND 5000),
            label TEXT NOT NULL,
            score REAL NOT NULL CHECK (score >= 0.0 AND score <= 1.0),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_emotion_records_username ON emotion_records(username)",
        "CREATE INDEX IF NOT EXISTS idx_emotion_records_label ON emotion_records(label)",
        "CREATE INDEX IF NOT EXISTS idx_emotion_records_created_at ON emotion_records(created_at)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
