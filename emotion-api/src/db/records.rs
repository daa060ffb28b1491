//! Emotion record database operations
//!
//! Single-row inserts from the analysis pipeline plus the history query
//! surface (filtered listing, lookup and delete by id).

use chrono::{DateTime, SubsecRound, Utc};
use emotion_common::db::{decode_timestamp, encode_timestamp, NewEmotionRecord};
use emotion_common::{EmotionRecord, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::pagination::PageRequest;

/// Optional listing filters (all conjunctive)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    /// Exact username match
    pub username: Option<String>,
    /// Exact label match
    pub label: Option<String>,
    /// Inclusive lower bound on created_at
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on created_at
    pub to: Option<DateTime<Utc>>,
}

/// One page of records plus the unpaged match count
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPage {
    pub total: i64,
    pub items: Vec<EmotionRecord>,
}

/// Insert a record and return it with its assigned id
///
/// `created_at` is truncated to the stored (microsecond) precision so the
/// returned record matches later reads.
pub async fn insert_record(pool: &SqlitePool, record: NewEmotionRecord) -> Result<EmotionRecord> {
    let record = NewEmotionRecord {
        created_at: record.created_at.trunc_subsecs(6),
        ..record
    };

    let result = sqlx::query(
        r#"
        INSERT INTO emotion_records (username, text, label, score, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.username)
    .bind(&record.text)
    .bind(&record.label)
    .bind(record.score)
    .bind(encode_timestamp(&record.created_at))
    .execute(pool)
    .await?;

    Ok(record.with_id(result.last_insert_rowid()))
}

/// Filtered listing, newest first
pub async fn list_records(
    pool: &SqlitePool,
    filter: &RecordFilter,
    page: PageRequest,
) -> Result<RecordPage> {
    let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM emotion_records");
    push_filters(&mut count_query, filter);
    let total: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

    let mut list_query = QueryBuilder::<Sqlite>::new(
        "SELECT id, username, text, label, score, created_at FROM emotion_records",
    );
    push_filters(&mut list_query, filter);
    list_query
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(page.page_size)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows = list_query.build().fetch_all(pool).await?;
    let items = rows
        .iter()
        .map(record_from_row)
        .collect::<Result<Vec<_>>>()?;

    Ok(RecordPage { total, items })
}

/// Load a record by id
pub async fn get_record(pool: &SqlitePool, id: i64) -> Result<Option<EmotionRecord>> {
    let row = sqlx::query(
        "SELECT id, username, text, label, score, created_at FROM emotion_records WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Delete a record by id; false when no such record exists
pub async fn delete_record(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM emotion_records WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &RecordFilter) {
    let mut conditions = 0;

    if let Some(username) = non_blank(&filter.username) {
        push_condition(builder, &mut conditions);
        builder.push("username = ").push_bind(username.to_string());
    }
    if let Some(label) = non_blank(&filter.label) {
        push_condition(builder, &mut conditions);
        builder.push("label = ").push_bind(label.to_string());
    }
    if let Some(from) = &filter.from {
        push_condition(builder, &mut conditions);
        builder.push("created_at >= ").push_bind(encode_timestamp(from));
    }
    if let Some(to) = &filter.to {
        push_condition(builder, &mut conditions);
        builder.push("created_at <= ").push_bind(encode_timestamp(to));
    }
}

fn push_condition(builder: &mut QueryBuilder<'_, Sqlite>, conditions: &mut usize) {
    builder.push(if *conditions == 0 { " WHERE " } else { " AND " });
    *conditions += 1;
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn record_from_row(row: &SqliteRow) -> Result<EmotionRecord> {
    let created_at: String = row.try_get("created_at")?;

    Ok(EmotionRecord {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        text: row.try_get("text")?,
        label: row.try_get("label")?,
        score: row.try_get("score")?,
        created_at: decode_timestamp(&created_at)?,
    })
}
