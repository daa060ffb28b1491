//! Response normalizer
//!
//! Turns an upstream result body into a canonical [`AnalysisResult`].
//! Recognized encodings:
//! - JSON array: `[{"label": ..., "score": ...}, ...]`
//! - JSON object: `{"label": ..., "score": ...}`
//! - Batch wrapper: `{"data": [[{"label": ..., "score": ...}]]}`
//! - Event stream: `event: complete` / `data: <one of the above>`
//!
//! Items missing `label` fall back to `label_raw`, then `"unknown"`; items
//! missing `score` get `0.0`. Scores must be finite and within [0, 1].

use serde_json::{Map, Value};

use crate::error::AnalysisError;
use crate::models::AnalysisResult;

/// Label used when an item carries neither `label` nor `label_raw`
pub const UNKNOWN_LABEL: &str = "unknown";

const COMPLETE_EVENT: &str = "event: complete";
const DATA_PREFIX: &str = "data:";

/// Parse a raw upstream body into (label, score)
pub fn parse_label_score(raw: &str) -> Result<AnalysisResult, AnalysisError> {
    if raw.trim().is_empty() {
        return Err(AnalysisError::parse("empty response", raw));
    }

    let trimmed = raw.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return parse_json_payload(trimmed, raw);
    }

    let data = extract_event_data(raw)
        .ok_or_else(|| AnalysisError::parse("no data line in event stream", raw))?;
    parse_json_payload(data, raw)
}

/// Payload of the `data:` line belonging to the completion event, or of the
/// first `data:` line when no completion event carries one
fn extract_event_data(raw: &str) -> Option<&str> {
    let lines: Vec<&str> = raw.lines().map(str::trim).collect();

    let after_complete = lines
        .iter()
        .position(|line| line.eq_ignore_ascii_case(COMPLETE_EVENT))
        .and_then(|idx| lines[idx + 1..].iter().find(|line| is_data_line(line)));

    let line = after_complete.or_else(|| lines.iter().find(|line| is_data_line(line)))?;
    Some(line[DATA_PREFIX.len()..].trim())
}

fn is_data_line(line: &str) -> bool {
    line.get(..DATA_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(DATA_PREFIX))
}

fn parse_json_payload(json: &str, raw: &str) -> Result<AnalysisResult, AnalysisError> {
    if json.is_empty() {
        return Err(AnalysisError::parse("empty data payload", raw));
    }

    let value: Value = serde_json::from_str(json)
        .map_err(|e| AnalysisError::parse(format!("malformed JSON: {}", e), raw))?;

    match &value {
        Value::Array(items) if !items.is_empty() => extract_item(&items[0], raw),
        Value::Object(map) if map.contains_key("label") && map.contains_key("score") => {
            let label = map.get("label").and_then(label_text);
            let score = map.get("score").unwrap_or(&Value::Null);
            build_result(label, score_value(score, raw)?, raw)
        }
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(outer)) => match outer.first() {
                Some(Value::Array(inner)) if !inner.is_empty() => extract_item(&inner[0], raw),
                _ => Err(unexpected_shape(raw)),
            },
            _ => Err(unexpected_shape(raw)),
        },
        _ => Err(unexpected_shape(raw)),
    }
}

/// Lenient item extraction shared by the array and batch-wrapper shapes
fn extract_item(item: &Value, raw: &str) -> Result<AnalysisResult, AnalysisError> {
    let Value::Object(fields) = item else {
        return Err(unexpected_shape(raw));
    };

    let label = field_label(fields, "label").or_else(|| field_label(fields, "label_raw"));
    let score = match fields.get("score") {
        None | Some(Value::Null) => 0.0,
        Some(value) => score_value(value, raw)?,
    };

    build_result(label, score, raw)
}

fn field_label(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(label_text)
}

/// String labels verbatim, other scalars as JSON text, null as absent
fn label_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn score_value(value: &Value, raw: &str) -> Result<f64, AnalysisError> {
    let score = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    score.ok_or_else(|| AnalysisError::parse(format!("score is not numeric: {}", value), raw))
}

fn build_result(
    label: Option<String>,
    score: f64,
    raw: &str,
) -> Result<AnalysisResult, AnalysisError> {
    if !score.is_finite() || !(0.0..=1.0).contains(&score) {
        return Err(AnalysisError::parse(
            format!("score out of range: {}", score),
            raw,
        ));
    }

    Ok(AnalysisResult {
        label: label.unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
        score,
    })
}

fn unexpected_shape(raw: &str) -> AnalysisError {
    AnalysisError::parse("unexpected JSON/event-stream format", raw)
}
