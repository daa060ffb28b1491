//! Shared test helpers for emotion-api integration tests
//!
//! [`FakeUpstream`] stands in for the hosted classifier: an axum router on an
//! ephemeral port serving the submit and result endpoints from a script.

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use emotion_api::services::{CorrelationCache, InferenceClient};
use emotion_api::AppState;
use emotion_common::config::InferenceConfig;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const CALL_PATH: &str = "gradio_api/call/analyze";

/// Scripted upstream behavior and observed traffic
#[derive(Debug)]
struct Script {
    submit_status: StatusCode,
    submit_body: String,
    polls: VecDeque<(StatusCode, String)>,
    submit_hits: usize,
    poll_hits: usize,
    last_submit_body: Option<Value>,
    last_poll_token: Option<String>,
    poll_delay: Duration,
}

/// In-process stand-in for the inference service
#[derive(Clone)]
pub struct FakeUpstream {
    addr: SocketAddr,
    script: Arc<Mutex<Script>>,
}

impl FakeUpstream {
    /// Start a fake that hands out `event_id` and answers polls with 404
    /// until responses are queued
    pub async fn start(event_id: &str) -> Self {
        Self::start_with_submit(StatusCode::OK, &format!(r#"{{"event_id":"{}"}}"#, event_id)).await
    }

    /// Start a fake with an arbitrary submit response
    pub async fn start_with_submit(status: StatusCode, body: &str) -> Self {
        let script = Arc::new(Mutex::new(Script {
            submit_status: status,
            submit_body: body.to_string(),
            polls: VecDeque::new(),
            submit_hits: 0,
            poll_hits: 0,
            last_submit_body: None,
            last_poll_token: None,
            poll_delay: Duration::ZERO,
        }));

        let app = Router::new()
            .route(&format!("/{}", CALL_PATH), post(fake_submit))
            .route(&format!("/{}/:token", CALL_PATH), get(fake_poll))
            .with_state(script.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { addr, script }
    }

    /// Queue the next poll response
    pub fn push_poll(&self, status: StatusCode, body: &str) {
        self.script
            .lock()
            .unwrap()
            .polls
            .push_back((status, body.to_string()));
    }

    /// Hold every poll reply for `delay` before answering
    pub fn set_poll_delay(&self, delay: Duration) {
        self.script.lock().unwrap().poll_delay = delay;
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn submit_hits(&self) -> usize {
        self.script.lock().unwrap().submit_hits
    }

    pub fn poll_hits(&self) -> usize {
        self.script.lock().unwrap().poll_hits
    }

    pub fn last_submit_body(&self) -> Option<Value> {
        self.script.lock().unwrap().last_submit_body.clone()
    }

    pub fn last_poll_token(&self) -> Option<String> {
        self.script.lock().unwrap().last_poll_token.clone()
    }

    /// Client settings pointing at this fake with a short backoff
    pub fn config(&self) -> InferenceConfig {
        inference_config(&self.base_url(), 10)
    }
}

async fn fake_submit(
    State(script): State<Arc<Mutex<Script>>>,
    Json(body): Json<Value>,
) -> Response {
    let mut script = script.lock().unwrap();
    script.submit_hits += 1;
    script.last_submit_body = Some(body);
    (
        script.submit_status,
        [(header::CONTENT_TYPE, "application/json")],
        script.submit_body.clone(),
    )
        .into_response()
}

async fn fake_poll(
    State(script): State<Arc<Mutex<Script>>>,
    Path(token): Path<String>,
) -> Response {
    let delay = {
        let mut script = script.lock().unwrap();
        script.poll_hits += 1;
        script.last_poll_token = Some(token);
        script.poll_delay
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mut script = script.lock().unwrap();
    match script.polls.pop_front() {
        Some((status, body)) => (status, body).into_response(),
        None => (StatusCode::NOT_FOUND, "result not ready").into_response(),
    }
}

/// Inference settings for `base_url` with `retry_delay_ms` backoff
pub fn inference_config(base_url: &str, retry_delay_ms: u64) -> InferenceConfig {
    InferenceConfig {
        base_url: base_url.to_string(),
        call_path: CALL_PATH.to_string(),
        max_retries: 3,
        retry_delay_ms,
        request_timeout_secs: 5,
        correlation_ttl_secs: 300,
    }
}

/// Client with its own correlation cache
pub fn test_client(config: &InferenceConfig) -> InferenceClient {
    InferenceClient::new(config, Arc::new(CorrelationCache::default())).unwrap()
}

/// File-backed database in a temporary directory
pub async fn test_db() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let pool = emotion_api::db::init_database_pool(&dir.path().join("emotiondata.db"))
        .await
        .unwrap();
    (dir, pool)
}

/// Application state wired to `upstream` and a fresh database
pub async fn test_state(upstream: &FakeUpstream) -> (TempDir, AppState) {
    let (dir, pool) = test_db().await;
    let state = AppState::new(pool, test_client(&upstream.config()));
    (dir, state)
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
