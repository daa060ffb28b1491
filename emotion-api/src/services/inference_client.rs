//! Inference service client
//!
//! The upstream classifier is asynchronous: a submission returns an
//! `event_id`, and the result is fetched later from `<call_path>/<event_id>`.
//! Fetches are retried with exponential backoff; every suspension point
//! (fetch and backoff sleep) is raced against a [`CancellationToken`].

use emotion_common::config::InferenceConfig;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{preview, AnalysisError};
use crate::models::CorrelationToken;
use crate::services::correlation_cache::CorrelationCache;

const USER_AGENT: &str = concat!("emotion-api/", env!("CARGO_PKG_VERSION"));

/// Poll attempt budget and backoff base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total fetch attempts (at least 1)
    pub max_attempts: u32,
    /// Wait after the first failed attempt; doubles each time
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Wait after failed attempt `attempt` (1-indexed): `base_delay * 2^(attempt-1)`
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(700))
    }
}

impl From<&InferenceConfig> for RetryPolicy {
    fn from(config: &InferenceConfig) -> Self {
        Self::new(config.max_retries, Duration::from_millis(config.retry_delay_ms))
    }
}

/// Submission body: the upstream takes a batch-style single-element list
#[derive(Debug, Serialize)]
struct SubmitPayload<'a> {
    data: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    event_id: Option<String>,
}

/// Outcome of one poll fetch that reached the upstream
enum FetchOutcome {
    Ready(String),
    NotReady(u16),
}

/// Upstream inference client
pub struct InferenceClient {
    http_client: reqwest::Client,
    submit_url: Url,
    retry: RetryPolicy,
    correlations: Arc<CorrelationCache>,
}

impl InferenceClient {
    pub fn new(
        config: &InferenceConfig,
        correlations: Arc<CorrelationCache>,
    ) -> Result<Self, AnalysisError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| AnalysisError::Connectivity {
                status: None,
                message: format!("failed to build HTTP client: {}", e),
            })?;

        let submit_url = Url::parse(&config.submit_url())
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| AnalysisError::Connectivity {
                status: None,
                message: format!("invalid inference service URL: {}", config.submit_url()),
            })?;

        Ok(Self {
            http_client,
            submit_url,
            retry: RetryPolicy::from(config),
            correlations,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn correlations(&self) -> &CorrelationCache {
        &self.correlations
    }

    /// Submit `text` for analysis and return the upstream correlation token
    pub async fn submit(&self, text: &str) -> Result<CorrelationToken, AnalysisError> {
        if text.trim().is_empty() {
            return Err(AnalysisError::Validation("text is required".to_string()));
        }

        tracing::debug!(url = %self.submit_url, chars = text.chars().count(), "Submitting text for analysis");

        let response = self
            .http_client
            .post(self.submit_url.clone())
            .json(&SubmitPayload { data: [text] })
            .send()
            .await
            .map_err(|e| {
                tracing::error!(url = %self.submit_url, error = %e, "Submission request failed");
                AnalysisError::Connectivity {
                    status: None,
                    message: format!("could not connect to inference service: {}", e),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %preview(&body), "Submission rejected by inference service");
            return Err(AnalysisError::Connectivity {
                status: Some(status.as_u16()),
                message: format!("inference service returned {}", status),
            });
        }

        let body = response.text().await.map_err(|e| AnalysisError::Connectivity {
            status: Some(status.as_u16()),
            message: format!("failed to read submission response: {}", e),
        })?;

        let parsed: SubmitResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, response = %preview(&body), "Submission response is not valid JSON");
            AnalysisError::Submission(format!("invalid submission response: {}", e))
        })?;

        let token = parsed
            .event_id
            .and_then(CorrelationToken::new)
            .ok_or_else(|| {
                tracing::error!(response = %preview(&body), "event_id returned empty");
                AnalysisError::Submission("empty correlation token".to_string())
            })?;

        self.correlations.insert(token.as_str(), text).await;
        tracing::debug!(token = %token, "Submission accepted");

        Ok(token)
    }

    /// Fetch the result body for `token`, retrying with exponential backoff
    pub async fn poll(
        &self,
        token: &CorrelationToken,
        cancel: &CancellationToken,
    ) -> Result<String, AnalysisError> {
        let url = self.result_url(token)?;
        let max_attempts = self.retry.max_attempts;

        for attempt in 1..=max_attempts {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(token, attempt)),
                outcome = self.fetch_result(&url) => outcome,
            };

            match outcome {
                Ok(FetchOutcome::Ready(body)) => {
                    tracing::info!(token = %token, attempt, "Analysis successful");
                    return Ok(body);
                }
                Ok(FetchOutcome::NotReady(status)) => {
                    tracing::warn!(
                        token = %token,
                        status,
                        attempt,
                        max_attempts,
                        "Could not retrieve analysis result"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        token = %token,
                        error = %e,
                        attempt,
                        max_attempts,
                        "Error retrieving analysis result"
                    );
                }
            }

            if attempt < max_attempts {
                let delay = self.retry.delay_after(attempt);
                tracing::debug!(token = %token, attempt, delay_ms = delay.as_millis() as u64, "Backing off before next poll");

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(self.cancelled(token, attempt)),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        if let Some(entry) = self.correlations.get(token.as_str()).await {
            tracing::error!(
                token = %token,
                attempts = max_attempts,
                text = %preview(&entry.text),
                "Poll attempts exhausted"
            );
        } else {
            tracing::error!(token = %token, attempts = max_attempts, "Poll attempts exhausted");
        }

        Err(AnalysisError::Timeout {
            token: token.to_string(),
            attempts: max_attempts,
        })
    }

    /// Submit then poll, returning the raw result body
    pub async fn analyze_raw(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AnalysisError> {
        let token = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AnalysisError::Cancelled),
            token = self.submit(text) => token?,
        };
        self.poll(&token, cancel).await
    }

    /// `<submit_url>/<token>` with the token as a single escaped path segment
    pub fn result_url(&self, token: &CorrelationToken) -> Result<Url, AnalysisError> {
        let mut url = self.submit_url.clone();
        url.path_segments_mut()
            .map_err(|_| AnalysisError::Connectivity {
                status: None,
                message: format!("inference service URL cannot take a path: {}", self.submit_url),
            })?
            .pop_if_empty()
            .push(token.as_str());
        Ok(url)
    }

    async fn fetch_result(&self, url: &Url) -> Result<FetchOutcome, reqwest::Error> {
        let response = self.http_client.get(url.clone()).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(FetchOutcome::Ready(response.text().await?))
        } else {
            Ok(FetchOutcome::NotReady(status.as_u16()))
        }
    }

    fn cancelled(&self, token: &CorrelationToken, attempt: u32) -> AnalysisError {
        tracing::info!(token = %token, attempt, "Polling cancelled");
        AnalysisError::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = RetryPolicy::new(5, Duration::from_millis(700));
        assert_eq!(policy.delay_after(1), Duration::from_millis(700));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1400));
        assert_eq!(policy.delay_after(3), Duration::from_millis(2800));
        assert_eq!(policy.delay_after(4), Duration::from_millis(5600));
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[test]
    fn test_delay_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1));
        assert_eq!(
            policy.delay_after(64),
            Duration::from_secs(1).saturating_mul(u32::MAX)
        );
    }

    #[test]
    fn test_policy_from_config() {
        let config = InferenceConfig {
            max_retries: 4,
            retry_delay_ms: 250,
            ..InferenceConfig::default()
        };
        assert_eq!(
            RetryPolicy::from(&config),
            RetryPolicy::new(4, Duration::from_millis(250))
        );
    }

    #[test]
    fn test_submit_payload_wraps_text_in_list() {
        let payload = SubmitPayload { data: ["merhaba dünya"] };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({ "data": ["merhaba dünya"] })
        );
    }

    #[test]
    fn test_result_url_escapes_token() {
        let client = InferenceClient::new(
            &InferenceConfig::default(),
            Arc::new(CorrelationCache::default()),
        )
        .unwrap();

        let token = CorrelationToken::new("abc123").unwrap();
        assert_eq!(
            client.result_url(&token).unwrap().as_str(),
            "https://mustafaep-emotion-analyzer.hf.space/gradio_api/call/analyze/abc123"
        );

        let token = CorrelationToken::new("a/b?c#d").unwrap();
        let url = client.result_url(&token).unwrap();
        assert!(url
            .as_str()
            .ends_with("/gradio_api/call/analyze/a%2Fb%3Fc%23d"));
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let config = InferenceConfig {
            base_url: "not a url".to_string(),
            ..InferenceConfig::default()
        };
        let result = InferenceClient::new(&config, Arc::new(CorrelationCache::default()));
        assert!(matches!(
            result,
            Err(AnalysisError::Connectivity { status: None, .. })
        ));
    }

    #[test]
    fn test_client_creation() {
        let client = InferenceClient::new(
            &InferenceConfig::default(),
            Arc::new(CorrelationCache::default()),
        );
        assert!(client.is_ok());
    }
}
