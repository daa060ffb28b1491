//! Correlation cache
//!
//! Short-lived token → submitted text map used to trace a poll back to the
//! request that produced it. Diagnostics only: a missing or expired entry
//! never affects result retrieval.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default entry lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Longest accepted entry lifetime; larger TTLs are clamped to it
pub const MAX_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cached submission context
#[derive(Debug, Clone, PartialEq)]
pub struct CachedCorrelation {
    pub token: String,
    pub text: String,
    pub expires_at: Instant,
}

impl CachedCorrelation {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// TTL-keyed submission cache
///
/// Keys are unique per submission, so concurrent requests never contend on
/// the same entry; the lock only guards the map structure.
pub struct CorrelationCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedCorrelation>>,
}

impl CorrelationCache {
    pub fn new(ttl: Duration) -> Self {
        if ttl > MAX_TTL {
            tracing::warn!(
                requested_secs = ttl.as_secs(),
                max_secs = MAX_TTL.as_secs(),
                "Correlation TTL clamped"
            );
        }
        Self {
            ttl: ttl.min(MAX_TTL),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Record a submission; expired entries are swept on the way in
    pub async fn insert(&self, token: &str, text: &str) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| !entry.is_expired(now));
        entries.insert(
            token.to_string(),
            CachedCorrelation {
                token: token.to_string(),
                text: text.to_string(),
                // ttl <= MAX_TTL, so this cannot overflow
                expires_at: now + self.ttl,
            },
        );
    }

    /// Live entry for `token`, if any
    pub async fn get(&self, token: &str) -> Option<CachedCorrelation> {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .get(token)
            .filter(|entry| !entry.is_expired(now))
            .cloned()
    }

    /// Drop expired entries, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Purge expired entries once per TTL until `cancel` fires
pub fn spawn_sweeper(cache: Arc<CorrelationCache>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cache.ttl());
        // First tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = cache.purge_expired().await;
                    if removed > 0 {
                        tracing::debug!(removed, "Expired correlations purged");
                    }
                }
            }
        }
        tracing::debug!("Correlation sweeper stopped");
    })
}

impl Default for CorrelationCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_then_get() {
        let cache = CorrelationCache::default();
        cache.insert("evt-1", "harika bir film").await;

        let entry = cache.get("evt-1").await.unwrap();
        assert_eq!(entry.token, "evt-1");
        assert_eq!(entry.text, "harika bir film");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_token_is_absent() {
        let cache = CorrelationCache::default();
        assert!(cache.get("missing").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let cache = CorrelationCache::new(Duration::from_millis(50));
        cache.insert("evt-1", "text").await;
        assert!(cache.get("evt-1").await.is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cache.get("evt-1").await.is_none());
        assert_eq!(cache.len().await, 0);
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.purge_expired().await, 0);
    }

    #[tokio::test]
    async fn test_insert_sweeps_expired_entries() {
        let cache = CorrelationCache::new(Duration::from_millis(50));
        cache.insert("old", "text").await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        cache.insert("new", "text").await;

        // "old" was removed by the sweep, not merely hidden
        assert_eq!(cache.purge_expired().await, 0);
        assert!(cache.get("new").await.is_some());
    }

    #[tokio::test]
    async fn test_huge_ttl_is_clamped() {
        let cache = CorrelationCache::new(Duration::from_secs(u64::MAX));
        assert_eq!(cache.ttl(), MAX_TTL);

        cache.insert("evt-1", "text").await;
        assert!(cache.get("evt-1").await.is_some());
    }

    #[tokio::test]
    async fn test_sweeper_purges_until_cancelled() {
        let cache = Arc::new(CorrelationCache::new(Duration::from_millis(40)));
        let cancel = CancellationToken::new();
        let sweeper = spawn_sweeper(cache.clone(), cancel.clone());

        cache.insert("evt-1", "text").await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        // Sweeper already removed the entry; nothing left to purge
        assert_eq!(cache.purge_expired().await, 0);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), sweeper)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_reinsert_refreshes_expiry() {
        let cache = CorrelationCache::new(Duration::from_millis(100));
        cache.insert("evt-1", "first").await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        cache.insert("evt-1", "second").await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        let entry = cache.get("evt-1").await.unwrap();
        assert_eq!(entry.text, "second");
    }
}
