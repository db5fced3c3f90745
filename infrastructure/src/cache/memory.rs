//! In-memory TTL cache for resolved context.
//!
//! Offline stand-in for the external cache tier. Entries expire lazily:
//! an expired entry is dropped on the read that finds it. The adapter
//! never raises — a poisoned lock just behaves like a miss.

use async_trait::async_trait;
use panel_application::ContextCachePort;
use panel_domain::ContextRecord;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

struct Entry {
    record: ContextRecord,
    expires_at: Instant,
}

/// Mutex-guarded map with per-entry expiry.
pub struct InMemoryTtlCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryTtlCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of live entries (expired ones included until touched).
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryTtlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContextCachePort for InMemoryTtlCache {
    async fn get(&self, key: &str) -> Option<ContextRecord> {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Context cache lock poisoned, treating as miss");
                return None;
            }
        };

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.record.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn put(&self, key: &str, record: &ContextRecord, ttl: Duration) {
        let Ok(mut entries) = self.entries.lock() else {
            warn!("Context cache lock poisoned, dropping write");
            return;
        };
        entries.insert(
            key.to_string(),
            Entry {
                record: record.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_domain::{ContextPayload, ContextType, ResolutionSource};

    fn record(key: &str) -> ContextRecord {
        ContextRecord::new(
            1,
            ContextType::CodeSearch,
            ContextPayload::new(serde_json::json!({}), "cached"),
            key,
            ResolutionSource::ExactCapability,
        )
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let cache = InMemoryTtlCache::new();
        cache
            .put("k1", &record("k1"), Duration::from_secs(60))
            .await;

        let hit = cache.get("k1").await.unwrap();
        assert_eq!(hit.cache_key, "k1");
        assert_eq!(hit.payload.summary, "cached");
        assert!(cache.get("other").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = InMemoryTtlCache::new();
        cache.put("k1", &record("k1"), Duration::ZERO).await;

        assert!(cache.get("k1").await.is_none());
        // And the read reaped it
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_refreshes_ttl() {
        let cache = InMemoryTtlCache::new();
        cache.put("k1", &record("k1"), Duration::ZERO).await;
        cache
            .put("k1", &record("k1"), Duration::from_secs(60))
            .await;

        assert!(cache.get("k1").await.is_some());
    }
}
