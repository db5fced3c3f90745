//! External context cache port.
//!
//! Second tier of the resolver's cache: a TTL-bounded store shared
//! across runs. Adapters degrade internally — a broken cache behaves
//! like an empty one and must log rather than raise, because a cache
//! failure is never worth failing a context request over.

use async_trait::async_trait;
use panel_domain::ContextRecord;
use std::time::Duration;

/// Port for the TTL-bounded external context cache
#[async_trait]
pub trait ContextCachePort: Send + Sync {
    /// Look up a record by composite cache key.
    async fn get(&self, key: &str) -> Option<ContextRecord>;

    /// Store a record under the key with the given TTL.
    async fn put(&self, key: &str, record: &ContextRecord, ttl: Duration);
}

/// Cache that never hits; for tests and cache-disabled runs.
pub struct NoCache;

#[async_trait]
impl ContextCachePort for NoCache {
    async fn get(&self, _key: &str) -> Option<ContextRecord> {
        None
    }

    async fn put(&self, _key: &str, _record: &ContextRecord, _ttl: Duration) {}
}
