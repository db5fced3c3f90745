//! In-memory workflow queue store.
//!
//! Offline reference for the store port: hash records, one FIFO list,
//! per-record TTL with lazy reaping. One lock guards the whole state,
//! which makes every port operation atomic — the same guarantee a
//! Redis-class store provides per key (HSETNX, LPUSH/RPOP, EXPIRE) and
//! the guarantee dedup correctness rests on.

use async_trait::async_trait;
use panel_application::{CreateOutcome, QueueStorePort, StoreError};
use panel_domain::{RequestStatus, WorkflowRequest};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct StoredRecord {
    request: WorkflowRequest,
    expires_at: Instant,
}

#[derive(Default)]
struct StoreState {
    records: HashMap<String, StoredRecord>,
    fifo: VecDeque<String>,
}

impl StoreState {
    /// Drop an expired record on access; returns the live record.
    fn live_record(&mut self, id: &str) -> Option<&mut StoredRecord> {
        let expired = self
            .records
            .get(id)
            .is_some_and(|r| r.expires_at <= Instant::now());
        if expired {
            self.records.remove(id);
            return None;
        }
        self.records.get_mut(id)
    }
}

/// Mutex-guarded in-memory store implementing [`QueueStorePort`].
pub struct InMemoryQueueStore {
    state: Mutex<StoreState>,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("store lock poisoned: {}", e)))
    }

    /// Number of FIFO entries currently queued (for tests/inspection).
    pub fn pending_len(&self) -> usize {
        self.state.lock().map(|s| s.fifo.len()).unwrap_or(0)
    }
}

impl Default for InMemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueStorePort for InMemoryQueueStore {
    async fn create_if_vacant(
        &self,
        request: &WorkflowRequest,
        ttl: Duration,
    ) -> Result<CreateOutcome, StoreError> {
        let mut state = self.lock()?;

        if let Some(existing) = state.live_record(&request.id)
            && existing.request.status.is_active()
        {
            return Ok(CreateOutcome::AlreadyActive);
        }

        // Vacant, expired or terminal: this submission owns the slot
        state.records.insert(
            request.id.clone(),
            StoredRecord {
                request: request.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(CreateOutcome::Created)
    }

    async fn load(&self, id: &str) -> Result<Option<WorkflowRequest>, StoreError> {
        let mut state = self.lock()?;
        Ok(state.live_record(id).map(|r| r.request.clone()))
    }

    async fn transition(
        &self,
        id: &str,
        to: RequestStatus,
        result: Option<serde_json::Value>,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let Some(record) = state.live_record(id) else {
            return Ok(false);
        };
        if !record.request.status.can_transition_to(to) {
            return Ok(false);
        }
        record.request.status = to;
        if let Some(result) = result {
            record.request.result = Some(result);
        }
        Ok(true)
    }

    async fn push_pending(&self, id: &str) -> Result<(), StoreError> {
        self.lock()?.fifo.push_back(id.to_string());
        Ok(())
    }

    async fn pop_pending(&self) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.fifo.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(task_id: u64) -> WorkflowRequest {
        WorkflowRequest::run_ci("tester", "acme/widgets", task_id, "main")
    }

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_create_then_duplicate() {
        let store = InMemoryQueueStore::new();
        let req = request(1);

        assert_eq!(
            store.create_if_vacant(&req, TTL).await.unwrap(),
            CreateOutcome::Created
        );
        assert_eq!(
            store.create_if_vacant(&req, TTL).await.unwrap(),
            CreateOutcome::AlreadyActive
        );
    }

    #[tokio::test]
    async fn test_terminal_record_is_replaceable() {
        let store = InMemoryQueueStore::new();
        let req = request(2);
        store.create_if_vacant(&req, TTL).await.unwrap();
        store
            .transition(&req.id, RequestStatus::InProgress, None)
            .await
            .unwrap();
        store
            .transition(&req.id, RequestStatus::Completed, Some(serde_json::json!({})))
            .await
            .unwrap();

        assert_eq!(
            store.create_if_vacant(&req, TTL).await.unwrap(),
            CreateOutcome::Created
        );
        // The fresh record is pending again
        let loaded = store.load(&req.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, RequestStatus::Pending);
        assert!(loaded.result.is_none());
    }

    #[tokio::test]
    async fn test_ttl_expiry_behaves_like_vacancy() {
        let store = InMemoryQueueStore::new();
        let req = request(3);
        store
            .create_if_vacant(&req, Duration::ZERO)
            .await
            .unwrap();

        assert!(store.load(&req.id).await.unwrap().is_none());
        assert_eq!(
            store.create_if_vacant(&req, TTL).await.unwrap(),
            CreateOutcome::Created
        );
    }

    #[tokio::test]
    async fn test_transition_enforces_lattice() {
        let store = InMemoryQueueStore::new();
        let req = request(4);
        store.create_if_vacant(&req, TTL).await.unwrap();

        // Illegal skip leaves the record untouched
        assert!(
            !store
                .transition(&req.id, RequestStatus::Completed, None)
                .await
                .unwrap()
        );
        assert_eq!(
            store.load(&req.id).await.unwrap().unwrap().status,
            RequestStatus::Pending
        );

        assert!(
            store
                .transition(&req.id, RequestStatus::InProgress, None)
                .await
                .unwrap()
        );
        assert!(
            store
                .transition(
                    &req.id,
                    RequestStatus::Failed,
                    Some(serde_json::json!({"error": "boom"}))
                )
                .await
                .unwrap()
        );
        // Terminal is final
        assert!(
            !store
                .transition(&req.id, RequestStatus::InProgress, None)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_fifo_order_across_producers() {
        let store = InMemoryQueueStore::new();
        for i in 0..3 {
            store.push_pending(&format!("id-{}", i)).await.unwrap();
        }

        assert_eq!(store.pop_pending().await.unwrap().unwrap(), "id-0");
        assert_eq!(store.pop_pending().await.unwrap().unwrap(), "id-1");
        assert_eq!(store.pop_pending().await.unwrap().unwrap(), "id-2");
        assert!(store.pop_pending().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_record_transition_is_false() {
        let store = InMemoryQueueStore::new();
        assert!(
            !store
                .transition("ghost", RequestStatus::InProgress, None)
                .await
                .unwrap()
        );
    }
}
