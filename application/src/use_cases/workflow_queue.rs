//! Deduplicating workflow queue.
//!
//! Identical requests (same kind + canonical params) share one derived
//! id. Submitting a request whose id already has a live record returns
//! that id instead of creating a new entry, so N concurrent submitters
//! converge on one queue entry and one execution. Lifecycle transitions
//! go through the store's atomic operations and are monotonic:
//! `pending → in_progress → {completed, failed}`.

use crate::config::QueueConfig;
use crate::ports::events::ReviewEventSink;
use crate::ports::queue_store::{CreateOutcome, QueueStorePort, StoreError};
use panel_domain::{RequestStatus, WorkflowRequest};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors surfaced to queue callers
#[derive(Error, Debug)]
pub enum QueueError {
    /// No record exists for the id (expired or never created)
    #[error("Request not found: {0}")]
    NotFound(String),

    /// The request reached `failed`; carries the stored error
    #[error("Request {id} failed: {message}")]
    Failed { id: String, message: String },

    /// `wait_for_result` ran out of time
    #[error("Request {id} timed out after {seconds}s")]
    Timeout { id: String, seconds: u64 },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Deduplicating FIFO queue over a shared backing store.
pub struct WorkflowQueue<S: QueueStorePort> {
    store: Arc<S>,
    config: QueueConfig,
    events: Arc<dyn ReviewEventSink>,
}

impl<S: QueueStorePort> Clone for WorkflowQueue<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            events: Arc::clone(&self.events),
        }
    }
}

impl<S: QueueStorePort> WorkflowQueue<S> {
    pub fn new(store: Arc<S>, config: QueueConfig, events: Arc<dyn ReviewEventSink>) -> Self {
        Self {
            store,
            config,
            events,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Enqueue a request, deduplicating against live records.
    ///
    /// Returns the request id — the existing one when an identical
    /// request is already pending or in progress.
    pub async fn enqueue(&self, request: WorkflowRequest) -> Result<String, QueueError> {
        let id = request.id.clone();
        let kind = request.kind;

        match self
            .store
            .create_if_vacant(&request, self.config.record_ttl())
            .await?
        {
            CreateOutcome::AlreadyActive => {
                debug!(id = %id, kind = %kind, "Duplicate submission, returning existing id");
                self.events.on_request_enqueued(&id, kind, true);
                Ok(id)
            }
            CreateOutcome::Created => {
                self.store.push_pending(&id).await?;
                info!(id = %id, kind = %kind, "Enqueued workflow request");
                self.events.on_request_enqueued(&id, kind, false);
                Ok(id)
            }
        }
    }

    /// Pop the next pending request in FIFO order.
    ///
    /// Ids whose record has expired are skipped; `None` means the list
    /// is empty.
    pub async fn get_next(&self) -> Result<Option<WorkflowRequest>, QueueError> {
        loop {
            let Some(id) = self.store.pop_pending().await? else {
                return Ok(None);
            };
            match self.store.load(&id).await? {
                Some(request) => return Ok(Some(request)),
                None => {
                    debug!(id = %id, "Dropping stale queue entry with expired record");
                }
            }
        }
    }

    /// Transition a request to `in_progress`.
    ///
    /// Returns `false` when the claim is lost (already claimed, already
    /// terminal, or the record vanished).
    pub async fn mark_in_progress(&self, id: &str) -> Result<bool, QueueError> {
        Ok(self
            .store
            .transition(id, RequestStatus::InProgress, None)
            .await?)
    }

    /// Transition a request to `completed` with its result payload.
    pub async fn mark_completed(
        &self,
        id: &str,
        result: serde_json::Value,
    ) -> Result<bool, QueueError> {
        Ok(self
            .store
            .transition(id, RequestStatus::Completed, Some(result))
            .await?)
    }

    /// Transition a request to `failed` with the error message.
    pub async fn mark_failed(&self, id: &str, error: &str) -> Result<bool, QueueError> {
        let payload = serde_json::json!({ "error": error });
        Ok(self
            .store
            .transition(id, RequestStatus::Failed, Some(payload))
            .await?)
    }

    /// Current status of a request, if its record still exists.
    pub async fn status(&self, id: &str) -> Result<Option<RequestStatus>, QueueError> {
        Ok(self.store.load(id).await?.map(|r| r.status))
    }

    /// Poll until the request is terminal or the timeout elapses.
    ///
    /// `Completed` yields the stored result; `Failed` raises with the
    /// stored error; a missing record raises `NotFound`.
    pub async fn wait_for_result(
        &self,
        id: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, QueueError> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let record = self
                .store
                .load(id)
                .await?
                .ok_or_else(|| QueueError::NotFound(id.to_string()))?;

            match record.status {
                RequestStatus::Completed => {
                    return Ok(record.result.unwrap_or(serde_json::Value::Null));
                }
                RequestStatus::Failed => {
                    let message = record
                        .result
                        .as_ref()
                        .and_then(|r| r.get("error"))
                        .and_then(|e| e.as_str())
                        .unwrap_or("unknown error")
                        .to_string();
                    return Err(QueueError::Failed {
                        id: id.to_string(),
                        message,
                    });
                }
                RequestStatus::Pending | RequestStatus::InProgress => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(QueueError::Timeout {
                            id: id.to_string(),
                            seconds: timeout.as_secs(),
                        });
                    }
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::events::NoopEvents;
    use async_trait::async_trait;
    use panel_domain::RequestKind;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Minimal in-memory store mirroring the port's atomicity contract.
    #[derive(Default)]
    struct TestStore {
        inner: Mutex<TestStoreInner>,
    }

    #[derive(Default)]
    struct TestStoreInner {
        records: HashMap<String, WorkflowRequest>,
        fifo: VecDeque<String>,
    }

    #[async_trait]
    impl QueueStorePort for TestStore {
        async fn create_if_vacant(
            &self,
            request: &WorkflowRequest,
            _ttl: Duration,
        ) -> Result<CreateOutcome, StoreError> {
            let mut inner = self.inner.lock().unwrap();
            if let Some(existing) = inner.records.get(&request.id)
                && existing.status.is_active()
            {
                return Ok(CreateOutcome::AlreadyActive);
            }
            inner.records.insert(request.id.clone(), request.clone());
            Ok(CreateOutcome::Created)
        }

        async fn load(&self, id: &str) -> Result<Option<WorkflowRequest>, StoreError> {
            Ok(self.inner.lock().unwrap().records.get(id).cloned())
        }

        async fn transition(
            &self,
            id: &str,
            to: RequestStatus,
            result: Option<serde_json::Value>,
        ) -> Result<bool, StoreError> {
            let mut inner = self.inner.lock().unwrap();
            let Some(record) = inner.records.get_mut(id) else {
                return Ok(false);
            };
            if !record.status.can_transition_to(to) {
                return Ok(false);
            }
            record.status = to;
            if let Some(result) = result {
                record.result = Some(result);
            }
            Ok(true)
        }

        async fn push_pending(&self, id: &str) -> Result<(), StoreError> {
            self.inner.lock().unwrap().fifo.push_back(id.to_string());
            Ok(())
        }

        async fn pop_pending(&self) -> Result<Option<String>, StoreError> {
            Ok(self.inner.lock().unwrap().fifo.pop_front())
        }
    }

    fn queue() -> WorkflowQueue<TestStore> {
        let config = QueueConfig {
            poll_interval: Duration::from_millis(5),
            ..Default::default()
        };
        WorkflowQueue::new(Arc::new(TestStore::default()), config, Arc::new(NoopEvents))
    }

    fn ci_request() -> WorkflowRequest {
        WorkflowRequest::run_ci("tester", "acme/widgets", 7, "main")
    }

    #[tokio::test]
    async fn test_enqueue_and_fifo_order() {
        let queue = queue();

        let first = queue.enqueue(ci_request()).await.unwrap();
        let second = queue
            .enqueue(WorkflowRequest::run_ci("tester", "acme/widgets", 8, "main"))
            .await
            .unwrap();
        assert_ne!(first, second);

        assert_eq!(queue.get_next().await.unwrap().unwrap().id, first);
        assert_eq!(queue.get_next().await.unwrap().unwrap().id, second);
        assert!(queue.get_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_idempotent_enqueue() {
        let queue = queue();

        // Three concurrent submissions of the same logical request
        let (a, b, c) = tokio::join!(
            queue.enqueue(ci_request()),
            queue.enqueue(ci_request()),
            queue.enqueue(ci_request()),
        );
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
        assert_eq!(a, b);
        assert_eq!(b, c);

        // Exactly one queue entry
        assert!(queue.get_next().await.unwrap().is_some());
        assert!(queue.get_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_terminal_record_allows_resubmission() {
        let queue = queue();

        let id = queue.enqueue(ci_request()).await.unwrap();
        assert!(queue.mark_in_progress(&id).await.unwrap());
        assert!(
            queue
                .mark_completed(&id, serde_json::json!({"ok": true}))
                .await
                .unwrap()
        );

        // Same logical request again: same id, fresh queue entry
        queue.get_next().await.unwrap();
        let again = queue.enqueue(ci_request()).await.unwrap();
        assert_eq!(again, id);
        assert_eq!(
            queue.status(&id).await.unwrap(),
            Some(RequestStatus::Pending)
        );
    }

    #[tokio::test]
    async fn test_lifecycle_monotonicity() {
        let queue = queue();
        let id = queue.enqueue(ci_request()).await.unwrap();

        // Cannot complete a pending request
        assert!(
            !queue
                .mark_completed(&id, serde_json::Value::Null)
                .await
                .unwrap()
        );

        assert!(queue.mark_in_progress(&id).await.unwrap());
        // Second claim loses
        assert!(!queue.mark_in_progress(&id).await.unwrap());

        assert!(queue.mark_failed(&id, "handler exploded").await.unwrap());
        // Terminal is final
        assert!(!queue.mark_in_progress(&id).await.unwrap());
        assert!(
            !queue
                .mark_completed(&id, serde_json::Value::Null)
                .await
                .unwrap()
        );
        assert_eq!(
            queue.status(&id).await.unwrap(),
            Some(RequestStatus::Failed)
        );
    }

    #[tokio::test]
    async fn test_wait_for_result_success() {
        let queue = queue();
        let id = queue.enqueue(ci_request()).await.unwrap();

        let waiter = {
            let queue = queue.clone();
            let id = id.clone();
            tokio::spawn(async move { queue.wait_for_result(&id, Duration::from_secs(2)).await })
        };

        queue.mark_in_progress(&id).await.unwrap();
        queue
            .mark_completed(&id, serde_json::json!({"tests_passed": true}))
            .await
            .unwrap();

        let result = waiter.await.unwrap().unwrap();
        assert_eq!(result["tests_passed"], true);
    }

    #[tokio::test]
    async fn test_wait_for_result_failure_carries_error() {
        let queue = queue();
        let id = queue.enqueue(ci_request()).await.unwrap();
        queue.mark_in_progress(&id).await.unwrap();
        queue.mark_failed(&id, "workflow not found").await.unwrap();

        let error = queue
            .wait_for_result(&id, Duration::from_secs(1))
            .await
            .unwrap_err();
        match error {
            QueueError::Failed { message, .. } => assert_eq!(message, "workflow not found"),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wait_for_result_timeout() {
        let queue = queue();
        let id = queue.enqueue(ci_request()).await.unwrap();

        let error = queue
            .wait_for_result(&id, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(error, QueueError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_wait_for_missing_record() {
        let queue = queue();
        let error = queue
            .wait_for_result("deadbeef", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(error, QueueError::NotFound(_)));
    }
}
