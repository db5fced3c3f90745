//! Workflow queue backing store port.
//!
//! The store holds one hash record per request, one FIFO list of
//! pending ids, and applies TTLs to records. Correctness of dedup and
//! lifecycle transitions relies on the store's atomic per-key and
//! per-list operations — callers never wrap these in their own locks.
//!
//! Any key/value store with hash + list + TTL + per-key atomicity
//! semantics can implement this (the in-memory adapter is the shipped
//! reference; a Redis-class store maps onto HSETNX/LPUSH/RPOP/EXPIRE).

use async_trait::async_trait;
use panel_domain::{RequestStatus, WorkflowRequest};
use std::time::Duration;
use thiserror::Error;

/// Errors from the backing store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt record for {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Outcome of an atomic record creation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// No live record existed; this request's record was stored
    Created,
    /// A record with the same id is pending or in progress
    AlreadyActive,
}

/// Port for the workflow queue's backing store
#[async_trait]
pub trait QueueStorePort: Send + Sync {
    /// Atomically create the request's record unless a live (pending or
    /// in-progress) record with the same id exists. A terminal or
    /// expired record is replaced. The TTL applies to the new record.
    async fn create_if_vacant(
        &self,
        request: &WorkflowRequest,
        ttl: Duration,
    ) -> Result<CreateOutcome, StoreError>;

    /// Load a record by id (`None` if missing or expired).
    async fn load(&self, id: &str) -> Result<Option<WorkflowRequest>, StoreError>;

    /// Atomically apply a lifecycle transition. Returns `false` when the
    /// record is missing or the transition violates the monotonic
    /// lattice; the record is left untouched in that case. A result
    /// payload may be attached on terminal transitions.
    async fn transition(
        &self,
        id: &str,
        to: RequestStatus,
        result: Option<serde_json::Value>,
    ) -> Result<bool, StoreError>;

    /// Append an id to the pending FIFO list.
    async fn push_pending(&self, id: &str) -> Result<(), StoreError>;

    /// Pop the oldest id from the pending FIFO list.
    async fn pop_pending(&self) -> Result<Option<String>, StoreError>;
}
