//! Workflow requests: lifecycle, dedup identity, result payloads.

use crate::core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Kind of side-effecting work a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Trigger a CI run for the task and wait for its conclusion
    RunCi,
    /// Fetch a summary of existing test results
    TestSummary,
    /// Run a single named test
    SingleTest,
}

impl RequestKind {
    pub fn as_str(&self) -> &str {
        match self {
            RequestKind::RunCi => "run_ci",
            RequestKind::TestSummary => "test_summary",
            RequestKind::SingleTest => "single_test",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "run_ci" => Ok(RequestKind::RunCi),
            "test_summary" => Ok(RequestKind::TestSummary),
            "single_test" => Ok(RequestKind::SingleTest),
            other => Err(DomainError::UnknownRequestKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of a queued request.
///
/// Transitions are monotonic: `Pending → InProgress → {Completed,
/// Failed}`. A terminal state is never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }

    /// Whether a request in this state is still claimable/deduplicable.
    pub fn is_active(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::InProgress)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// The monotonic transition lattice.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::InProgress)
                | (RequestStatus::InProgress, RequestStatus::Completed)
                | (RequestStatus::InProgress, RequestStatus::Failed)
        )
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A deduplicated side-effect request.
///
/// The id is derived from the kind and canonicalized parameters, never
/// supplied by the caller, so two logically identical requests always
/// share one identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub id: String,
    /// Who asked (specialist tag, "manual", ...)
    pub requester: String,
    pub kind: RequestKind,
    /// Parameters, canonically ordered
    pub params: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub status: RequestStatus,
    /// Result payload once terminal (error payload for `Failed`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl WorkflowRequest {
    pub fn new(
        requester: impl Into<String>,
        kind: RequestKind,
        params: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        let id = derive_request_id(kind, &params);
        Self {
            id,
            requester: requester.into(),
            kind,
            params,
            created_at: Utc::now(),
            status: RequestStatus::Pending,
            result: None,
        }
    }

    /// Convenience constructor for a CI run request.
    pub fn run_ci(requester: impl Into<String>, repo: &str, task_id: u64, branch: &str) -> Self {
        let mut params = BTreeMap::new();
        params.insert("repo".to_string(), serde_json::json!(repo));
        params.insert("task_id".to_string(), serde_json::json!(task_id));
        params.insert("branch".to_string(), serde_json::json!(branch));
        Self::new(requester, RequestKind::RunCi, params)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }

    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.params.get(key).and_then(|v| v.as_u64())
    }
}

/// Derive the dedup id: sha256 over `kind:canonical_json(params)`.
///
/// Params are held in a `BTreeMap`, so serialization order is the sorted
/// key order and the digest is stable across producers. The full 64-char
/// hex digest is kept; truncation would only buy shorter keys at the
/// price of collision headroom.
pub fn derive_request_id(kind: RequestKind, params: &BTreeMap<String, serde_json::Value>) -> String {
    let canonical = serde_json::to_string(params).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}
