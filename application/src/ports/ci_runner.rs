//! CI runner port.
//!
//! Narrow trigger/poll contract for the side-effect handler that runs
//! CI. Offline (mock) implementations must return the same result
//! shape as a real provider so callers cannot tell them apart
//! structurally.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a CI provider
#[derive(Error, Debug)]
pub enum CiError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("CI run timed out after {0}s")]
    Timeout(u64),
}

/// Handle for a triggered CI run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiRunHandle {
    pub id: String,
    pub url: String,
}

/// Coarse state of a CI run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiRunState {
    Queued,
    Running,
    Completed,
}

/// Final conclusion of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiConclusion {
    Success,
    Failure,
}

/// One observation of a CI run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiPoll {
    pub state: CiRunState,
    /// Set once `state == Completed`
    pub conclusion: Option<CiConclusion>,
    /// Provider-specific details (test counts, coverage, links)
    pub details: serde_json::Value,
}

impl CiPoll {
    pub fn is_terminal(&self) -> bool {
        self.state == CiRunState::Completed
    }
}

/// Port for triggering and observing CI runs
#[async_trait]
pub trait CiRunnerPort: Send + Sync {
    /// Dispatch a workflow run.
    async fn trigger(
        &self,
        repo: &str,
        workflow: &str,
        branch: &str,
    ) -> Result<CiRunHandle, CiError>;

    /// Observe a run; callers poll until [`CiPoll::is_terminal`].
    async fn poll(&self, handle: &CiRunHandle) -> Result<CiPoll, CiError>;
}
