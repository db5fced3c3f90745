//! Review memory port.
//!
//! Historical knowledge about the repository: conventions, previously
//! reviewed tasks, recorded outcomes. Failures here must never be
//! fatal — the orchestrator degrades to empty hints.

use async_trait::async_trait;
use panel_domain::{ReviewState, SimilarTask, TaskMetadata};
use thiserror::Error;

/// Errors from the memory backend
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Port for cross-run review memory
#[async_trait]
pub trait MemoryPort: Send + Sync {
    /// Repository-specific conventions relevant to the task.
    async fn conventions(&self, task: &TaskMetadata) -> Result<Vec<String>, MemoryError>;

    /// Historical tasks overlapping the given changed files.
    async fn similar_tasks(
        &self,
        task: &TaskMetadata,
        changed_files: &[String],
    ) -> Result<Vec<SimilarTask>, MemoryError>;

    /// Persist the outcome of a finished run for future lookups.
    async fn record_outcome(&self, state: &ReviewState) -> Result<(), MemoryError>;
}
