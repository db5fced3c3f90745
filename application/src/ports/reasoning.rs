//! Reasoning backend port.
//!
//! The backend answers two questions per specialist iteration: what
//! context is needed (`plan`) and what the gathered evidence means
//! (`analyze`). Answers come back as raw text the use case parses as
//! JSON; malformed answers degrade, they never abort a run.

use async_trait::async_trait;
use panel_domain::{ContextRecord, Finding, Specialty, TaskMetadata};
use thiserror::Error;

/// Errors from the reasoning backend
#[derive(Error, Debug)]
pub enum ReasoningError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,
}

/// Everything a backend sees when planning context for an iteration.
#[derive(Debug, Clone)]
pub struct PlanInput<'a> {
    pub specialty: Specialty,
    pub task: &'a TaskMetadata,
    pub diff: &'a str,
    pub changed_files: &'a [String],
    pub conventions: &'a [String],
    /// Max simultaneous context requests this iteration
    pub context_budget: usize,
}

/// Everything a backend sees when analyzing gathered evidence.
#[derive(Debug, Clone)]
pub struct AnalyzeInput<'a> {
    pub specialty: Specialty,
    pub task: &'a TaskMetadata,
    pub diff: &'a str,
    pub context: &'a [ContextRecord],
    pub findings: &'a [Finding],
    pub trace: &'a [String],
    pub iteration: u32,
    pub max_iterations: u32,
}

/// Port for the reasoning backend.
///
/// Both methods return the backend's raw textual answer. The expected
/// shape is JSON (`{"context_requests": [...], "reasoning": "..."}` for
/// plan, `{"findings": [...], "needs_more_context": bool, ...}` for
/// analyze), but callers must tolerate anything.
#[async_trait]
pub trait ReasoningPort: Send + Sync {
    /// Ask what context this iteration needs.
    async fn plan(&self, input: PlanInput<'_>) -> Result<String, ReasoningError>;

    /// Analyze diff plus all accumulated evidence.
    async fn analyze(&self, input: AnalyzeInput<'_>) -> Result<String, ReasoningError>;
}
