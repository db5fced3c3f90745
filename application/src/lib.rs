//! Application layer for panel-review
//!
//! This crate contains use cases, port definitions, and application
//! configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{CiConfig, ContextConfig, OrchestratorConfig, QueueConfig};
pub use ports::{
    ci_runner::{CiConclusion, CiError, CiPoll, CiRunHandle, CiRunState, CiRunnerPort},
    context_cache::{ContextCachePort, NoCache},
    events::{FanoutEvents, NoopEvents, ReviewEventSink},
    memory::{MemoryError, MemoryPort},
    queue_store::{CreateOutcome, QueueStorePort, StoreError},
    reasoning::{AnalyzeInput, PlanInput, ReasoningError, ReasoningPort},
    tool_executor::ToolExecutorPort,
};
pub use use_cases::resolve_context::{ContextResolver, ResolvedContext};
pub use use_cases::run_review::RunReviewUseCase;
pub use use_cases::run_specialist::{
    RunContext, SpecialistError, SpecialistPhase, SpecialistRunner, next_phase,
};
pub use use_cases::workflow_queue::{QueueError, WorkflowQueue};
pub use use_cases::workflow_worker::WorkflowWorker;
