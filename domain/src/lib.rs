//! Domain layer for panel-review
//!
//! This crate contains the core business logic, entities, and value
//! objects. It has no dependencies on infrastructure or presentation
//! concerns.
//!
//! # Core Concepts
//!
//! ## Review panel
//!
//! A roster of bounded, iterative specialists reviews one unit of
//! change in parallel; each emits a [`Verdict`] and the run reduces
//! them to one [`OverallOutcome`].
//!
//! ## Context
//!
//! Specialists gather external information in units of
//! [`ContextRequest`], resolved through a capability fallback chain
//! into append-only [`ContextRecord`]s.
//!
//! ## Workflow requests
//!
//! Side effects (CI runs, test queries) are [`WorkflowRequest`]s whose
//! identity is a hash of kind and canonical parameters, so identical
//! asks deduplicate to one execution.

pub mod context;
pub mod core;
pub mod review;
pub mod tool;
pub mod workflow;

// Re-export commonly used types
pub use context::{ContextPayload, ContextRecord, ContextRequest, ContextType, ResolutionSource};
pub use core::{error::DomainError, string::truncate};
pub use review::{
    AggregateReport, Complexity, Finding, FindingKind, OverallOutcome, ReviewState, Severity,
    SimilarTask, SpecialistState, Specialty, SpecialtyProfile, StateUpdate, TaskMetadata, Verdict,
    VerdictOutcome, aggregate_verdicts,
};
pub use tool::{
    ProviderError, ToolCall, ToolCatalog, ToolDescriptor, ToolError, ToolProvider, ToolResult,
};
pub use workflow::{RequestKind, RequestStatus, WorkflowRequest, derive_request_id};
