//! Run state: the root aggregate, partial updates, and specialist
//! scratch state.
//!
//! [`ReviewState`] is mutated only through [`ReviewState::apply`], which
//! merges a [`StateUpdate`] under the policy each field declares:
//!
//! | policy  | behavior                                |
//! |---------|-----------------------------------------|
//! | replace | `Some(new)` overwrites the current value |
//! | append  | new items extend the current collection  |
//! | sum     | numeric deltas add to the counter        |
//!
//! Orchestrator steps return partial updates and never touch the state
//! directly, so every merge happens in one place on one task.

use super::specialty::Specialty;
use super::task::{Complexity, TaskMetadata};
use super::verdict::{OverallOutcome, Verdict};
use crate::context::{ContextRecord, ContextRequest};
use crate::review::finding::Finding;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A previously reviewed task that overlaps the current one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarTask {
    pub id: u64,
    pub title: String,
    pub complexity: Complexity,
    /// Overall outcome the earlier review reached
    pub outcome: String,
    /// Number of changed files shared with the current task
    pub overlap: usize,
}

/// Aggregated result of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateReport {
    pub total_specialists: usize,
    pub specialties: Vec<Specialty>,
    pub outcome: OverallOutcome,
    pub summary: String,
}

/// Root aggregate for one review run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewState {
    /// Immutable task metadata
    pub task: TaskMetadata,
    /// Unified diff of the change
    pub diff: String,
    /// Files touched by the change
    pub changed_files: Vec<String>,

    /// merge: replace — repository conventions loaded from memory
    pub conventions: Vec<String>,
    /// merge: replace — overlapping historical tasks
    pub similar_tasks: Vec<SimilarTask>,

    /// merge: replace — planned specialist roster
    pub roster: Vec<Specialty>,

    /// merge: append — one verdict per completed specialist
    pub verdicts: Vec<Verdict>,
    /// merge: append — specialties that were actually spawned
    pub specialists_spawned: Vec<Specialty>,
    /// merge: append — wall-clock seconds per specialist
    pub execution_times: BTreeMap<String, f64>,
    /// merge: append — step-level notes (status, errors, markers)
    pub notes: BTreeMap<String, serde_json::Value>,

    /// merge: sum — token usage across all specialists
    pub tokens_used: u64,
    /// merge: sum — cost across all specialists
    pub total_cost_usd: f64,

    /// merge: replace — aggregate report written by the collect step
    pub aggregate: Option<AggregateReport>,

    pub started_at: DateTime<Utc>,
    /// merge: replace — set exactly once, when the run finishes
    pub completed_at: Option<DateTime<Utc>>,
}

impl ReviewState {
    pub fn new(task: TaskMetadata, diff: impl Into<String>, changed_files: Vec<String>) -> Self {
        Self {
            task,
            diff: diff.into(),
            changed_files,
            conventions: Vec::new(),
            similar_tasks: Vec::new(),
            roster: Vec::new(),
            verdicts: Vec::new(),
            specialists_spawned: Vec::new(),
            execution_times: BTreeMap::new(),
            notes: BTreeMap::new(),
            tokens_used: 0,
            total_cost_usd: 0.0,
            aggregate: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Merge a partial update into the state.
    ///
    /// This is the only mutation path; each field follows the policy
    /// declared on its `StateUpdate` counterpart.
    pub fn apply(&mut self, update: StateUpdate) {
        // replace
        if let Some(conventions) = update.conventions {
            self.conventions = conventions;
        }
        if let Some(similar_tasks) = update.similar_tasks {
            self.similar_tasks = similar_tasks;
        }
        if let Some(roster) = update.roster {
            self.roster = roster;
        }
        if let Some(aggregate) = update.aggregate {
            self.aggregate = Some(aggregate);
        }
        if let Some(completed_at) = update.completed_at {
            self.completed_at = Some(completed_at);
        }

        // append
        self.verdicts.extend(update.verdicts);
        self.specialists_spawned.extend(update.specialists_spawned);
        self.execution_times.extend(update.execution_times);
        self.notes.extend(update.notes);

        // sum
        self.tokens_used += update.tokens_used;
        self.total_cost_usd += update.cost_usd;
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Partial update returned by an orchestrator step.
///
/// Every field names its merge policy; [`ReviewState::apply`] is the
/// single function that interprets them.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    /// replace
    pub conventions: Option<Vec<String>>,
    /// replace
    pub similar_tasks: Option<Vec<SimilarTask>>,
    /// replace
    pub roster: Option<Vec<Specialty>>,
    /// replace
    pub aggregate: Option<AggregateReport>,
    /// replace
    pub completed_at: Option<DateTime<Utc>>,

    /// append
    pub verdicts: Vec<Verdict>,
    /// append
    pub specialists_spawned: Vec<Specialty>,
    /// append
    pub execution_times: BTreeMap<String, f64>,
    /// append
    pub notes: BTreeMap<String, serde_json::Value>,

    /// sum
    pub tokens_used: u64,
    /// sum
    pub cost_usd: f64,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_note(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.notes.insert(key.into(), value);
        self
    }
}

/// Scratch state for one specialist; discarded after finalize.
#[derive(Debug, Clone)]
pub struct SpecialistState {
    pub specialty: Specialty,
    /// Completed analyze iterations
    pub iteration: u32,
    /// Requests queued for the next gather step
    pub pending_requests: Vec<ContextRequest>,
    /// Accumulated context across all iterations
    pub context: Vec<ContextRecord>,
    /// Accumulated findings across all iterations
    pub findings: Vec<Finding>,
    /// Reasoning trace, one entry per step
    pub trace: Vec<String>,
    pub needs_more_context: bool,
}

impl SpecialistState {
    pub fn new(specialty: Specialty) -> Self {
        Self {
            specialty,
            iteration: 0,
            pending_requests: Vec::new(),
            context: Vec::new(),
            findings: Vec::new(),
            trace: Vec::new(),
            needs_more_context: false,
        }
    }

    pub fn note(&mut self, entry: impl Into<String>) {
        self.trace.push(entry.into());
    }

    /// Total token estimate across gathered context.
    pub fn tokens_used(&self) -> u64 {
        self.context.iter().map(|r| r.tokens as u64).sum()
    }

    /// Total cost estimate across gathered context.
    pub fn cost_usd(&self) -> f64 {
        self.context.iter().map(|r| r.cost_usd).sum()
    }
}
