//! Run Review use case — the top-level orchestration state machine.
//!
//! One run walks a strictly linear sequence:
//!
//! ```text
//! load_memory → plan → run_specialists → collect → done
//! ```
//!
//! Each step returns a [`StateUpdate`] that is merged into the
//! [`ReviewState`] on the orchestrating task, so no two steps ever
//! mutate shared state concurrently. Specialists run concurrently under
//! a semaphore cap and a per-specialist wall-clock timeout; a failed or
//! timed-out specialist yields a degraded verdict and never disturbs
//! its siblings — the final report always carries one verdict per
//! planned specialty.

use crate::config::{ContextConfig, OrchestratorConfig};
use crate::ports::context_cache::ContextCachePort;
use crate::ports::events::ReviewEventSink;
use crate::ports::memory::MemoryPort;
use crate::ports::reasoning::ReasoningPort;
use crate::ports::tool_executor::ToolExecutorPort;
use crate::use_cases::resolve_context::ContextResolver;
use crate::use_cases::run_specialist::{RunContext, SpecialistRunner};
use chrono::Utc;
use panel_domain::{
    AggregateReport, Complexity, ReviewState, Specialty, StateUpdate, Verdict, aggregate_verdicts,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Use case for running a full panel review
pub struct RunReviewUseCase<R, T, M>
where
    R: ReasoningPort + 'static,
    T: ToolExecutorPort + 'static,
    M: MemoryPort + 'static,
{
    reasoning: Arc<R>,
    tools: Arc<T>,
    memory: Arc<M>,
    cache: Arc<dyn ContextCachePort>,
    events: Arc<dyn ReviewEventSink>,
    config: OrchestratorConfig,
    context_config: ContextConfig,
}

impl<R, T, M> RunReviewUseCase<R, T, M>
where
    R: ReasoningPort + 'static,
    T: ToolExecutorPort + 'static,
    M: MemoryPort + 'static,
{
    pub fn new(
        reasoning: Arc<R>,
        tools: Arc<T>,
        memory: Arc<M>,
        cache: Arc<dyn ContextCachePort>,
        events: Arc<dyn ReviewEventSink>,
    ) -> Self {
        Self {
            reasoning,
            tools,
            memory,
            cache,
            events,
            config: OrchestratorConfig::default(),
            context_config: ContextConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_context_config(mut self, context_config: ContextConfig) -> Self {
        self.context_config = context_config;
        self
    }

    /// Execute the run to completion.
    ///
    /// Every step degrades internally; retrying a whole failed run is a
    /// caller concern, which is why this returns the final state rather
    /// than a `Result`.
    pub async fn execute(&self, mut state: ReviewState) -> ReviewState {
        info!(task = state.task.id, title = %state.task.title, "Starting panel review");
        self.events.on_run_started(&state.task);

        let update = self.load_memory(&state).await;
        state.apply(update);

        let update = self.plan(&state);
        state.apply(update);

        let update = self.run_specialists(&state).await;
        state.apply(update);

        let update = self.collect(&state);
        state.apply(update);

        // Remember the finished run for future similar-task lookups
        if let Err(error) = self.memory.record_outcome(&state).await {
            warn!(error = %error, "Recording run outcome failed");
        }

        if let Some(aggregate) = &state.aggregate {
            self.events.on_run_completed(aggregate.outcome);
        }
        info!(task = state.task.id, "Panel review done");
        state
    }

    /// Populate conventions and similar-task hints when absent.
    ///
    /// Caller-supplied values are never overwritten, and memory backend
    /// failures degrade to empty hints — this step cannot fail the run.
    async fn load_memory(&self, state: &ReviewState) -> StateUpdate {
        let mut update = StateUpdate::new();

        if state.conventions.is_empty() {
            match self.memory.conventions(&state.task).await {
                Ok(conventions) => update.conventions = Some(conventions),
                Err(error) => {
                    warn!(error = %error, "Loading conventions failed, continuing without");
                    update.conventions = Some(Vec::new());
                }
            }
        }

        if state.similar_tasks.is_empty() {
            match self
                .memory
                .similar_tasks(&state.task, &state.changed_files)
                .await
            {
                Ok(similar) => update.similar_tasks = Some(similar),
                Err(error) => {
                    warn!(error = %error, "Loading similar tasks failed, continuing without");
                    update.similar_tasks = Some(Vec::new());
                }
            }
        }

        let conventions = update
            .conventions
            .as_ref()
            .map_or(state.conventions.len(), Vec::len);
        let similar = update
            .similar_tasks
            .as_ref()
            .map_or(state.similar_tasks.len(), Vec::len);
        info!(conventions, similar, "Memory loaded");
        self.events.on_memory_loaded(conventions, similar);

        update.with_note("memory", serde_json::json!({ "loaded": true }))
    }

    /// Produce the specialist roster.
    ///
    /// Deterministic: a configured roster wins, otherwise complexity
    /// picks a fixed set.
    fn plan(&self, state: &ReviewState) -> StateUpdate {
        let roster = match &self.config.roster {
            Some(roster) => roster.clone(),
            None => Self::roster_for_complexity(state.task.complexity),
        };

        info!(roster = ?roster, "Planned specialist roster");
        self.events.on_plan(&roster);

        StateUpdate {
            roster: Some(roster),
            ..Default::default()
        }
        .with_note("plan", serde_json::json!({ "source": "policy" }))
    }

    fn roster_for_complexity(complexity: Complexity) -> Vec<Specialty> {
        match complexity {
            Complexity::Simple => vec![Specialty::Alignment, Specialty::Testing],
            Complexity::Medium => vec![
                Specialty::Alignment,
                Specialty::Testing,
                Specialty::Security,
            ],
            Complexity::Complex => vec![
                Specialty::Alignment,
                Specialty::Testing,
                Specialty::Security,
                Specialty::Dependencies,
            ],
        }
    }

    /// Run every planned specialist concurrently, isolated and bounded.
    async fn run_specialists(&self, state: &ReviewState) -> StateUpdate {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let resolver = Arc::new(ContextResolver::new(
            Arc::clone(&self.tools),
            Arc::clone(&self.cache),
            self.context_config.clone(),
        ));

        let mut join_set = JoinSet::new();

        for &specialty in &state.roster {
            let semaphore = Arc::clone(&semaphore);
            let resolver = Arc::clone(&resolver);
            let reasoning = Arc::clone(&self.reasoning);
            let events = Arc::clone(&self.events);
            let profile = self.config.profile(specialty);
            let timeout = self.config.specialist_timeout;
            let fail_fast = self.context_config.fail_fast;

            let task = state.task.clone();
            let diff = state.diff.clone();
            let changed_files = state.changed_files.clone();
            let conventions = state.conventions.clone();

            join_set.spawn(async move {
                // Queue for a permit; the timeout covers execution only
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(closed) => {
                        return (specialty, Verdict::errored(specialty, closed), 0.0);
                    }
                };
                events.on_specialist_started(specialty);
                let started = Instant::now();

                let runner =
                    SpecialistRunner::new(&*reasoning, &*resolver, &*events, specialty, profile)
                        .with_fail_fast(fail_fast);
                let run = RunContext {
                    task: &task,
                    diff: &diff,
                    changed_files: &changed_files,
                    conventions: &conventions,
                };

                let verdict = match tokio::time::timeout(timeout, runner.run(run)).await {
                    Ok(Ok(verdict)) => verdict,
                    Ok(Err(error)) => {
                        warn!(specialty = %specialty, error = %error, "Specialist failed");
                        Verdict::errored(specialty, error)
                    }
                    Err(_elapsed) => {
                        warn!(specialty = %specialty, "Specialist timed out");
                        Verdict::timed_out(specialty, timeout.as_secs())
                    }
                };

                let seconds = started.elapsed().as_secs_f64();
                events.on_specialist_completed(specialty, verdict.outcome, seconds);
                (specialty, verdict, seconds)
            });
        }

        let mut update = StateUpdate::new();
        let mut notes = BTreeMap::new();

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((specialty, verdict, seconds)) => {
                    update.tokens_used += verdict
                        .context_gathered
                        .iter()
                        .map(|r| r.tokens as u64)
                        .sum::<u64>();
                    update.cost_usd += verdict
                        .context_gathered
                        .iter()
                        .map(|r| r.cost_usd)
                        .sum::<f64>();
                    notes.insert(
                        format!("specialist_{}", specialty),
                        serde_json::json!({
                            "outcome": verdict.outcome.as_str(),
                            "duration_ms": (seconds * 1000.0) as u64,
                        }),
                    );
                    update
                        .execution_times
                        .insert(specialty.to_string(), seconds);
                    update.specialists_spawned.push(specialty);
                    update.verdicts.push(verdict);
                }
                Err(join_error) => {
                    // A panicked specialist still must not lose its slot;
                    // the specialty is recovered during collect if absent.
                    warn!(error = %join_error, "Specialist task panicked");
                }
            }
        }

        update.notes = notes;
        update
    }

    /// Aggregate verdicts and close out the run.
    fn collect(&self, state: &ReviewState) -> StateUpdate {
        // A lost slot (task panic) is backfilled so the report always
        // has one entry per planned specialty
        let mut backfill = Vec::new();
        for &specialty in &state.roster {
            if !state.verdicts.iter().any(|v| v.specialty == specialty) {
                backfill.push(Verdict::errored(specialty, "specialist task aborted"));
            }
        }

        let all: Vec<Verdict> = state.verdicts.iter().cloned().chain(backfill.clone()).collect();
        let outcome = aggregate_verdicts(&all);

        let aggregate = AggregateReport {
            total_specialists: all.len(),
            specialties: all.iter().map(|v| v.specialty).collect(),
            outcome,
            summary: format!("Completed review with {} specialists", all.len()),
        };

        info!(outcome = %outcome, specialists = all.len(), "Aggregated verdicts");

        StateUpdate {
            verdicts: backfill,
            aggregate: Some(aggregate),
            completed_at: Some(Utc::now()),
            ..Default::default()
        }
        .with_note("collect", serde_json::json!({ "outcome": outcome.as_str() }))
    }
}
