//! Specialist execution: the bounded iterate-or-finalize loop.
//!
//! One specialist runs as an explicit finite state machine:
//!
//! ```text
//! Plan → GatherContext → Analyze → (GatherContext | Finalize) → Done
//! ```
//!
//! The back-edge from Analyze is taken iff the backend still needs
//! context AND the iteration counter is under the specialty's cap, so
//! the iteration bound holds by construction of [`next_phase`].
//!
//! Plan and analyze answers are parsed as JSON; malformed output
//! degrades the step (no requests / no new findings) and leaves a note
//! in the reasoning trace instead of failing the run.

use crate::ports::events::ReviewEventSink;
use crate::ports::reasoning::{AnalyzeInput, PlanInput, ReasoningPort};
use crate::ports::tool_executor::ToolExecutorPort;
use crate::use_cases::resolve_context::ContextResolver;
use panel_domain::{
    ContextRequest, Finding, FindingKind, Severity, SpecialistState, Specialty, SpecialtyProfile,
    TaskMetadata, Verdict, truncate,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that abort a single specialist (never its siblings)
#[derive(Error, Debug)]
pub enum SpecialistError {
    /// Fail-fast mode was requested and a context item failed
    #[error("Context gathering failed for {specialty}: {detail}")]
    ContextFailed { specialty: Specialty, detail: String },
}

/// Phases of the specialist state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialistPhase {
    Plan,
    GatherContext,
    Analyze,
    Finalize,
    Done,
}

/// Pure transition function of the specialist state machine.
///
/// The only conditional edge is Analyze → GatherContext, guarded by
/// `needs_more_context && iteration < max_iterations`; everything else
/// is linear.
pub fn next_phase(
    phase: SpecialistPhase,
    state: &SpecialistState,
    max_iterations: u32,
) -> SpecialistPhase {
    match phase {
        SpecialistPhase::Plan => SpecialistPhase::GatherContext,
        SpecialistPhase::GatherContext => SpecialistPhase::Analyze,
        SpecialistPhase::Analyze => {
            if state.needs_more_context && state.iteration < max_iterations {
                SpecialistPhase::GatherContext
            } else {
                SpecialistPhase::Finalize
            }
        }
        SpecialistPhase::Finalize | SpecialistPhase::Done => SpecialistPhase::Done,
    }
}

/// Read-only view of the run shared by every specialist.
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    pub task: &'a TaskMetadata,
    pub diff: &'a str,
    pub changed_files: &'a [String],
    pub conventions: &'a [String],
}

/// Runs one specialist to a verdict.
pub struct SpecialistRunner<'a, R: ReasoningPort, T: ToolExecutorPort> {
    reasoning: &'a R,
    resolver: &'a ContextResolver<T>,
    events: &'a dyn ReviewEventSink,
    specialty: Specialty,
    profile: SpecialtyProfile,
    fail_fast: bool,
}

impl<'a, R: ReasoningPort, T: ToolExecutorPort> SpecialistRunner<'a, R, T> {
    pub fn new(
        reasoning: &'a R,
        resolver: &'a ContextResolver<T>,
        events: &'a dyn ReviewEventSink,
        specialty: Specialty,
        profile: SpecialtyProfile,
    ) -> Self {
        Self {
            reasoning,
            resolver,
            events,
            specialty,
            profile,
            fail_fast: false,
        }
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Drive the state machine to a verdict.
    pub async fn run(&self, run: RunContext<'_>) -> Result<Verdict, SpecialistError> {
        let mut state = SpecialistState::new(self.specialty);
        let mut phase = SpecialistPhase::Plan;

        loop {
            match phase {
                SpecialistPhase::Plan => self.step_plan(&mut state, run).await,
                SpecialistPhase::GatherContext => self.step_gather(&mut state).await?,
                SpecialistPhase::Analyze => self.step_analyze(&mut state, run).await,
                SpecialistPhase::Finalize => {
                    return Ok(self.finalize(state));
                }
                SpecialistPhase::Done => unreachable!("Finalize returns before Done"),
            }
            phase = next_phase(phase, &state, self.profile.max_iterations());
        }
    }

    /// Ask the backend what context the first iteration needs.
    async fn step_plan(&self, state: &mut SpecialistState, run: RunContext<'_>) {
        let input = PlanInput {
            specialty: self.specialty,
            task: run.task,
            diff: run.diff,
            changed_files: run.changed_files,
            conventions: run.conventions,
            context_budget: self.profile.context_budget(),
        };

        match self.reasoning.plan(input).await {
            Ok(answer) => {
                let plan = parse_plan(&answer);
                state.note(plan.reasoning);
                state.pending_requests = plan.context_requests;
            }
            Err(error) => {
                warn!(specialty = %self.specialty, error = %error, "Planning failed");
                state.note(format!("planning failed: {}", error));
                state.pending_requests = Vec::new();
            }
        }
    }

    /// Resolve the pending requests, bounded by the context budget.
    async fn step_gather(&self, state: &mut SpecialistState) -> Result<(), SpecialistError> {
        let mut requests = std::mem::take(&mut state.pending_requests);
        if requests.len() > self.profile.context_budget() {
            debug!(
                specialty = %self.specialty,
                requested = requests.len(),
                budget = self.profile.context_budget(),
                "Truncating context requests to budget"
            );
            requests.truncate(self.profile.context_budget());
        }

        for request in requests {
            let resolved = self.resolver.resolve(state.iteration + 1, &request).await;
            self.events.on_context_resolved(
                self.specialty,
                request.context_type,
                resolved.record.source,
                resolved.cache_hit,
                resolved.record.is_usable(),
            );

            let failed = resolved.record.failed;
            let detail = resolved.record.payload.summary.clone();
            state.context.push(resolved.record);

            if failed && self.fail_fast {
                return Err(SpecialistError::ContextFailed {
                    specialty: self.specialty,
                    detail,
                });
            }
        }

        Ok(())
    }

    /// One analyze iteration over everything gathered so far.
    async fn step_analyze(&self, state: &mut SpecialistState, run: RunContext<'_>) {
        state.iteration += 1;

        let input = AnalyzeInput {
            specialty: self.specialty,
            task: run.task,
            diff: run.diff,
            context: &state.context,
            findings: &state.findings,
            trace: &state.trace,
            iteration: state.iteration,
            max_iterations: self.profile.max_iterations(),
        };

        match self.reasoning.analyze(input).await {
            Ok(answer) => {
                let analysis = parse_analysis(&answer);
                state.note(analysis.reasoning);
                state.needs_more_context = analysis.needs_more_context;
                state.pending_requests = analysis.context_requests;

                let base = state.findings.len();
                for (offset, draft) in analysis.findings.into_iter().enumerate() {
                    match draft.into_finding(self.specialty, state.iteration, base + offset) {
                        Some(finding) => state.findings.push(finding),
                        None => {
                            debug!(specialty = %self.specialty, "Dropped malformed finding")
                        }
                    }
                }
            }
            Err(error) => {
                warn!(specialty = %self.specialty, error = %error, "Analysis failed");
                state.note(format!("analysis failed: {}", error));
                state.needs_more_context = false;
                state.pending_requests = Vec::new();
            }
        }
    }

    fn finalize(&self, state: SpecialistState) -> Verdict {
        Verdict::from_findings(
            self.specialty,
            state.findings,
            state.context,
            state.iteration.max(1),
            self.profile.max_iterations(),
        )
    }
}

// ==================== Backend answer parsing ====================

/// Parsed plan answer; defaults cover every missing field.
#[derive(Debug, Default, Deserialize)]
struct PlanAnswer {
    #[serde(default)]
    context_requests: Vec<ContextRequest>,
    #[serde(default)]
    reasoning: String,
}

/// Parsed analyze answer.
#[derive(Debug, Default, Deserialize)]
struct AnalysisAnswer {
    #[serde(default)]
    findings: Vec<FindingDraft>,
    #[serde(default)]
    needs_more_context: bool,
    #[serde(default)]
    reasoning: String,
    /// Requests for the next iteration, if another one happens
    #[serde(default)]
    context_requests: Vec<ContextRequest>,
}

/// Finding as the backend reports it; validated before adoption.
#[derive(Debug, Deserialize)]
struct FindingDraft {
    #[serde(default)]
    severity: String,
    #[serde(default, alias = "type")]
    kind: String,
    #[serde(default)]
    file: String,
    #[serde(default = "default_line")]
    line: u32,
    #[serde(default)]
    description: String,
    #[serde(default)]
    suggestion: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

fn default_line() -> u32 {
    1
}

impl FindingDraft {
    /// Validate and adopt a draft; `None` drops it silently.
    fn into_finding(self, specialty: Specialty, iteration: u32, index: usize) -> Option<Finding> {
        let severity = match self.severity.as_str() {
            "high" => Severity::High,
            "medium" => Severity::Medium,
            _ => Severity::Low,
        };
        let kind = match self.kind.as_str() {
            "type_error" => FindingKind::TypeError,
            "security" => FindingKind::Security,
            "performance" => FindingKind::Performance,
            "style" => FindingKind::Style,
            "architecture" => FindingKind::Architecture,
            "dependency" => FindingKind::Dependency,
            "testing" => FindingKind::Testing,
            _ => FindingKind::Bug,
        };

        let mut finding = Finding::new(
            format!("{}-{}", specialty, index + 1),
            iteration,
            severity,
            kind,
            self.file,
            self.line,
            self.description,
        )
        .ok()?;
        finding.suggestion = self.suggestion;
        finding.snippet = self.snippet;
        Some(finding)
    }
}

fn parse_plan(answer: &str) -> PlanAnswer {
    match extract_json(answer).and_then(|v| serde_json::from_value(v).ok()) {
        Some(plan) => plan,
        None => PlanAnswer {
            context_requests: Vec::new(),
            reasoning: format!("unparseable plan answer: {}", truncate(answer, 120)),
        },
    }
}

fn parse_analysis(answer: &str) -> AnalysisAnswer {
    match extract_json(answer).and_then(|v| serde_json::from_value(v).ok()) {
        Some(analysis) => analysis,
        None => AnalysisAnswer {
            reasoning: format!("unparseable analysis answer: {}", truncate(answer, 120)),
            ..Default::default()
        },
    }
}

/// Extract a JSON object from free-form backend text.
///
/// Tries a fenced ```json block first, then the outermost brace pair.
fn extract_json(text: &str) -> Option<serde_json::Value> {
    let candidate = if let Some(start) = text.find("```json") {
        let body = &text[start + 7..];
        let end = body.find("```")?;
        body[..end].trim()
    } else {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        if end <= start {
            return None;
        }
        text[start..=end].trim()
    };
    serde_json::from_str(candidate).ok()
}
