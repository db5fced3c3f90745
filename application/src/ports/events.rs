//! Lifecycle event sink port.
//!
//! The orchestrator and the workflow worker emit discrete lifecycle
//! events through this trait. Implementations live outside the
//! application layer (console reporter, JSONL sink); transport and
//! schema are their concern.

use panel_domain::{
    ContextType, OverallOutcome, RequestKind, ResolutionSource, Specialty, TaskMetadata,
    VerdictOutcome,
};

/// Callback for review and queue lifecycle events.
///
/// All methods default to no-ops so sinks implement only what they
/// care about.
pub trait ReviewEventSink: Send + Sync {
    // ==================== Review run ====================

    fn on_run_started(&self, _task: &TaskMetadata) {}

    fn on_memory_loaded(&self, _conventions: usize, _similar_tasks: usize) {}

    fn on_plan(&self, _roster: &[Specialty]) {}

    fn on_specialist_started(&self, _specialty: Specialty) {}

    fn on_specialist_completed(
        &self,
        _specialty: Specialty,
        _outcome: VerdictOutcome,
        _seconds: f64,
    ) {
    }

    fn on_context_resolved(
        &self,
        _specialty: Specialty,
        _context_type: ContextType,
        _source: ResolutionSource,
        _cache_hit: bool,
        _success: bool,
    ) {
    }

    fn on_run_completed(&self, _outcome: OverallOutcome) {}

    // ==================== Workflow queue ====================

    fn on_request_enqueued(&self, _id: &str, _kind: RequestKind, _deduplicated: bool) {}

    fn on_request_started(&self, _id: &str, _kind: RequestKind) {}

    fn on_request_completed(&self, _id: &str, _kind: RequestKind) {}

    fn on_request_failed(&self, _id: &str, _kind: RequestKind, _error: &str) {}
}

/// No-op sink for when event reporting is not needed
pub struct NoopEvents;

impl ReviewEventSink for NoopEvents {}

/// Fans every event out to multiple sinks (e.g. console + JSONL file).
pub struct FanoutEvents {
    sinks: Vec<std::sync::Arc<dyn ReviewEventSink>>,
}

impl FanoutEvents {
    pub fn new(sinks: Vec<std::sync::Arc<dyn ReviewEventSink>>) -> Self {
        Self { sinks }
    }
}

/// Delegate a method call to every inner sink.
macro_rules! fanout {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        for sink in &$self.sinks {
            sink.$method($($arg),*);
        }
    };
}

impl ReviewEventSink for FanoutEvents {
    fn on_run_started(&self, task: &TaskMetadata) {
        fanout!(self, on_run_started, task);
    }

    fn on_memory_loaded(&self, conventions: usize, similar_tasks: usize) {
        fanout!(self, on_memory_loaded, conventions, similar_tasks);
    }

    fn on_plan(&self, roster: &[Specialty]) {
        fanout!(self, on_plan, roster);
    }

    fn on_specialist_started(&self, specialty: Specialty) {
        fanout!(self, on_specialist_started, specialty);
    }

    fn on_specialist_completed(&self, specialty: Specialty, outcome: VerdictOutcome, seconds: f64) {
        fanout!(self, on_specialist_completed, specialty, outcome, seconds);
    }

    fn on_context_resolved(
        &self,
        specialty: Specialty,
        context_type: ContextType,
        source: ResolutionSource,
        cache_hit: bool,
        success: bool,
    ) {
        fanout!(
            self,
            on_context_resolved,
            specialty,
            context_type,
            source,
            cache_hit,
            success
        );
    }

    fn on_run_completed(&self, outcome: OverallOutcome) {
        fanout!(self, on_run_completed, outcome);
    }

    fn on_request_enqueued(&self, id: &str, kind: RequestKind, deduplicated: bool) {
        fanout!(self, on_request_enqueued, id, kind, deduplicated);
    }

    fn on_request_started(&self, id: &str, kind: RequestKind) {
        fanout!(self, on_request_started, id, kind);
    }

    fn on_request_completed(&self, id: &str, kind: RequestKind) {
        fanout!(self, on_request_completed, id, kind);
    }

    fn on_request_failed(&self, id: &str, kind: RequestKind, error: &str) {
        fanout!(self, on_request_failed, id, kind, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink {
        calls: AtomicUsize,
    }

    impl ReviewEventSink for CountingSink {
        fn on_specialist_started(&self, _specialty: Specialty) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let a = Arc::new(CountingSink {
            calls: AtomicUsize::new(0),
        });
        let b = Arc::new(CountingSink {
            calls: AtomicUsize::new(0),
        });
        let fanout = FanoutEvents::new(vec![a.clone(), b.clone()]);

        fanout.on_specialist_started(Specialty::Alignment);
        fanout.on_specialist_started(Specialty::Testing);

        assert_eq!(a.calls.load(Ordering::SeqCst), 2);
        assert_eq!(b.calls.load(Ordering::SeqCst), 2);
    }
}
