//! Console progress reporting for panel execution.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use panel_application::ReviewEventSink;
use panel_domain::{
    ContextType, OverallOutcome, RequestKind, ResolutionSource, Specialty, TaskMetadata,
    VerdictOutcome,
};
use std::sync::Mutex;

/// Reports review progress with a specialist progress bar.
pub struct ConsoleEvents {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleEvents {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }
}

impl Default for ConsoleEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewEventSink for ConsoleEvents {
    fn on_run_started(&self, task: &TaskMetadata) {
        println!(
            "{} #{} {}",
            "Reviewing".cyan().bold(),
            task.id,
            task.title
        );
    }

    fn on_memory_loaded(&self, conventions: usize, similar_tasks: usize) {
        println!(
            "  loaded {} conventions, {} similar tasks",
            conventions, similar_tasks
        );
    }

    fn on_plan(&self, roster: &[Specialty]) {
        let names: Vec<&str> = roster.iter().map(Specialty::as_str).collect();
        println!("  panel: {}", names.join(", "));

        let bar = ProgressBar::new(roster.len() as u64);
        bar.set_style(Self::bar_style());
        bar.set_prefix("Specialists");
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn on_specialist_completed(&self, specialty: Specialty, outcome: VerdictOutcome, seconds: f64) {
        if let Ok(slot) = self.bar.lock()
            && let Some(bar) = slot.as_ref()
        {
            let status = match outcome {
                VerdictOutcome::Pass => format!("{} {}", "v".green(), specialty),
                VerdictOutcome::Warn => format!("{} {}", "~".yellow(), specialty),
                _ => format!("{} {}", "x".red(), specialty),
            };
            bar.set_message(format!("{} ({:.1}s)", status, seconds));
            bar.inc(1);
        }
    }

    fn on_context_resolved(
        &self,
        _specialty: Specialty,
        context_type: ContextType,
        source: ResolutionSource,
        cache_hit: bool,
        success: bool,
    ) {
        if let Ok(slot) = self.bar.lock()
            && let Some(bar) = slot.as_ref()
        {
            let provenance = if cache_hit { "cache" } else { source.as_str() };
            let mark = if success { "+" } else { "-" };
            bar.println(format!("    {} {} via {}", mark, context_type, provenance));
        }
    }

    fn on_run_completed(&self, outcome: OverallOutcome) {
        if let Ok(mut slot) = self.bar.lock()
            && let Some(bar) = slot.take()
        {
            bar.finish_and_clear();
        }
        let painted = match outcome {
            OverallOutcome::Pass => outcome.to_string().green().bold(),
            OverallOutcome::NoReview => outcome.to_string().yellow().bold(),
            OverallOutcome::NeedsWork => outcome.to_string().red().bold(),
        };
        println!("{} {}", "Outcome:".bold(), painted);
    }

    fn on_request_enqueued(&self, id: &str, kind: RequestKind, deduplicated: bool) {
        let note = if deduplicated { " (deduplicated)" } else { "" };
        println!("  queued {} {}{}", kind, &id[..id.len().min(12)], note);
    }

    fn on_request_completed(&self, id: &str, kind: RequestKind) {
        println!("  {} {} completed", kind, &id[..id.len().min(12)]);
    }

    fn on_request_failed(&self, id: &str, kind: RequestKind, error: &str) {
        println!(
            "  {} {} {}: {}",
            kind,
            &id[..id.len().min(12)],
            "failed".red(),
            error
        );
    }
}
