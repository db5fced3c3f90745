//! CLI entrypoint for panel-review
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use panel_application::{
    FanoutEvents, NoopEvents, QueueConfig, ReviewEventSink, RunReviewUseCase, WorkflowQueue,
    WorkflowWorker,
};
use panel_domain::{Complexity, ReviewState, Specialty, TaskMetadata, WorkflowRequest};
use panel_infrastructure::{
    BuiltinProvider, ConfigLoader, FileConfig, FileMemory, HeuristicReasoner, InMemoryQueueStore,
    InMemoryTtlCache, JsonlEventSink, MockCiRunner, ToolRegistry,
};
use panel_presentation::{Cli, ConsoleEvents, ConsoleFormatter, OutputFormat};
use std::io::Read;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting panel-review");

    // Load configuration
    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow::anyhow!("loading configuration: {}", e))?
    };
    let issues = file_config.validate();
    if !issues.is_empty() {
        bail!("invalid configuration:\n  {}", issues.join("\n  "));
    }

    // Read the diff
    let diff = if cli.diff.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading diff from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(&cli.diff)
            .with_context(|| format!("reading diff from {}", cli.diff.display()))?
    };

    let changed_files = if cli.files.is_empty() {
        changed_files_from_diff(&diff)
    } else {
        cli.files.clone()
    };

    let task = TaskMetadata::new(cli.task_id, cli.url.clone(), cli.title.clone())
        .with_branches(cli.branch.clone(), cli.base_branch.clone())
        .with_complexity(Complexity::parse_lossy(&cli.complexity));

    // === Dependency Injection ===
    let mut orchestrator_config = file_config.orchestrator_config()?;
    if !cli.specialties.is_empty() {
        let roster = cli
            .specialties
            .iter()
            .map(|tag| Specialty::parse(tag))
            .collect::<Result<Vec<_>, _>>()?;
        orchestrator_config = orchestrator_config.with_roster(roster);
    }
    let context_config = file_config.context_config()?;

    let mut registry = ToolRegistry::new().register(BuiltinProvider::new());
    registry
        .discover()
        .await
        .map_err(|e| anyhow::anyhow!("tool discovery: {}", e))?;

    let memory = Arc::new(FileMemory::new(".", &file_config.memory.history_path));
    let cache = Arc::new(InMemoryTtlCache::new());
    let events = build_events(&cli, &file_config);

    let use_case = RunReviewUseCase::new(
        Arc::new(HeuristicReasoner::new()),
        Arc::new(registry),
        memory,
        cache,
        Arc::clone(&events),
    )
    .with_config(orchestrator_config)
    .with_context_config(context_config);

    let state = ReviewState::new(task, diff, changed_files);
    let state = use_case.execute(state).await;

    // Optional CI follow-up through the deduplicating queue
    if cli.run_ci {
        run_ci(&state, file_config.queue_config(), &file_config, events).await?;
    }

    // Output results
    let output = match cli.output {
        OutputFormat::Full => ConsoleFormatter::format(&state),
        OutputFormat::Summary => ConsoleFormatter::format_summary(&state),
        OutputFormat::Json => ConsoleFormatter::format_json(&state),
    };
    println!("{}", output);

    Ok(())
}

/// Build the event sink stack: console unless quiet, JSONL if configured.
fn build_events(cli: &Cli, config: &FileConfig) -> Arc<dyn ReviewEventSink> {
    let mut sinks: Vec<Arc<dyn ReviewEventSink>> = Vec::new();

    if !cli.quiet {
        sinks.push(Arc::new(ConsoleEvents::new()));
    }
    if let Some(path) = &config.events.jsonl_path
        && let Some(sink) = JsonlEventSink::new(path)
    {
        sinks.push(Arc::new(sink));
    }

    match sinks.len() {
        0 => Arc::new(NoopEvents),
        1 => sinks.remove(0),
        _ => Arc::new(FanoutEvents::new(sinks)),
    }
}

/// Trigger one deduplicated CI run for the reviewed task and wait for it.
async fn run_ci(
    state: &ReviewState,
    queue_config: QueueConfig,
    file_config: &FileConfig,
    events: Arc<dyn ReviewEventSink>,
) -> Result<()> {
    let repo = state
        .task
        .repo_slug()
        .unwrap_or_else(|| "unknown/repo".to_string());
    let branch = if state.task.branch.is_empty() {
        state.task.base_branch.clone()
    } else {
        state.task.branch.clone()
    };

    let store = Arc::new(InMemoryQueueStore::new());
    let queue = WorkflowQueue::new(store, queue_config.clone(), Arc::clone(&events));
    let worker = WorkflowWorker::new(
        queue.clone(),
        Arc::new(MockCiRunner::new()),
        file_config.ci_config(),
        events,
    );
    let shutdown = worker.shutdown_token();
    let worker_handle = worker.spawn();

    let request = WorkflowRequest::run_ci("panel-review", &repo, state.task.id, &branch);
    let id = queue.enqueue(request).await?;
    let result = queue
        .wait_for_result(&id, queue_config.processing_timeout)
        .await?;

    info!(id = %id, "CI run finished");
    println!(
        "CI result: tests_passed={}",
        result["tests_passed"].as_bool().unwrap_or(false)
    );

    shutdown.cancel();
    let _ = worker_handle.await;
    Ok(())
}

/// Changed file paths from `+++ b/...` headers of a unified diff.
fn changed_files_from_diff(diff: &str) -> Vec<String> {
    let mut files: Vec<String> = diff
        .lines()
        .filter_map(|line| line.strip_prefix("+++ "))
        .map(|path| path.strip_prefix("b/").unwrap_or(path).to_string())
        .filter(|path| path != "/dev/null")
        .collect();
    files.dedup();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changed_files_from_diff() {
        let diff = "\
diff --git a/src/auth.rs b/src/auth.rs
--- a/src/auth.rs
+++ b/src/auth.rs
@@ -1 +1,2 @@
+use sha2::Sha256;
diff --git a/src/gone.rs b/src/gone.rs
--- a/src/gone.rs
+++ /dev/null
";
        assert_eq!(changed_files_from_diff(diff), vec!["src/auth.rs"]);
    }

    #[test]
    fn test_changed_files_empty_for_plain_text() {
        assert!(changed_files_from_diff("not a diff at all").is_empty());
    }
}
