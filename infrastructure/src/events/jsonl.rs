//! JSONL file sink for lifecycle events.
//!
//! Each event becomes one JSON line with a `type` field and RFC3339
//! `timestamp`, appended through a buffered writer. Write failures are
//! swallowed — observability must never take a run down.

use panel_application::ReviewEventSink;
use panel_domain::{
    ContextType, OverallOutcome, RequestKind, ResolutionSource, Specialty, TaskMetadata,
    VerdictOutcome,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Lifecycle event sink writing one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes after every event
/// (the file is append-only) and on `Drop`.
pub struct JsonlEventSink {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlEventSink {
    /// Create a sink writing to the given path.
    ///
    /// Creates the file (and parent directories) if they don't exist.
    /// Returns `None` if the file cannot be created.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create event log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match File::create(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not create event log file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn emit(&self, event_type: &str, mut payload: serde_json::Value) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        if let serde_json::Value::Object(map) = &mut payload {
            map.insert("type".to_string(), serde_json::json!(event_type));
            map.insert("timestamp".to_string(), serde_json::json!(timestamp));
        }

        let Ok(line) = serde_json::to_string(&payload) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlEventSink {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

impl ReviewEventSink for JsonlEventSink {
    fn on_run_started(&self, task: &TaskMetadata) {
        self.emit(
            "run_started",
            serde_json::json!({ "task": task.id, "title": task.title }),
        );
    }

    fn on_memory_loaded(&self, conventions: usize, similar_tasks: usize) {
        self.emit(
            "memory_loaded",
            serde_json::json!({ "conventions": conventions, "similar_tasks": similar_tasks }),
        );
    }

    fn on_plan(&self, roster: &[Specialty]) {
        let roster: Vec<&str> = roster.iter().map(Specialty::as_str).collect();
        self.emit("plan", serde_json::json!({ "roster": roster }));
    }

    fn on_specialist_started(&self, specialty: Specialty) {
        self.emit(
            "specialist_started",
            serde_json::json!({ "specialty": specialty.as_str() }),
        );
    }

    fn on_specialist_completed(&self, specialty: Specialty, outcome: VerdictOutcome, seconds: f64) {
        self.emit(
            "specialist_completed",
            serde_json::json!({
                "specialty": specialty.as_str(),
                "outcome": outcome.as_str(),
                "seconds": seconds,
            }),
        );
    }

    fn on_context_resolved(
        &self,
        specialty: Specialty,
        context_type: ContextType,
        source: ResolutionSource,
        cache_hit: bool,
        success: bool,
    ) {
        self.emit(
            "context_resolved",
            serde_json::json!({
                "specialty": specialty.as_str(),
                "context_type": context_type.as_str(),
                "source": source.as_str(),
                "cache_hit": cache_hit,
                "success": success,
            }),
        );
    }

    fn on_run_completed(&self, outcome: OverallOutcome) {
        self.emit(
            "run_completed",
            serde_json::json!({ "outcome": outcome.as_str() }),
        );
    }

    fn on_request_enqueued(&self, id: &str, kind: RequestKind, deduplicated: bool) {
        self.emit(
            "request_enqueued",
            serde_json::json!({
                "id": id,
                "kind": kind.as_str(),
                "deduplicated": deduplicated,
            }),
        );
    }

    fn on_request_started(&self, id: &str, kind: RequestKind) {
        self.emit(
            "request_started",
            serde_json::json!({ "id": id, "kind": kind.as_str() }),
        );
    }

    fn on_request_completed(&self, id: &str, kind: RequestKind) {
        self.emit(
            "request_completed",
            serde_json::json!({ "id": id, "kind": kind.as_str() }),
        );
    }

    fn on_request_failed(&self, id: &str, kind: RequestKind, error: &str) {
        self.emit(
            "request_failed",
            serde_json::json!({ "id": id, "kind": kind.as_str(), "error": error }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_written_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let sink = JsonlEventSink::new(&path).unwrap();

        let task = TaskMetadata::new(5, "https://github.com/acme/widgets/pull/5", "Test");
        sink.on_run_started(&task);
        sink.on_plan(&[Specialty::Alignment, Specialty::Security]);
        sink.on_specialist_completed(Specialty::Alignment, VerdictOutcome::Pass, 1.25);
        sink.on_run_completed(OverallOutcome::Pass);
        drop(sink);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);

        for line in &lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value["type"].is_string());
            assert!(value["timestamp"].is_string());
        }

        let plan: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(plan["type"], "plan");
        assert_eq!(plan["roster"][1], "security");
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/events.jsonl");
        let sink = JsonlEventSink::new(&path);
        assert!(sink.is_some());
        assert!(path.exists());
    }

    #[test]
    fn test_queue_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let sink = JsonlEventSink::new(&path).unwrap();

        sink.on_request_enqueued("abc123", RequestKind::RunCi, false);
        sink.on_request_failed("abc123", RequestKind::RunCi, "no workflow");
        drop(sink);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("request_enqueued"));
        assert!(content.contains("no workflow"));
        assert!(content.contains("run_ci"));
    }
}
