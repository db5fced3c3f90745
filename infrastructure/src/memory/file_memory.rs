//! File-backed review memory.
//!
//! Conventions come from repository documentation files (first KiB of
//! each); similar tasks come from a JSONL history file, ranked by
//! changed-file overlap with the current task. Completed runs are
//! appended to the same history so the next run can find them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use panel_application::{MemoryError, MemoryPort};
use panel_domain::{Complexity, ReviewState, SimilarTask, TaskMetadata};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Files probed for repository conventions, in order.
const CONVENTION_FILES: [&str; 3] = [".github/CONTRIBUTING.md", "AGENTS.md", "CONTRIBUTING.md"];

/// Bytes read from each convention file.
const CONVENTION_READ_LIMIT: usize = 1024;

/// Similar tasks returned per lookup.
const SIMILAR_TASK_LIMIT: usize = 3;

/// One line of the review history file.
#[derive(Debug, Serialize, Deserialize)]
struct HistoryEntry {
    task_id: u64,
    title: String,
    complexity: Complexity,
    outcome: String,
    changed_files: Vec<String>,
    completed_at: Option<DateTime<Utc>>,
}

/// File-backed [`MemoryPort`] implementation.
pub struct FileMemory {
    /// Repository root probed for convention files
    repo_root: PathBuf,
    /// JSONL file holding one entry per completed run
    history_path: PathBuf,
    /// Baseline conventions prepended to anything found on disk
    baseline: Vec<String>,
}

impl FileMemory {
    pub fn new(repo_root: impl Into<PathBuf>, history_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            history_path: history_path.into(),
            baseline: vec![
                "Follow existing code style patterns".to_string(),
                "Document public APIs".to_string(),
            ],
        }
    }

    pub fn with_baseline(mut self, baseline: Vec<String>) -> Self {
        self.baseline = baseline;
        self
    }

    fn read_prefix(path: &Path) -> Option<String> {
        let mut file = std::fs::File::open(path).ok()?;
        let mut buffer = vec![0u8; CONVENTION_READ_LIMIT];
        let read = file.read(&mut buffer).ok()?;
        buffer.truncate(read);
        Some(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn load_history(&self) -> Result<Vec<HistoryEntry>, MemoryError> {
        let content = match std::fs::read_to_string(&self.history_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(MemoryError::Storage(e.to_string())),
        };

        let mut entries = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<HistoryEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    // One bad line must not poison the whole history
                    warn!(error = %e, "Skipping corrupt history line");
                }
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl MemoryPort for FileMemory {
    async fn conventions(&self, _task: &TaskMetadata) -> Result<Vec<String>, MemoryError> {
        let mut conventions = self.baseline.clone();

        for name in CONVENTION_FILES {
            let path = self.repo_root.join(name);
            if let Some(content) = Self::read_prefix(&path) {
                debug!(file = name, "Loaded conventions file");
                conventions.push(format!(
                    "From {}: {}",
                    name,
                    panel_domain::truncate(content.trim(), 200)
                ));
            }
        }

        Ok(conventions)
    }

    async fn similar_tasks(
        &self,
        task: &TaskMetadata,
        changed_files: &[String],
    ) -> Result<Vec<SimilarTask>, MemoryError> {
        let current: HashSet<&str> = changed_files.iter().map(String::as_str).collect();

        let mut scored: Vec<SimilarTask> = self
            .load_history()?
            .into_iter()
            .filter(|entry| entry.task_id != task.id)
            .filter_map(|entry| {
                let overlap = entry
                    .changed_files
                    .iter()
                    .filter(|f| current.contains(f.as_str()))
                    .count();
                if overlap == 0 {
                    return None;
                }
                Some(SimilarTask {
                    id: entry.task_id,
                    title: entry.title,
                    complexity: entry.complexity,
                    outcome: entry.outcome,
                    overlap,
                })
            })
            .collect();

        scored.sort_by(|a, b| b.overlap.cmp(&a.overlap).then(b.id.cmp(&a.id)));
        scored.truncate(SIMILAR_TASK_LIMIT);
        Ok(scored)
    }

    async fn record_outcome(&self, state: &ReviewState) -> Result<(), MemoryError> {
        let outcome = state
            .aggregate
            .as_ref()
            .map(|a| a.outcome.to_string())
            .unwrap_or_else(|| "NO_REVIEW".to_string());

        let entry = HistoryEntry {
            task_id: state.task.id,
            title: state.task.title.clone(),
            complexity: state.task.complexity,
            outcome,
            changed_files: state.changed_files.clone(),
            completed_at: state.completed_at,
        };

        let line = serde_json::to_string(&entry)
            .map_err(|e| MemoryError::Corrupt(e.to_string()))?;

        if let Some(parent) = self.history_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MemoryError::Storage(e.to_string()))?;
        }

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.history_path)
            .map_err(|e| MemoryError::Storage(e.to_string()))?;
        writeln!(file, "{}", line).map_err(|e| MemoryError::Storage(e.to_string()))?;
        Ok(())
    }
}
