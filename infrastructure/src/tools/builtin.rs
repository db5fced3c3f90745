//! Built-in tool provider.
//!
//! Always-available offline tools backing the context resolver's
//! fallback chain:
//!
//! - `search_files` (`file-search`): regex search over target files or
//!   a directory walk
//! - `read_file` (`file-read`): bounded file read
//! - `git_log` (`git-history`): recent commits touching a path, via the
//!   git CLI
//!
//! Richer providers (indexed search, language servers) register at
//! higher priority and override these at discovery time.

use async_trait::async_trait;
use panel_domain::{
    ProviderError, ToolCall, ToolDescriptor, ToolError, ToolProvider, ToolResult,
};
use std::path::PathBuf;
use std::time::Instant;

/// Priority for the built-in provider (lowest, used as fallback)
pub const BUILTIN_PRIORITY: i32 = -100;

const SEARCH_FILES: &str = "search_files";
const READ_FILE: &str = "read_file";
const GIT_LOG: &str = "git_log";

/// Maximum matches reported per search
const MAX_MATCHES: usize = 200;

/// Maximum bytes read from a single file
const MAX_READ_BYTES: usize = 64 * 1024;

/// Commits reported per git_log call
const GIT_LOG_LIMIT: u32 = 20;

/// Built-in offline tool provider.
#[derive(Debug, Clone)]
pub struct BuiltinProvider {
    /// Directory searches and git commands run against
    root: PathBuf,
}

impl BuiltinProvider {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("."),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    fn descriptors() -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new(
                SEARCH_FILES,
                "file-search",
                "Regex search over target files or the repository tree",
            )
            .with_keywords(["search", "grep"]),
            ToolDescriptor::new(READ_FILE, "file-read", "Read the contents of one file")
                .with_keywords(["read", "file"]),
            ToolDescriptor::new(
                GIT_LOG,
                "git-history",
                "Recent commits touching a path (git CLI)",
            )
            .with_keywords(["log", "history", "blame"]),
        ]
    }

    async fn execute_internal(&self, call: &ToolCall) -> Result<ToolResult, ProviderError> {
        match call.tool_name.as_str() {
            SEARCH_FILES => Ok(self.execute_search(call)),
            READ_FILE => Ok(self.execute_read(call)),
            GIT_LOG => Ok(self.execute_git_log(call).await),
            other => Err(ProviderError::ToolNotFound(other.to_string())),
        }
    }

    /// Regex search over the given files, or the tree under `root`.
    fn execute_search(&self, call: &ToolCall) -> ToolResult {
        let start = Instant::now();
        let query = call.get_string("query").unwrap_or_default();
        if query.is_empty() {
            return ToolResult::failure(
                SEARCH_FILES,
                ToolError::invalid_argument("query must not be empty"),
            );
        }

        let regex = match regex::RegexBuilder::new(query)
            .case_insensitive(true)
            .build()
        {
            Ok(regex) => regex,
            Err(e) => {
                return ToolResult::failure(
                    SEARCH_FILES,
                    ToolError::invalid_argument(format!("bad search pattern: {}", e)),
                );
            }
        };

        let mut files = call.get_string_list("files");
        if files.is_empty() {
            files = self.walk_tree();
        }

        let mut matches = Vec::new();
        for file in &files {
            let path = self.root.join(file);
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            for (number, line) in content.lines().enumerate() {
                if regex.is_match(line) {
                    matches.push(serde_json::json!({
                        "file": file,
                        "line": number + 1,
                        "content": line.trim(),
                    }));
                    if matches.len() >= MAX_MATCHES {
                        break;
                    }
                }
            }
            if matches.len() >= MAX_MATCHES {
                break;
            }
        }

        let output = serde_json::json!({
            "query": query,
            "matches": matches,
            "truncated": matches.len() >= MAX_MATCHES,
        });
        ToolResult::success(SEARCH_FILES, output)
            .with_duration(start.elapsed().as_millis() as u64)
    }

    /// Source files under the root, for unscoped searches.
    fn walk_tree(&self) -> Vec<String> {
        let pattern = self.root.join("**/*").to_string_lossy().into_owned();
        let Ok(paths) = glob::glob(&pattern) else {
            return Vec::new();
        };
        paths
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .filter(|p| !p.components().any(|c| c.as_os_str() == ".git"))
            .filter_map(|p| {
                p.strip_prefix(&self.root)
                    .ok()
                    .map(|rel| rel.to_string_lossy().into_owned())
            })
            .take(MAX_MATCHES)
            .collect()
    }

    /// Bounded read of one file.
    fn execute_read(&self, call: &ToolCall) -> ToolResult {
        let path_arg = match call.require_string("path") {
            Ok(path) => path,
            Err(message) => {
                return ToolResult::failure(READ_FILE, ToolError::invalid_argument(message));
            }
        };

        let path = self.root.join(path_arg);
        match std::fs::read_to_string(&path) {
            Ok(mut content) => {
                let truncated = content.len() > MAX_READ_BYTES;
                if truncated {
                    content.truncate(floor_char_boundary(&content, MAX_READ_BYTES));
                }
                ToolResult::success(
                    READ_FILE,
                    serde_json::json!({
                        "path": path_arg,
                        "content": content,
                        "truncated": truncated,
                    }),
                )
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ToolResult::failure(READ_FILE, ToolError::not_found(path_arg))
            }
            Err(e) => ToolResult::failure(
                READ_FILE,
                ToolError::execution_failed(format!("read {}: {}", path_arg, e)),
            ),
        }
    }

    /// Recent commits touching a path via the git CLI.
    async fn execute_git_log(&self, call: &ToolCall) -> ToolResult {
        let path = call.get_string("path").unwrap_or(".");
        let limit = call.get_i64("limit").unwrap_or(GIT_LOG_LIMIT as i64);

        let output = tokio::process::Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .arg("log")
            .arg(format!("-n{}", limit))
            .arg("--pretty=format:%h|%an|%ad|%s")
            .arg("--date=short")
            .arg("--")
            .arg(path)
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ToolResult::failure(GIT_LOG, ToolError::unavailable("git"));
            }
            Err(e) => {
                return ToolResult::failure(
                    GIT_LOG,
                    ToolError::execution_failed(format!("spawning git: {}", e)),
                );
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return ToolResult::failure(
                GIT_LOG,
                ToolError::execution_failed(format!("git log: {}", stderr.trim())),
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let commits: Vec<serde_json::Value> = stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(|line| {
                let mut parts = line.splitn(4, '|');
                serde_json::json!({
                    "commit": parts.next().unwrap_or(""),
                    "author": parts.next().unwrap_or(""),
                    "date": parts.next().unwrap_or(""),
                    "message": parts.next().unwrap_or(""),
                })
            })
            .collect();

        ToolResult::success(
            GIT_LOG,
            serde_json::json!({
                "path": path,
                "commits": commits,
                "total_commits": commits.len(),
            }),
        )
    }
}

impl Default for BuiltinProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Largest byte index <= `max` that lands on a char boundary.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    let mut end = max.min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

#[async_trait]
impl ToolProvider for BuiltinProvider {
    fn id(&self) -> &str {
        "builtin"
    }

    fn display_name(&self) -> &str {
        "Built-in Tools"
    }

    fn priority(&self) -> i32 {
        BUILTIN_PRIORITY
    }

    async fn is_available(&self) -> bool {
        // Built-in tools are always available
        true
    }

    async fn discover_tools(&self) -> Result<Vec<ToolDescriptor>, ProviderError> {
        Ok(Self::descriptors())
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        match self.execute_internal(call).await {
            Ok(result) => result,
            Err(e) => {
                ToolResult::failure(&call.tool_name, ToolError::execution_failed(e.to_string()))
            }
        }
    }
}
