//! Deterministic offline reasoning backend.
//!
//! Stands in for an LLM behind [`ReasoningPort`]: plans a bounded set
//! of context requests per specialty and derives findings from pattern
//! scans over the added lines of the diff. Deterministic by
//! construction, so runs and tests are reproducible without network
//! access.
//!
//! Answers are returned as JSON text, exactly like a remote backend
//! would produce, so the parsing and degradation paths in the
//! specialist loop stay exercised.

use async_trait::async_trait;
use panel_application::{AnalyzeInput, PlanInput, ReasoningError, ReasoningPort};
use panel_domain::Specialty;
use serde_json::json;

/// A pattern the analyzer looks for in added lines.
struct Probe {
    needle: &'static str,
    severity: &'static str,
    kind: &'static str,
    note: &'static str,
}

const SECURITY_PROBES: [Probe; 4] = [
    Probe {
        needle: "password",
        severity: "high",
        kind: "security",
        note: "Possible credential handling in the change",
    },
    Probe {
        needle: "secret",
        severity: "high",
        kind: "security",
        note: "Possible secret material in the change",
    },
    Probe {
        needle: "unsafe ",
        severity: "medium",
        kind: "security",
        note: "New unsafe block introduced",
    },
    Probe {
        needle: ".unwrap()",
        severity: "medium",
        kind: "bug",
        note: "Panic path added on an error value",
    },
];

const ALIGNMENT_PROBES: [Probe; 2] = [
    Probe {
        needle: "todo",
        severity: "low",
        kind: "style",
        note: "Unfinished work marker left in the change",
    },
    Probe {
        needle: "fixme",
        severity: "low",
        kind: "style",
        note: "Known-broken marker left in the change",
    },
];

/// Deterministic [`ReasoningPort`] implementation.
pub struct HeuristicReasoner;

impl HeuristicReasoner {
    pub fn new() -> Self {
        Self
    }

    fn plan_requests(input: &PlanInput<'_>) -> Vec<serde_json::Value> {
        let files = input.changed_files;
        match input.specialty {
            Specialty::Alignment => {
                let keyword = input
                    .task
                    .title
                    .split_whitespace()
                    .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
                    .filter(|w| w.len() > 3)
                    .map(str::to_lowercase)
                    .next()
                    .unwrap_or_else(|| "change".to_string());
                vec![json!({ "type": "code_search", "query": keyword, "files": files })]
            }
            Specialty::Testing => files
                .iter()
                .map(|f| json!({ "type": "test_coverage", "query": "", "files": [f] }))
                .collect(),
            Specialty::Security => {
                vec![json!({
                    "type": "code_search",
                    "query": "password|secret|unsafe",
                    "files": files,
                })]
            }
            Specialty::Dependencies => files
                .iter()
                .filter(|f| is_manifest(f))
                .map(|f| json!({ "type": "git_history", "query": "", "files": [f] }))
                .collect(),
        }
    }

    fn analyze_findings(input: &AnalyzeInput<'_>) -> Vec<serde_json::Value> {
        // Re-reporting the same findings every iteration would duplicate
        // them in the accumulated list
        if input.iteration > 1 {
            return Vec::new();
        }

        let probes: &[Probe] = match input.specialty {
            Specialty::Security => &SECURITY_PROBES,
            Specialty::Alignment => &ALIGNMENT_PROBES,
            _ => &[],
        };

        let mut findings = Vec::new();
        for added in added_lines(input.diff) {
            let lowered = added.content.to_lowercase();
            for probe in probes {
                if lowered.contains(probe.needle) {
                    findings.push(json!({
                        "severity": probe.severity,
                        "type": probe.kind,
                        "file": added.file,
                        "line": added.line,
                        "description": format!("{}: {}", probe.note, added.content.trim()),
                        "snippet": added.content.trim(),
                    }));
                }
            }
        }

        if input.specialty == Specialty::Testing {
            let touches_tests = input
                .task
                .title
                .to_lowercase()
                .contains("test")
                || added_lines(input.diff).any(|l| l.file.contains("test"));
            if !touches_tests && !input.diff.is_empty() {
                findings.push(json!({
                    "severity": "low",
                    "type": "testing",
                    "file": first_changed_file(input.diff).unwrap_or_else(|| "unknown".to_string()),
                    "line": 1,
                    "description": "No test changes accompany this change",
                }));
            }
        }

        findings
    }
}

impl Default for HeuristicReasoner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReasoningPort for HeuristicReasoner {
    async fn plan(&self, input: PlanInput<'_>) -> Result<String, ReasoningError> {
        let requests = Self::plan_requests(&input);
        let answer = json!({
            "context_requests": requests,
            "reasoning": format!(
                "{} review of {} changed files, budget {}",
                input.specialty,
                input.changed_files.len(),
                input.context_budget,
            ),
        });
        Ok(answer.to_string())
    }

    async fn analyze(&self, input: AnalyzeInput<'_>) -> Result<String, ReasoningError> {
        let findings = Self::analyze_findings(&input);
        let answer = json!({
            "findings": findings,
            "needs_more_context": false,
            "reasoning": format!(
                "iteration {} of {}: {} findings from {} context records",
                input.iteration,
                input.max_iterations,
                findings.len(),
                input.context.len(),
            ),
        });
        Ok(answer.to_string())
    }
}

fn is_manifest(file: &str) -> bool {
    let name = file.rsplit('/').next().unwrap_or(file);
    matches!(
        name,
        "Cargo.toml" | "Cargo.lock" | "package.json" | "go.mod" | "requirements.txt"
            | "pyproject.toml"
    )
}

/// An added line in a unified diff, located in the new file.
struct AddedLine {
    file: String,
    line: u32,
    content: String,
}

/// Iterate the added lines of a unified diff with their new-file
/// positions, tracked through `+++` headers and `@@` hunk markers.
fn added_lines(diff: &str) -> impl Iterator<Item = AddedLine> + '_ {
    let mut file = String::new();
    let mut line: u32 = 0;

    diff.lines().filter_map(move |raw| {
        if let Some(path) = raw.strip_prefix("+++ ") {
            file = path.strip_prefix("b/").unwrap_or(path).to_string();
            return None;
        }
        if raw.starts_with("@@") {
            line = hunk_new_start(raw).unwrap_or(1);
            return None;
        }
        if raw.starts_with("+++") || raw.starts_with("---") {
            return None;
        }
        if let Some(content) = raw.strip_prefix('+') {
            let result = AddedLine {
                file: file.clone(),
                line,
                content: content.to_string(),
            };
            line += 1;
            return Some(result);
        }
        if !raw.starts_with('-') {
            // Context line advances the new-file position
            line = line.saturating_add(1);
        }
        None
    })
}

/// Parse the new-file start line out of `@@ -a,b +c,d @@`.
fn hunk_new_start(header: &str) -> Option<u32> {
    let plus = header.split('+').nth(1)?;
    let number: String = plus.chars().take_while(|c| c.is_ascii_digit()).collect();
    number.parse().ok()
}

fn first_changed_file(diff: &str) -> Option<String> {
    diff.lines()
        .find_map(|l| l.strip_prefix("+++ "))
        .map(|p| p.strip_prefix("b/").unwrap_or(p).to_string())
}
