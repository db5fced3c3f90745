//! Console formatter for review reports

use colored::Colorize;
use panel_domain::{ReviewState, Severity, Verdict, VerdictOutcome};

/// Formats a finished review run for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the complete report
    pub fn format(state: &ReviewState) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{}\n",
            "=== Panel Review Report ===".cyan().bold()
        ));
        output.push_str(&format!(
            "{} #{} {}\n",
            "Task:".cyan().bold(),
            state.task.id,
            state.task.title
        ));
        output.push_str(&format!(
            "{} {} files changed\n\n",
            "Change:".cyan().bold(),
            state.changed_files.len()
        ));

        for verdict in &state.verdicts {
            output.push_str(&Self::format_verdict(verdict));
        }

        if let Some(aggregate) = &state.aggregate {
            output.push_str(&format!(
                "\n{} {}\n",
                "Overall:".bold(),
                Self::paint_overall(&aggregate.outcome.to_string())
            ));
            output.push_str(&format!("{}\n", aggregate.summary));
        }

        if !state.similar_tasks.is_empty() {
            output.push_str(&format!("\n{}\n", "Similar past tasks:".cyan().bold()));
            for similar in &state.similar_tasks {
                output.push_str(&format!(
                    "  * #{} {} ({} overlapping files, {})\n",
                    similar.id, similar.title, similar.overlap, similar.outcome
                ));
            }
        }

        output.push_str(&format!(
            "\n{} {} tokens, ${:.4}\n",
            "Usage:".cyan().bold(),
            state.tokens_used,
            state.total_cost_usd
        ));

        output
    }

    /// One-line outcome plus finding counts
    pub fn format_summary(state: &ReviewState) -> String {
        let outcome = state
            .aggregate
            .as_ref()
            .map(|a| a.outcome.to_string())
            .unwrap_or_else(|| "NO_REVIEW".to_string());

        let findings: usize = state.verdicts.iter().map(|v| v.findings.len()).sum();
        let high: usize = state.verdicts.iter().map(Verdict::high_findings).sum();

        format!(
            "{} — {} specialists, {} findings ({} high)",
            Self::paint_overall(&outcome),
            state.verdicts.len(),
            findings,
            high
        )
    }

    /// Format as JSON
    pub fn format_json(state: &ReviewState) -> String {
        serde_json::to_string_pretty(state).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_verdict(verdict: &Verdict) -> String {
        let mut output = String::new();

        let heading = format!(
            "── {} ── {} (confidence {:.2}, {} iterations)",
            verdict.specialty, verdict.outcome, verdict.confidence, verdict.iterations_used
        );
        let heading = match verdict.outcome {
            VerdictOutcome::Pass => heading.green().bold(),
            VerdictOutcome::Warn => heading.yellow().bold(),
            _ => heading.red().bold(),
        };
        output.push_str(&format!("{}\n", heading));
        output.push_str(&format!("   {}\n", verdict.summary));

        for finding in &verdict.findings {
            let marker = match finding.severity {
                Severity::High => "!!".red().bold().to_string(),
                Severity::Medium => " !".yellow().to_string(),
                Severity::Low => "  ".to_string(),
            };
            output.push_str(&format!(
                "  {} [{}] {}:{} {}\n",
                marker, finding.kind, finding.file, finding.line, finding.description
            ));
            if let Some(suggestion) = &finding.suggestion {
                output.push_str(&format!("       suggestion: {}\n", suggestion));
            }
        }

        output.push('\n');
        output
    }

    fn paint_overall(outcome: &str) -> String {
        match outcome {
            "PASS" => outcome.green().bold().to_string(),
            "NO_REVIEW" => outcome.yellow().bold().to_string(),
            _ => outcome.red().bold().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_domain::{
        AggregateReport, Finding, FindingKind, OverallOutcome, Specialty, TaskMetadata,
    };

    fn state_with_findings() -> ReviewState {
        let task = TaskMetadata::new(7, "https://github.com/acme/widgets/pull/7", "Add auth");
        let mut state = ReviewState::new(task, "diff", vec!["src/auth.rs".to_string()]);

        let finding = Finding::new(
            "security-1",
            1,
            Severity::High,
            FindingKind::Security,
            "src/auth.rs",
            14,
            "Plaintext password comparison",
        )
        .unwrap();
        state.verdicts.push(Verdict::from_findings(
            Specialty::Security,
            vec![finding],
            vec![],
            2,
            2,
        ));
        state.aggregate = Some(AggregateReport {
            total_specialists: 1,
            specialties: vec![Specialty::Security],
            outcome: OverallOutcome::NeedsWork,
            summary: "Completed review with 1 specialists".to_string(),
        });
        state
    }

    #[test]
    fn test_full_format_mentions_findings() {
        colored::control::set_override(false);
        let output = ConsoleFormatter::format(&state_with_findings());

        assert!(output.contains("Panel Review Report"));
        assert!(output.contains("security"));
        assert!(output.contains("src/auth.rs:14"));
        assert!(output.contains("NEEDS_WORK"));
    }

    #[test]
    fn test_summary_counts() {
        colored::control::set_override(false);
        let output = ConsoleFormatter::format_summary(&state_with_findings());
        assert!(output.contains("1 specialists"));
        assert!(output.contains("1 findings"));
        assert!(output.contains("1 high"));
    }

    #[test]
    fn test_json_is_valid() {
        let output = ConsoleFormatter::format_json(&state_with_findings());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["task"]["id"], 7);
        assert_eq!(value["verdicts"][0]["verdict"], "FAIL");
    }
}
