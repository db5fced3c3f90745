//! Specialist verdicts and the run-level aggregation rule.

use super::finding::Finding;
use super::specialty::Specialty;
use crate::context::ContextRecord;
use serde::{Deserialize, Serialize};

/// Outcome of a single specialist's review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictOutcome {
    Pass,
    Warn,
    Fail,
    NeedsWork,
}

impl VerdictOutcome {
    pub fn as_str(&self) -> &str {
        match self {
            VerdictOutcome::Pass => "PASS",
            VerdictOutcome::Warn => "WARN",
            VerdictOutcome::Fail => "FAIL",
            VerdictOutcome::NeedsWork => "NEEDS_WORK",
        }
    }

    /// Whether this outcome blocks an overall pass.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, VerdictOutcome::Pass)
    }
}

impl std::fmt::Display for VerdictOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregated outcome of the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallOutcome {
    /// No specialist produced a verdict
    NoReview,
    /// At least one specialist flagged something
    NeedsWork,
    /// Every specialist passed the change
    Pass,
}

impl OverallOutcome {
    pub fn as_str(&self) -> &str {
        match self {
            OverallOutcome::NoReview => "NO_REVIEW",
            OverallOutcome::NeedsWork => "NEEDS_WORK",
            OverallOutcome::Pass => "PASS",
        }
    }
}

impl std::fmt::Display for OverallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reduce a set of verdicts to one overall outcome.
///
/// Precedence: no verdicts → `NoReview`; any blocking verdict (FAIL,
/// NEEDS_WORK or WARN) → `NeedsWork`; otherwise `Pass`.
pub fn aggregate_verdicts(verdicts: &[Verdict]) -> OverallOutcome {
    if verdicts.is_empty() {
        return OverallOutcome::NoReview;
    }
    if verdicts.iter().any(|v| v.outcome.is_blocking()) {
        return OverallOutcome::NeedsWork;
    }
    OverallOutcome::Pass
}

/// Final report of one specialist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(rename = "verdict")]
    pub outcome: VerdictOutcome,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Non-empty, human-readable summary
    pub summary: String,
    pub specialty: Specialty,
    pub findings: Vec<Finding>,
    pub context_gathered: Vec<ContextRecord>,
    pub iterations_used: u32,
}

impl Verdict {
    /// Derive the verdict from accumulated findings and context.
    ///
    /// Outcome: any high finding → FAIL; else any medium → WARN; else any
    /// finding → NEEDS_WORK; else PASS.
    ///
    /// Confidence starts at 0.8, gains up to 0.1 for gathered context
    /// (0.02 per record), loses 0.2 per high and 0.1 per medium finding,
    /// and 0.1 per iteration spent beyond the cap; clamped to
    /// [0.1, 0.95].
    pub fn from_findings(
        specialty: Specialty,
        findings: Vec<Finding>,
        context_gathered: Vec<ContextRecord>,
        iterations_used: u32,
        max_iterations: u32,
    ) -> Self {
        let high = findings.iter().filter(|f| f.is_high()).count();
        let medium = findings.iter().filter(|f| f.is_medium()).count();

        let outcome = if high > 0 {
            VerdictOutcome::Fail
        } else if medium > 0 {
            VerdictOutcome::Warn
        } else if !findings.is_empty() {
            VerdictOutcome::NeedsWork
        } else {
            VerdictOutcome::Pass
        };

        let context_bonus = (context_gathered.len() as f64 * 0.02).min(0.1);
        let severity_penalty = high as f64 * 0.2 + medium as f64 * 0.1;
        let overrun = iterations_used.saturating_sub(max_iterations) as f64;
        let confidence = (0.8 + context_bonus - severity_penalty - overrun * 0.1).clamp(0.1, 0.95);

        let mut summary = format!(
            "Review completed with {} findings in {} iterations",
            findings.len(),
            iterations_used
        );
        if high > 0 {
            summary.push_str(&format!(" (including {} high-severity issues)", high));
        } else if medium > 0 {
            summary.push_str(&format!(" (including {} medium-severity issues)", medium));
        }

        Self {
            outcome,
            confidence,
            summary,
            specialty,
            findings,
            context_gathered,
            iterations_used,
        }
    }

    /// Degraded verdict for a specialist that exceeded its wall-clock
    /// timeout. Carries an explicit timeout marker in the summary.
    pub fn timed_out(specialty: Specialty, timeout_secs: u64) -> Self {
        Self {
            outcome: VerdictOutcome::Warn,
            confidence: 0.1,
            summary: format!(
                "{} specialist timed out after {}s",
                specialty, timeout_secs
            ),
            specialty,
            findings: Vec::new(),
            context_gathered: Vec::new(),
            iterations_used: 0,
        }
    }

    /// Degraded verdict for a specialist that failed with an error.
    pub fn errored(specialty: Specialty, error: impl std::fmt::Display) -> Self {
        Self {
            outcome: VerdictOutcome::NeedsWork,
            confidence: 0.1,
            summary: format!("{} specialist failed: {}", specialty, error),
            specialty,
            findings: Vec::new(),
            context_gathered: Vec::new(),
            iterations_used: 0,
        }
    }

    pub fn high_findings(&self) -> usize {
        self.findings.iter().filter(|f| f.is_high()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::finding::{FindingKind, Severity};

    fn finding(severity: Severity) -> Finding {
        Finding::new(
            "t-1",
            1,
            severity,
            FindingKind::Bug,
            "src/lib.rs",
            10,
            "Suspicious truncation in parser",
        )
        .unwrap()
    }

    fn pass(specialty: Specialty) -> Verdict {
        Verdict::from_findings(specialty, vec![], vec![], 1, 3)
    }

    #[test]
    fn test_outcome_from_severities() {
        let fail = Verdict::from_findings(
            Specialty::Security,
            vec![finding(Severity::High), finding(Severity::Low)],
            vec![],
            2,
            2,
        );
        assert_eq!(fail.outcome, VerdictOutcome::Fail);

        let warn = Verdict::from_findings(
            Specialty::Testing,
            vec![finding(Severity::Medium)],
            vec![],
            1,
            2,
        );
        assert_eq!(warn.outcome, VerdictOutcome::Warn);

        let needs_work =
            Verdict::from_findings(Specialty::Alignment, vec![finding(Severity::Low)], vec![], 1, 3);
        assert_eq!(needs_work.outcome, VerdictOutcome::NeedsWork);

        assert_eq!(pass(Specialty::Dependencies).outcome, VerdictOutcome::Pass);
    }

    #[test]
    fn test_confidence_bounds() {
        // No findings, no context: base confidence
        let clean = pass(Specialty::Alignment);
        assert!((clean.confidence - 0.8).abs() < 1e-9);

        // Many high findings drive confidence to the floor
        let noisy = Verdict::from_findings(
            Specialty::Security,
            (0..6).map(|_| finding(Severity::High)).collect(),
            vec![],
            2,
            2,
        );
        assert!((noisy.confidence - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_context_bonus_caps_at_point_one() {
        use crate::context::{ContextPayload, ContextType, ResolutionSource};

        let records: Vec<ContextRecord> = (0..10)
            .map(|i| {
                ContextRecord::new(
                    1,
                    ContextType::CodeSearch,
                    ContextPayload::default(),
                    format!("k{}", i),
                    ResolutionSource::ExactCapability,
                )
            })
            .collect();
        let verdict = Verdict::from_findings(Specialty::Alignment, vec![], records, 1, 3);
        assert!((verdict.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_aggregation_precedence_law() {
        assert_eq!(aggregate_verdicts(&[]), OverallOutcome::NoReview);

        let all_pass = vec![pass(Specialty::Alignment), pass(Specialty::Testing)];
        assert_eq!(aggregate_verdicts(&all_pass), OverallOutcome::Pass);

        for degraded in [
            Verdict::timed_out(Specialty::Security, 300),
            Verdict::errored(Specialty::Security, "boom"),
            Verdict::from_findings(
                Specialty::Security,
                vec![finding(Severity::High)],
                vec![],
                1,
                2,
            ),
        ] {
            let mixed = vec![pass(Specialty::Alignment), degraded];
            assert_eq!(aggregate_verdicts(&mixed), OverallOutcome::NeedsWork);
        }
    }

    #[test]
    fn test_timeout_marker_present() {
        let verdict = Verdict::timed_out(Specialty::Testing, 300);
        assert_eq!(verdict.outcome, VerdictOutcome::Warn);
        assert!(verdict.summary.contains("timed out"));
    }

    #[test]
    fn test_outcome_serde_tags() {
        let json = serde_json::to_string(&VerdictOutcome::NeedsWork).unwrap();
        assert_eq!(json, "\"NEEDS_WORK\"");
    }
}
