//! Review findings produced by specialists.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Severity of a finding.
///
/// Severity drives the specialist's final verdict: any `High` finding
/// fails the review, `Medium` warns, anything else needs work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category tag for a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    TypeError,
    Bug,
    Security,
    Performance,
    Style,
    Architecture,
    Dependency,
    Testing,
}

impl FindingKind {
    pub fn as_str(&self) -> &str {
        match self {
            FindingKind::TypeError => "type_error",
            FindingKind::Bug => "bug",
            FindingKind::Security => "security",
            FindingKind::Performance => "performance",
            FindingKind::Style => "style",
            FindingKind::Architecture => "architecture",
            FindingKind::Dependency => "dependency",
            FindingKind::Testing => "testing",
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single issue located by a specialist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Stable identifier within the run (e.g. "security-1")
    pub id: String,
    /// Iteration in which the finding was produced
    pub iteration: u32,
    pub severity: Severity,
    pub kind: FindingKind,
    /// File the finding points at
    pub file: String,
    /// 1-indexed line number
    pub line: u32,
    /// What is wrong (never empty)
    pub description: String,
    /// Suggested remediation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Offending code excerpt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl Finding {
    /// Create a finding, rejecting empty descriptions.
    pub fn new(
        id: impl Into<String>,
        iteration: u32,
        severity: Severity,
        kind: FindingKind,
        file: impl Into<String>,
        line: u32,
        description: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(DomainError::InvalidFinding(
                "description must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id: id.into(),
            iteration,
            severity,
            kind,
            file: file.into(),
            line: line.max(1),
            description,
            suggestion: None,
            snippet: None,
        })
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    pub fn is_high(&self) -> bool {
        self.severity == Severity::High
    }

    pub fn is_medium(&self) -> bool {
        self.severity == Severity::Medium
    }
}
