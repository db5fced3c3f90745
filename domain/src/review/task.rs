//! Task metadata for the unit of change under review.

use serde::{Deserialize, Serialize};

/// Coarse complexity classification of the change under review.
///
/// Drives the default specialist roster: simple changes get the baseline
/// panel, complex changes pull in the full roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

impl Complexity {
    pub fn as_str(&self) -> &str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Medium => "medium",
            Complexity::Complex => "complex",
        }
    }

    /// Parse from a lowercase tag; unknown tags fall back to `Medium`.
    ///
    /// Complexity is a hint, not configuration — a bad value should not
    /// abort a run.
    pub fn parse_lossy(s: &str) -> Self {
        match s {
            "simple" => Complexity::Simple,
            "complex" => Complexity::Complex,
            _ => Complexity::Medium,
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable metadata for the task under review.
///
/// Created once at run start and never mutated; every specialist reads
/// the same snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// Task identifier (e.g. change-request number)
    pub id: u64,
    /// URL of the change request
    pub url: String,
    /// Source branch of the change
    pub branch: String,
    /// Target branch the change merges into
    pub base_branch: String,
    /// Human-readable title
    pub title: String,
    /// Coarse complexity tag
    pub complexity: Complexity,
}

impl TaskMetadata {
    pub fn new(id: u64, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            branch: String::new(),
            base_branch: "main".to_string(),
            title: title.into(),
            complexity: Complexity::Medium,
        }
    }

    pub fn with_branches(
        mut self,
        branch: impl Into<String>,
        base_branch: impl Into<String>,
    ) -> Self {
        self.branch = branch.into();
        self.base_branch = base_branch.into();
        self
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    /// Extract `owner/repo` from the task URL, if it looks like a forge URL.
    ///
    /// `https://github.com/acme/widgets/pull/7` → `Some("acme/widgets")`.
    pub fn repo_slug(&self) -> Option<String> {
        let rest = self.url.split("://").nth(1)?;
        let mut parts = rest.split('/');
        let _host = parts.next()?;
        let owner = parts.next()?;
        let repo = parts.next()?;
        if owner.is_empty() || repo.is_empty() {
            return None;
        }
        Some(format!("{}/{}", owner, repo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complexity_parse_lossy() {
        assert_eq!(Complexity::parse_lossy("simple"), Complexity::Simple);
        assert_eq!(Complexity::parse_lossy("complex"), Complexity::Complex);
        assert_eq!(Complexity::parse_lossy("medium"), Complexity::Medium);
        assert_eq!(Complexity::parse_lossy("banana"), Complexity::Medium);
    }

    #[test]
    fn test_task_metadata_builder() {
        let task = TaskMetadata::new(42, "https://github.com/acme/widgets/pull/42", "Add auth")
            .with_branches("feature/auth", "main")
            .with_complexity(Complexity::Complex);

        assert_eq!(task.id, 42);
        assert_eq!(task.branch, "feature/auth");
        assert_eq!(task.base_branch, "main");
        assert_eq!(task.complexity, Complexity::Complex);
    }

    #[test]
    fn test_repo_slug() {
        let task = TaskMetadata::new(7, "https://github.com/acme/widgets/pull/7", "Fix");
        assert_eq!(task.repo_slug(), Some("acme/widgets".to_string()));

        let bad = TaskMetadata::new(7, "not a url", "Fix");
        assert_eq!(bad.repo_slug(), None);
    }
}
