//! Context request types and cache-key derivation.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Kind of external information a specialist can ask for.
///
/// Each type carries its capability tag (what a tool must declare to
/// serve it exactly), a descriptive keyword used to break ties between
/// candidate tools, and the generic capability prefix tried as a last
/// resort before synthesizing a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    /// Full-text search over the codebase
    CodeSearch,
    /// Symbol-level analysis of a file (definitions, references)
    SymbolAnalysis,
    /// Commit history and authorship of a file
    GitHistory,
    /// Test coverage of a file
    TestCoverage,
}

impl ContextType {
    pub const ALL: [ContextType; 4] = [
        ContextType::CodeSearch,
        ContextType::SymbolAnalysis,
        ContextType::GitHistory,
        ContextType::TestCoverage,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ContextType::CodeSearch => "code_search",
            ContextType::SymbolAnalysis => "symbol_analysis",
            ContextType::GitHistory => "git_history",
            ContextType::TestCoverage => "test_coverage",
        }
    }

    /// Parse a context-type tag; unknown tags are a configuration error.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "code_search" => Ok(ContextType::CodeSearch),
            "symbol_analysis" => Ok(ContextType::SymbolAnalysis),
            "git_history" => Ok(ContextType::GitHistory),
            "test_coverage" => Ok(ContextType::TestCoverage),
            other => Err(DomainError::UnknownContextType(other.to_string())),
        }
    }

    /// Capability a tool must declare to serve this type exactly.
    pub fn capability(&self) -> &str {
        match self {
            ContextType::CodeSearch => "code-search",
            ContextType::SymbolAnalysis => "symbol-analysis",
            ContextType::GitHistory => "git-history",
            ContextType::TestCoverage => "test-coverage",
        }
    }

    /// Secondary keyword used to pick among several exact matches.
    pub fn keyword(&self) -> &str {
        match self {
            ContextType::CodeSearch => "search",
            ContextType::SymbolAnalysis => "symbol",
            ContextType::GitHistory => "log",
            ContextType::TestCoverage => "coverage",
        }
    }

    /// Generic capability prefix tried before synthesizing a result.
    ///
    /// Any file-capable tool can produce a coarse stand-in for search
    /// and symbol context; history and coverage fall back the same way
    /// (a file read is still better than nothing).
    pub fn generic_prefix(&self) -> &str {
        "file-"
    }
}

impl std::fmt::Display for ContextType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ContextType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContextType::parse(s)
    }
}

/// A single request for external context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRequest {
    #[serde(rename = "type")]
    pub context_type: ContextType,
    /// Free-form query (search pattern, symbol name, ...)
    #[serde(default)]
    pub query: String,
    /// Target files the request is scoped to
    #[serde(default)]
    pub files: Vec<String>,
}

impl ContextRequest {
    pub fn new(context_type: ContextType, query: impl Into<String>) -> Self {
        Self {
            context_type,
            query: query.into(),
            files: Vec::new(),
        }
    }

    pub fn with_files(mut self, files: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Composite cache key: `type + normalized query + sorted files`.
    ///
    /// Two requests that differ only in whitespace, query case, or file
    /// order share one key, so they share one tool invocation.
    pub fn cache_key(&self) -> String {
        let query = normalize_query(&self.query);
        let mut files = self.files.clone();
        files.sort();
        format!("{}:{}:{}", self.context_type, query, files.join(","))
    }
}

/// Lowercase, trim, and collapse internal whitespace.
fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_type_roundtrip() {
        for context_type in ContextType::ALL {
            assert_eq!(
                ContextType::parse(context_type.as_str()).unwrap(),
                context_type
            );
        }
    }

    #[test]
    fn test_unknown_type_is_error() {
        assert!(ContextType::parse("crystal_ball").is_err());
    }

    #[test]
    fn test_cache_key_normalizes_query_and_file_order() {
        let a = ContextRequest::new(ContextType::CodeSearch, "  Foo   Bar ")
            .with_files(["b.rs", "a.rs"]);
        let b = ContextRequest::new(ContextType::CodeSearch, "foo bar").with_files(["a.rs", "b.rs"]);
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_cache_key_distinguishes_types() {
        let search = ContextRequest::new(ContextType::CodeSearch, "foo");
        let history = ContextRequest::new(ContextType::GitHistory, "foo");
        assert_ne!(search.cache_key(), history.cache_key());
    }

    #[test]
    fn test_request_deserializes_with_type_alias() {
        let req: ContextRequest = serde_json::from_str(
            r#"{"type": "code_search", "query": "login", "files": ["src/auth.rs"]}"#,
        )
        .unwrap();
        assert_eq!(req.context_type, ContextType::CodeSearch);
        assert_eq!(req.files, vec!["src/auth.rs".to_string()]);
    }
}
