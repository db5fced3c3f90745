//! Tool domain entities: calls, capability descriptors and the catalog.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Description of one invocable tool.
///
/// Tools are introspectable: the resolver matches requests against the
/// declared capability first, then against the descriptive keywords.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique name of the tool (e.g. "search_files")
    pub name: String,
    /// Capability tag the tool serves (e.g. "code-search", "file-read")
    pub capability: String,
    /// Human-readable description
    pub description: String,
    /// Descriptive keywords used as a secondary match signal
    pub keywords: Vec<String>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        capability: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            capability: capability.into(),
            description: description.into(),
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords(
        mut self,
        keywords: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the descriptor mentions the keyword in its keyword list,
    /// name or description (case-insensitive).
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        self.keywords.iter().any(|k| k.to_lowercase() == keyword)
            || self.name.to_lowercase().contains(&keyword)
            || self.description.to_lowercase().contains(&keyword)
    }
}

/// Catalog of available tools, ordered by registration.
///
/// Registration order is resolution order: when several descriptors
/// qualify equally, the earliest registered wins.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn register(mut self, tool: ToolDescriptor) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn all(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// All descriptors declaring the capability exactly.
    pub fn by_capability<'a>(
        &'a self,
        capability: &'a str,
    ) -> impl Iterator<Item = &'a ToolDescriptor> {
        self.tools.iter().filter(move |t| t.capability == capability)
    }

    /// All descriptors whose capability starts with the prefix.
    pub fn by_capability_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = &'a ToolDescriptor> {
        self.tools
            .iter()
            .filter(move |t| t.capability.starts_with(prefix))
    }
}

/// A call to a tool with arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to call
    pub tool_name: String,
    /// Arguments passed to the tool
    pub arguments: HashMap<String, serde_json::Value>,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: HashMap::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    /// Get a required string argument or return an error message
    pub fn require_string(&self, key: &str) -> Result<&str, String> {
        self.get_string(key)
            .ok_or_else(|| format!("Missing required argument: {}", key))
    }

    /// Get an optional string-list argument
    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        self.arguments
            .get(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get an optional i64 argument
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.arguments.get(key).and_then(|v| v.as_i64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_keyword_match() {
        let tool = ToolDescriptor::new("search_files", "file-search", "Regex search over files")
            .with_keywords(["search", "grep"]);

        assert!(tool.matches_keyword("grep"));
        assert!(tool.matches_keyword("SEARCH"));
        assert!(tool.matches_keyword("regex")); // via description
        assert!(!tool.matches_keyword("coverage"));
    }

    #[test]
    fn test_catalog_capability_lookup() {
        let catalog = ToolCatalog::new()
            .register(ToolDescriptor::new("search_files", "file-search", "Search"))
            .register(ToolDescriptor::new("read_file", "file-read", "Read"))
            .register(ToolDescriptor::new("git_log", "git-history", "History"));

        assert_eq!(catalog.by_capability("git-history").count(), 1);
        assert_eq!(catalog.by_capability_prefix("file-").count(), 2);
        assert_eq!(catalog.by_capability("code-search").count(), 0);
        assert!(catalog.contains("read_file"));
        assert!(!catalog.contains("write_file"));
    }

    #[test]
    fn test_catalog_preserves_registration_order() {
        let catalog = ToolCatalog::new()
            .register(ToolDescriptor::new("a", "file-search", ""))
            .register(ToolDescriptor::new("b", "file-search", ""));

        let first = catalog.by_capability("file-search").next().unwrap();
        assert_eq!(first.name, "a");
    }

    #[test]
    fn test_tool_call_arguments() {
        let call = ToolCall::new("search_files")
            .with_arg("query", "fn main")
            .with_arg("files", serde_json::json!(["src/main.rs"]));

        assert_eq!(call.get_string("query"), Some("fn main"));
        assert_eq!(call.get_string_list("files"), vec!["src/main.rs"]);
        assert!(call.require_string("missing").is_err());
    }
}
