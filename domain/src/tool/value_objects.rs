//! Tool value objects — immutable result and error types.
//!
//! Error codes drive the resolver's retry strategy: transient codes are
//! retried with backoff before the resolver falls through its capability
//! chain; the rest advance the chain immediately.

use serde::{Deserialize, Serialize};

/// Error that occurred during tool execution.
///
/// | Code | Transient? | Description |
/// |------|-----------|-------------|
/// | `TRANSIENT` | Yes | Temporary failure (I/O hiccup, busy resource) |
/// | `TIMEOUT` | Yes | Operation timed out |
/// | `UNAVAILABLE` | No | Tool/provider not reachable — advance the chain |
/// | `NOT_FOUND` | No | Resource does not exist |
/// | `INVALID_ARGUMENT` | No | Missing/wrong parameters |
/// | `EXECUTION_FAILED` | No | Runtime failure inside the tool |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolError {
    /// Error code (e.g. "TRANSIENT", "UNAVAILABLE")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new("TRANSIENT", message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            "TIMEOUT",
            format!("Operation timed out: {}", operation.into()),
        )
    }

    pub fn unavailable(tool: impl Into<String>) -> Self {
        Self::new("UNAVAILABLE", format!("Tool unavailable: {}", tool.into()))
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            "NOT_FOUND",
            format!("Resource not found: {}", resource.into()),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new("INVALID_ARGUMENT", message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new("EXECUTION_FAILED", message)
    }

    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self.code.as_str(), "TRANSIENT" | "TIMEOUT")
    }

    /// Whether the tool itself is unreachable and the resolver should
    /// advance to the next entry in its fallback chain.
    pub fn is_unavailable(&self) -> bool {
        self.code == "UNAVAILABLE"
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Result of a tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Name of the tool that was executed
    pub tool_name: String,
    /// Whether the execution was successful
    pub success: bool,
    /// Output payload (for successful execution)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Error information (for failed execution)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    /// Duration of execution in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(tool_name: impl Into<String>, output: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            output: Some(output),
            error: None,
            duration_ms: None,
        }
    }

    /// Create a failed result
    pub fn failure(tool_name: impl Into<String>, error: ToolError) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            output: None,
            error: Some(error),
            duration_ms: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn output(&self) -> Option<&serde_json::Value> {
        self.output.as_ref()
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ToolError::transient("busy").is_transient());
        assert!(ToolError::timeout("git log").is_transient());
        assert!(!ToolError::unavailable("zoekt").is_transient());
        assert!(ToolError::unavailable("zoekt").is_unavailable());
        assert!(!ToolError::execution_failed("boom").is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = ToolError::not_found("src/gone.rs").with_details("deleted in this change");
        let text = err.to_string();
        assert!(text.contains("NOT_FOUND"));
        assert!(text.contains("deleted in this change"));
    }

    #[test]
    fn test_result_success() {
        let result = ToolResult::success("search_files", serde_json::json!({"matches": []}))
            .with_duration(12);
        assert!(result.is_success());
        assert_eq!(result.duration_ms, Some(12));
        assert!(result.error().is_none());
    }

    #[test]
    fn test_result_failure() {
        let result = ToolResult::failure("git_log", ToolError::unavailable("git"));
        assert!(!result.is_success());
        assert!(result.output().is_none());
        assert_eq!(result.error().unwrap().code, "UNAVAILABLE");
    }
}
