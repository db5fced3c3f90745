//! Tool Executor port
//!
//! Defines how the application layer inspects and invokes tools. The
//! catalog is introspectable so the context resolver can walk its
//! capability fallback chain without knowing provider details.

use async_trait::async_trait;
use panel_domain::{ToolCall, ToolCatalog, ToolDescriptor, ToolResult};

/// Port for tool execution
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// The catalog of all discovered tools
    fn catalog(&self) -> &ToolCatalog;

    /// Check if a tool is available
    fn has_tool(&self, name: &str) -> bool {
        self.catalog().contains(name)
    }

    /// Get the descriptor of a specific tool
    fn get_tool(&self, name: &str) -> Option<&ToolDescriptor> {
        self.catalog().get(name)
    }

    /// Execute a tool call asynchronously
    async fn execute(&self, call: &ToolCall) -> ToolResult;
}
