//! Tool provider abstraction.
//!
//! A [`ToolProvider`] is an external source of tools (builtin, CLI
//! wrappers, remote servers). Providers are aggregated by the registry
//! in the infrastructure layer; when several providers offer the same
//! tool name, the one with higher priority wins at discovery time.

use async_trait::async_trait;
use thiserror::Error;

use super::entities::{ToolCall, ToolDescriptor};
use super::value_objects::ToolResult;

/// Error type for tool provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider is not available (e.g. backing CLI not installed)
    #[error("Provider not available: {0}")]
    NotAvailable(String),

    /// Failed to discover tools from the provider
    #[error("Discovery failed: {0}")]
    DiscoveryFailed(String),

    /// Tool not found in this provider
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool execution failed
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// External source of tools.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Unique identifier for this provider (e.g. "builtin")
    fn id(&self) -> &str;

    /// Display name for user-facing output
    fn display_name(&self) -> &str;

    /// Priority for tool resolution (higher = preferred).
    ///
    /// The builtin provider sits at -100 so any richer provider
    /// overrides its tools.
    fn priority(&self) -> i32 {
        0
    }

    /// Check if the provider is available and properly configured
    async fn is_available(&self) -> bool;

    /// Discover available tools from this provider
    async fn discover_tools(&self) -> Result<Vec<ToolDescriptor>, ProviderError>;

    /// Execute a tool call.
    ///
    /// The tool name must be one returned by `discover_tools()`.
    async fn execute(&self, call: &ToolCall) -> ToolResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::value_objects::ToolError;

    struct StaticProvider {
        available: bool,
        tools: Vec<ToolDescriptor>,
    }

    #[async_trait]
    impl ToolProvider for StaticProvider {
        fn id(&self) -> &str {
            "static"
        }

        fn display_name(&self) -> &str {
            "Static Provider"
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        async fn discover_tools(&self) -> Result<Vec<ToolDescriptor>, ProviderError> {
            if self.available {
                Ok(self.tools.clone())
            } else {
                Err(ProviderError::NotAvailable("static offline".into()))
            }
        }

        async fn execute(&self, call: &ToolCall) -> ToolResult {
            if self.tools.iter().any(|t| t.name == call.tool_name) {
                ToolResult::success(&call.tool_name, serde_json::json!({"ok": true}))
            } else {
                ToolResult::failure(&call.tool_name, ToolError::not_found(&call.tool_name))
            }
        }
    }

    #[tokio::test]
    async fn test_provider_discovery_and_execute() {
        let provider = StaticProvider {
            available: true,
            tools: vec![ToolDescriptor::new("probe", "code-search", "probe tool")],
        };

        assert!(provider.is_available().await);
        let tools = provider.discover_tools().await.unwrap();
        assert_eq!(tools.len(), 1);

        let ok = provider.execute(&ToolCall::new("probe")).await;
        assert!(ok.is_success());

        let missing = provider.execute(&ToolCall::new("ghost")).await;
        assert!(!missing.is_success());
    }

    #[tokio::test]
    async fn test_unavailable_provider_fails_discovery() {
        let provider = StaticProvider {
            available: false,
            tools: vec![],
        };
        assert!(!provider.is_available().await);
        assert!(provider.discover_tools().await.is_err());
    }
}
