//! Tool Registry
//!
//! The [`ToolRegistry`] aggregates multiple tool providers and
//! implements [`ToolExecutorPort`]. Discovery merges every available
//! provider's descriptors into one catalog with priority-based conflict
//! resolution; execution routes each call to the provider that owns the
//! tool.
//!
//! ```ignore
//! let mut registry = ToolRegistry::new()
//!     .register(BuiltinProvider::new());
//! registry.discover().await?;
//! assert!(registry.has_tool("search_files"));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use panel_application::ToolExecutorPort;
use panel_domain::{ToolCall, ToolCatalog, ToolError, ToolProvider, ToolResult};

/// Tool registry that aggregates multiple providers.
pub struct ToolRegistry {
    /// Registered providers
    providers: Vec<Arc<dyn ToolProvider>>,
    /// Tool name -> provider ID mapping (cached after discovery)
    tool_routes: HashMap<String, String>,
    /// Merged catalog
    catalog: ToolCatalog,
    /// Whether discovery has been run
    discovered: bool,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            tool_routes: HashMap::new(),
            catalog: ToolCatalog::new(),
            discovered: false,
        }
    }

    /// Register a tool provider
    pub fn register<P: ToolProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self.discovered = false;
        self
    }

    /// Register a tool provider (Arc version)
    pub fn register_arc(mut self, provider: Arc<dyn ToolProvider>) -> Self {
        self.providers.push(provider);
        self.discovered = false;
        self
    }

    /// Discover tools from all providers.
    ///
    /// Must be called before the registry serves calls. Providers are
    /// visited in priority order (highest first); the first provider to
    /// claim a tool name owns it.
    pub async fn discover(&mut self) -> Result<(), String> {
        self.providers
            .sort_by_key(|p| std::cmp::Reverse(p.priority()));

        let mut catalog = ToolCatalog::new();
        let mut tool_routes = HashMap::new();

        for provider in &self.providers {
            if !provider.is_available().await {
                tracing::debug!(provider = provider.id(), "Provider not available, skipping");
                continue;
            }

            match provider.discover_tools().await {
                Ok(tools) => {
                    for tool in tools {
                        if tool_routes.contains_key(&tool.name) {
                            tracing::trace!(
                                tool = %tool.name,
                                provider = provider.id(),
                                "Tool already registered by higher priority provider"
                            );
                            continue;
                        }
                        tracing::debug!(
                            tool = %tool.name,
                            capability = %tool.capability,
                            provider = provider.id(),
                            "Registered tool"
                        );
                        tool_routes.insert(tool.name.clone(), provider.id().to_string());
                        catalog = catalog.register(tool);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        provider = provider.id(),
                        error = %e,
                        "Failed to discover tools from provider"
                    );
                }
            }
        }

        self.catalog = catalog;
        self.tool_routes = tool_routes;
        self.discovered = true;

        Ok(())
    }

    /// Get the provider for a specific tool
    fn provider_for(&self, tool_name: &str) -> Option<&Arc<dyn ToolProvider>> {
        let provider_id = self.tool_routes.get(tool_name)?;
        self.providers.iter().find(|p| p.id() == provider_id)
    }

    /// Get a list of registered provider IDs
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutorPort for ToolRegistry {
    fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        if !self.discovered {
            return ToolResult::failure(
                &call.tool_name,
                ToolError::execution_failed("Registry not initialized. Call discover() first."),
            );
        }

        match self.provider_for(&call.tool_name) {
            Some(provider) => provider.execute(call).await,
            None => ToolResult::failure(
                &call.tool_name,
                ToolError::not_found(format!("Tool not found: {}", call.tool_name)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin::BuiltinProvider;
    use panel_domain::{ProviderError, ToolDescriptor};
    use std::io::Write;

    struct ShadowingProvider;

    #[async_trait]
    impl ToolProvider for ShadowingProvider {
        fn id(&self) -> &str {
            "indexed"
        }

        fn display_name(&self) -> &str {
            "Indexed Search"
        }

        fn priority(&self) -> i32 {
            100
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn discover_tools(&self) -> Result<Vec<ToolDescriptor>, ProviderError> {
            // Same tool name as the builtin, plus an exclusive one
            Ok(vec![
                ToolDescriptor::new("search_files", "code-search", "Indexed search")
                    .with_keywords(["search"]),
                ToolDescriptor::new("symbol_info", "symbol-analysis", "Symbol lookup")
                    .with_keywords(["symbol"]),
            ])
        }

        async fn execute(&self, call: &ToolCall) -> ToolResult {
            ToolResult::success(&call.tool_name, serde_json::json!({"provider": "indexed"}))
        }
    }

    #[tokio::test]
    async fn test_registry_with_builtin() {
        let mut registry = ToolRegistry::new().register(BuiltinProvider::new());
        registry.discover().await.unwrap();

        assert!(registry.has_tool("search_files"));
        assert!(registry.has_tool("read_file"));
        assert!(registry.has_tool("git_log"));
    }

    #[tokio::test]
    async fn test_higher_priority_provider_wins_conflicts() {
        let mut registry = ToolRegistry::new()
            .register(BuiltinProvider::new())
            .register(ShadowingProvider);
        registry.discover().await.unwrap();

        // The shadowing provider owns search_files now
        let result = registry.execute(&ToolCall::new("search_files")).await;
        assert!(result.is_success());
        assert_eq!(result.output().unwrap()["provider"], "indexed");

        // Capability changed with ownership
        let descriptor = registry.get_tool("search_files").unwrap();
        assert_eq!(descriptor.capability, "code-search");

        // Builtin-exclusive tools still resolve to builtin
        assert!(registry.has_tool("read_file"));
    }

    #[tokio::test]
    async fn test_registry_execute_routes_to_owner() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("hello.txt")).unwrap();
        writeln!(file, "registry routing test").unwrap();

        let mut registry =
            ToolRegistry::new().register(BuiltinProvider::new().with_root(dir.path()));
        registry.discover().await.unwrap();

        let call = ToolCall::new("read_file").with_arg("path", "hello.txt");
        let result = registry.execute(&call).await;

        assert!(result.is_success());
        assert!(
            result.output().unwrap()["content"]
                .as_str()
                .unwrap()
                .contains("registry routing test")
        );
    }

    #[tokio::test]
    async fn test_registry_unknown_tool() {
        let mut registry = ToolRegistry::new().register(BuiltinProvider::new());
        registry.discover().await.unwrap();

        let result = registry.execute(&ToolCall::new("unknown_tool")).await;
        assert!(!result.is_success());
        assert_eq!(result.error().unwrap().code, "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_registry_not_discovered() {
        let registry = ToolRegistry::new().register(BuiltinProvider::new());

        let result = registry.execute(&ToolCall::new("read_file")).await;
        assert!(!result.is_success());
        assert!(result.error().unwrap().message.contains("not initialized"));
    }
}
