//! Context resolution: capability fallback chain plus two-tier cache.
//!
//! A [`ContextRequest`] is turned into a [`ContextRecord`] by:
//!
//! 1. checking the per-run in-memory cache,
//! 2. checking the external TTL cache,
//! 3. walking the capability fallback chain — exact capability match
//!    (keyword-tiebroken), configured fallback tool, generic
//!    capability-prefix match,
//! 4. synthesizing a clearly tagged placeholder when no tool is
//!    reachable.
//!
//! Transient tool errors are retried with exponential backoff before the
//! chain advances. Failures never escape this layer; they come back as
//! failed-but-structured records.

use crate::config::ContextConfig;
use crate::ports::context_cache::ContextCachePort;
use crate::ports::tool_executor::ToolExecutorPort;
use panel_domain::{
    ContextPayload, ContextRecord, ContextRequest, ContextType, ResolutionSource, ToolCall,
    ToolError, ToolResult, truncate,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Outcome of one resolution, with cache provenance for event reporting.
#[derive(Debug, Clone)]
pub struct ResolvedContext {
    pub record: ContextRecord,
    pub cache_hit: bool,
}

/// Resolves context requests against the tool catalog.
///
/// One resolver instance serves one review run; the in-memory tier is
/// shared by every specialist in the run, so identical requests across
/// specialists cost one tool invocation.
pub struct ContextResolver<T: ToolExecutorPort> {
    tools: Arc<T>,
    cache: Arc<dyn ContextCachePort>,
    config: ContextConfig,
    run_cache: Mutex<HashMap<String, ContextRecord>>,
}

impl<T: ToolExecutorPort> ContextResolver<T> {
    pub fn new(tools: Arc<T>, cache: Arc<dyn ContextCachePort>, config: ContextConfig) -> Self {
        Self {
            tools,
            cache,
            config,
            run_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve one request into a record.
    ///
    /// `iteration` tags the produced record; it does not affect caching.
    pub async fn resolve(&self, iteration: u32, request: &ContextRequest) -> ResolvedContext {
        let key = request.cache_key();

        // Tier 1: per-run map
        if let Some(mut record) = self.run_cache_get(&key) {
            record.iteration = iteration;
            return ResolvedContext {
                record,
                cache_hit: true,
            };
        }

        // Tier 2: external TTL store
        if let Some(mut record) = self.cache.get(&key).await {
            record.iteration = iteration;
            self.run_cache_put(&key, &record);
            return ResolvedContext {
                record,
                cache_hit: true,
            };
        }

        let record = self.resolve_uncached(iteration, request, &key).await;

        if record.is_usable() {
            self.run_cache_put(&key, &record);
            self.cache.put(&key, &record, self.config.cache_ttl).await;
        }

        ResolvedContext {
            record,
            cache_hit: false,
        }
    }

    /// Walk the fallback chain and invoke the first reachable tool.
    async fn resolve_uncached(
        &self,
        iteration: u32,
        request: &ContextRequest,
        key: &str,
    ) -> ContextRecord {
        let chain = self.candidates(request.context_type);

        if chain.is_empty() {
            debug!(
                context_type = %request.context_type,
                "No candidate tools, synthesizing placeholder"
            );
            return self.synthesize(iteration, request, key);
        }

        let mut last_error: Option<ToolError> = None;

        for (tool_name, source) in chain {
            let call = build_call(&tool_name, request);
            let result = self.invoke_with_retry(&call).await;

            match result {
                Ok(output) => {
                    let summary = summarize_output(request.context_type, &tool_name, &output);
                    let payload = ContextPayload::new(output, summary);
                    let record = ContextRecord::new(
                        iteration,
                        request.context_type,
                        payload,
                        key,
                        source,
                    )
                    .with_cost(0.001);
                    return record;
                }
                Err(error) if error.is_unavailable() || error.is_transient() => {
                    // Unreachable tool (or retries exhausted): advance the chain
                    debug!(
                        tool = %tool_name,
                        error = %error,
                        "Tool unreachable, advancing fallback chain"
                    );
                    last_error = Some(error);
                }
                Err(error) => {
                    // The tool ran and failed; record it, with causal context
                    warn!(
                        context_type = %request.context_type,
                        tool = %tool_name,
                        query = %request.query,
                        files = ?request.files,
                        error = %error,
                        "Context gathering failed"
                    );
                    return ContextRecord::failed(
                        iteration,
                        request.context_type,
                        key,
                        error.to_string(),
                        source,
                    );
                }
            }
        }

        // Every candidate was unreachable
        if let Some(error) = last_error {
            warn!(
                context_type = %request.context_type,
                error = %error,
                "All tools unreachable, synthesizing placeholder"
            );
        }
        self.synthesize(iteration, request, key)
    }

    /// Ordered candidate tools for a context type.
    fn candidates(&self, context_type: ContextType) -> Vec<(String, ResolutionSource)> {
        let catalog = self.tools.catalog();
        let mut chain: Vec<(String, ResolutionSource)> = Vec::new();

        // 1. Exact capability match, keyword as tiebreaker
        let exact: Vec<_> = catalog.by_capability(context_type.capability()).collect();
        let best = exact
            .iter()
            .find(|t| t.matches_keyword(context_type.keyword()))
            .or_else(|| exact.first());
        if let Some(tool) = best {
            chain.push((tool.name.clone(), ResolutionSource::ExactCapability));
        }

        // 2. Explicitly configured fallback tool
        if let Some(name) = self.config.fallback_tools.get(&context_type)
            && catalog.contains(name)
            && !chain.iter().any(|(n, _)| n == name)
        {
            chain.push((name.clone(), ResolutionSource::ConfiguredFallback));
        }

        // 3. Generic capability-prefix match
        let prefixed: Vec<_> = catalog
            .by_capability_prefix(context_type.generic_prefix())
            .collect();
        let generic = prefixed
            .iter()
            .find(|t| t.matches_keyword(context_type.keyword()))
            .or_else(|| prefixed.first());
        if let Some(tool) = generic
            && !chain.iter().any(|(n, _)| *n == tool.name)
        {
            chain.push((tool.name.clone(), ResolutionSource::PrefixMatch));
        }

        chain
    }

    /// Invoke a tool, retrying transient errors with exponential backoff.
    async fn invoke_with_retry(&self, call: &ToolCall) -> Result<serde_json::Value, ToolError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result: ToolResult = self.tools.execute(call).await;

            if result.is_success() {
                return Ok(result.output.unwrap_or(serde_json::Value::Null));
            }

            let error = result
                .error
                .unwrap_or_else(|| ToolError::execution_failed("tool returned no error detail"));

            if error.is_transient() && attempt < self.config.max_attempts {
                let delay = self.config.retry_base_delay * 2u32.saturating_pow(attempt - 1);
                debug!(
                    tool = %call.tool_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Transient tool error, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(error);
        }
    }

    /// Placeholder result used only when no real tool is reachable.
    fn synthesize(
        &self,
        iteration: u32,
        request: &ContextRequest,
        key: &str,
    ) -> ContextRecord {
        let raw = serde_json::json!({
            "results": [],
            "query": request.query,
            "files": request.files,
            "synthetic": true,
        });
        let summary = format!(
            "no tool available for {}; synthesized empty result",
            request.context_type
        );
        ContextRecord::new(
            iteration,
            request.context_type,
            ContextPayload::new(raw, summary),
            key,
            ResolutionSource::Synthetic,
        )
    }

    fn run_cache_get(&self, key: &str) -> Option<ContextRecord> {
        self.run_cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(key).cloned())
    }

    fn run_cache_put(&self, key: &str, record: &ContextRecord) {
        if let Ok(mut cache) = self.run_cache.lock() {
            cache.insert(key.to_string(), record.clone());
        }
    }
}

/// Build the tool call for a request.
///
/// Arguments follow one shape for every tool: `query`, `files`, and
/// `path` (first target file) — tools read what they need.
fn build_call(tool_name: &str, request: &ContextRequest) -> ToolCall {
    let mut call = ToolCall::new(tool_name)
        .with_arg("query", request.query.as_str())
        .with_arg("files", serde_json::json!(request.files));
    if let Some(first) = request.files.first() {
        call = call.with_arg("path", first.as_str());
    }
    call
}

/// Short, review-ready summary of a tool's raw output.
fn summarize_output(
    context_type: ContextType,
    tool_name: &str,
    output: &serde_json::Value,
) -> String {
    let detail = if let Some(matches) = output.get("matches").and_then(|m| m.as_array()) {
        format!("{} matches", matches.len())
    } else if let Some(commits) = output.get("commits").and_then(|c| c.as_array()) {
        format!("{} commits", commits.len())
    } else if let Some(content) = output.get("content").and_then(|c| c.as_str()) {
        format!("{} bytes read", content.len())
    } else {
        truncate(&output.to_string(), 120)
    };
    format!("{} via {}: {}", context_type, tool_name, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::context_cache::NoCache;
    use async_trait::async_trait;
    use panel_domain::{ToolCatalog, ToolDescriptor};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Executor whose tools fail a configurable number of times.
    struct ScriptedExecutor {
        catalog: ToolCatalog,
        calls: AtomicU32,
        failures_before_success: u32,
        failure: fn() -> ToolError,
    }

    impl ScriptedExecutor {
        fn new(catalog: ToolCatalog) -> Self {
            Self {
                catalog,
                calls: AtomicU32::new(0),
                failures_before_success: 0,
                failure: || ToolError::transient("busy"),
            }
        }

        fn failing(mut self, count: u32, failure: fn() -> ToolError) -> Self {
            self.failures_before_success = count;
            self.failure = failure;
            self
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ToolExecutorPort for ScriptedExecutor {
        fn catalog(&self) -> &ToolCatalog {
            &self.catalog
        }

        async fn execute(&self, call: &ToolCall) -> ToolResult {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures_before_success {
                ToolResult::failure(&call.tool_name, (self.failure)())
            } else {
                ToolResult::success(
                    &call.tool_name,
                    serde_json::json!({"matches": [{"file": "src/a.rs", "line": 3}]}),
                )
            }
        }
    }

    fn search_catalog() -> ToolCatalog {
        ToolCatalog::new()
            .register(
                ToolDescriptor::new("zoekt_search", "code-search", "Indexed code search")
                    .with_keywords(["search"]),
            )
            .register(
                ToolDescriptor::new("search_files", "file-search", "Regex file search")
                    .with_keywords(["search", "grep"]),
            )
            .register(ToolDescriptor::new("read_file", "file-read", "Read one file"))
    }

    fn resolver_with(
        executor: ScriptedExecutor,
        config: ContextConfig,
    ) -> (Arc<ScriptedExecutor>, ContextResolver<ScriptedExecutor>) {
        let executor = Arc::new(executor);
        let resolver = ContextResolver::new(Arc::clone(&executor), Arc::new(NoCache), config);
        (executor, resolver)
    }

    fn fast_config() -> ContextConfig {
        ContextConfig {
            retry_base_delay: Duration::from_millis(1),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_exact_capability_wins() {
        let (_, resolver) = resolver_with(ScriptedExecutor::new(search_catalog()), fast_config());

        let request = ContextRequest::new(ContextType::CodeSearch, "login handler");
        let resolved = resolver.resolve(1, &request).await;

        assert!(!resolved.cache_hit);
        assert!(resolved.record.is_usable());
        assert_eq!(resolved.record.source, ResolutionSource::ExactCapability);
        assert!(resolved.record.payload.summary.contains("zoekt_search"));
    }

    #[tokio::test]
    async fn test_prefix_fallback_when_no_exact_match() {
        // Catalog without a code-search capable tool
        let catalog = ToolCatalog::new()
            .register(
                ToolDescriptor::new("search_files", "file-search", "Regex file search")
                    .with_keywords(["search"]),
            )
            .register(ToolDescriptor::new("read_file", "file-read", "Read one file"));
        let (_, resolver) = resolver_with(ScriptedExecutor::new(catalog), fast_config());

        let request = ContextRequest::new(ContextType::CodeSearch, "login");
        let resolved = resolver.resolve(1, &request).await;

        assert_eq!(resolved.record.source, ResolutionSource::PrefixMatch);
        assert!(resolved.record.is_usable());
    }

    #[tokio::test]
    async fn test_configured_fallback_priority() {
        let catalog = ToolCatalog::new()
            .register(ToolDescriptor::new("read_file", "file-read", "Read one file"))
            .register(ToolDescriptor::new(
                "search_files",
                "file-search",
                "Regex file search",
            ));
        let config =
            fast_config().with_fallback(ContextType::SymbolAnalysis, "read_file");
        let (_, resolver) = resolver_with(ScriptedExecutor::new(catalog), config);

        let request = ContextRequest::new(ContextType::SymbolAnalysis, "HttpClient")
            .with_files(["src/client.rs"]);
        let resolved = resolver.resolve(1, &request).await;

        assert_eq!(resolved.record.source, ResolutionSource::ConfiguredFallback);
    }

    #[tokio::test]
    async fn test_synthetic_when_catalog_empty() {
        let (executor, resolver) =
            resolver_with(ScriptedExecutor::new(ToolCatalog::new()), fast_config());

        let request = ContextRequest::new(ContextType::TestCoverage, "").with_files(["src/a.rs"]);
        let resolved = resolver.resolve(2, &request).await;

        assert!(resolved.record.synthetic);
        assert_eq!(resolved.record.source, ResolutionSource::Synthetic);
        assert!(resolved.record.is_usable());
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transient_errors_retried_then_success() {
        let executor =
            ScriptedExecutor::new(search_catalog()).failing(2, || ToolError::transient("busy"));
        let (executor, resolver) = resolver_with(executor, fast_config());

        let request = ContextRequest::new(ContextType::CodeSearch, "retry me");
        let resolved = resolver.resolve(1, &request).await;

        assert!(resolved.record.is_usable());
        // 2 failures + 1 success on the first tool
        assert_eq!(executor.call_count(), 3);
    }

    #[tokio::test]
    async fn test_hard_failure_returns_failed_record() {
        let executor = ScriptedExecutor::new(search_catalog())
            .failing(u32::MAX, || ToolError::execution_failed("segfault"));
        let (executor, resolver) = resolver_with(executor, fast_config());

        let request = ContextRequest::new(ContextType::CodeSearch, "boom");
        let resolved = resolver.resolve(1, &request).await;

        assert!(resolved.record.failed);
        assert!(resolved.record.payload.summary.contains("segfault"));
        // Hard failure does not advance the chain
        assert_eq!(executor.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cache_idempotence() {
        let (executor, resolver) =
            resolver_with(ScriptedExecutor::new(search_catalog()), fast_config());

        let request = ContextRequest::new(ContextType::CodeSearch, "cached query")
            .with_files(["src/a.rs", "src/b.rs"]);

        let first = resolver.resolve(1, &request).await;
        assert!(!first.cache_hit);
        assert_eq!(executor.call_count(), 1);

        // Same key, different file order and iteration: served from cache
        let again = ContextRequest::new(ContextType::CodeSearch, "Cached  Query")
            .with_files(["src/b.rs", "src/a.rs"]);
        let second = resolver.resolve(2, &again).await;

        assert!(second.cache_hit);
        assert_eq!(executor.call_count(), 1);
        assert_eq!(second.record.cache_key, first.record.cache_key);
        assert_eq!(second.record.iteration, 2);
    }

    #[tokio::test]
    async fn test_failed_records_not_cached() {
        let executor = ScriptedExecutor::new(search_catalog())
            .failing(1, || ToolError::execution_failed("flaky"));
        let (executor, resolver) = resolver_with(executor, fast_config());

        let request = ContextRequest::new(ContextType::CodeSearch, "flaky");
        let first = resolver.resolve(1, &request).await;
        assert!(first.record.failed);

        // A retry after a hard failure reaches the tool again
        let second = resolver.resolve(1, &request).await;
        assert!(!second.cache_hit);
        assert!(second.record.is_usable());
        assert_eq!(executor.call_count(), 2);
    }
}
