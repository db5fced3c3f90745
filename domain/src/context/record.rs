//! Resolved context records.

use super::request::ContextType;
use serde::{Deserialize, Serialize};

/// Which step of the resolution chain produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// A tool whose capability matched the context type exactly
    ExactCapability,
    /// The explicitly configured fallback tool for the type
    ConfiguredFallback,
    /// A generic capability-prefix match
    PrefixMatch,
    /// No reachable tool; the resolver synthesized a placeholder
    Synthetic,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &str {
        match self {
            ResolutionSource::ExactCapability => "exact_capability",
            ResolutionSource::ConfiguredFallback => "configured_fallback",
            ResolutionSource::PrefixMatch => "prefix_match",
            ResolutionSource::Synthetic => "synthetic",
        }
    }
}

/// Raw and garnished result of one context request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextPayload {
    /// Raw tool output (structured where the tool provides structure)
    pub raw: serde_json::Value,
    /// Short, review-ready summary of the raw output
    pub summary: String,
}

impl ContextPayload {
    pub fn new(raw: serde_json::Value, summary: impl Into<String>) -> Self {
        Self {
            raw,
            summary: summary.into(),
        }
    }
}

/// One resolved context request, append-only within a specialist run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextRecord {
    /// Iteration the request was made in
    pub iteration: u32,
    pub context_type: ContextType,
    pub payload: ContextPayload,
    /// Rough token estimate for the payload
    pub tokens: u32,
    /// Rough cost estimate in USD
    pub cost_usd: f64,
    /// Composite cache key the record is stored under
    pub cache_key: String,
    /// The request could not be served; payload carries the error
    #[serde(default)]
    pub failed: bool,
    /// The payload was synthesized, not produced by a real tool
    #[serde(default)]
    pub synthetic: bool,
    /// Which resolution step produced the record
    pub source: ResolutionSource,
}

impl ContextRecord {
    pub fn new(
        iteration: u32,
        context_type: ContextType,
        payload: ContextPayload,
        cache_key: impl Into<String>,
        source: ResolutionSource,
    ) -> Self {
        // ~4 bytes per token is close enough for budgeting
        let tokens = (payload.summary.len() / 4) as u32;
        Self {
            iteration,
            context_type,
            payload,
            tokens,
            cost_usd: 0.0,
            cache_key: cache_key.into(),
            failed: false,
            synthetic: matches!(source, ResolutionSource::Synthetic),
            source,
        }
    }

    /// Record for a request that could not be served by any tool.
    pub fn failed(
        iteration: u32,
        context_type: ContextType,
        cache_key: impl Into<String>,
        error: impl Into<String>,
        source: ResolutionSource,
    ) -> Self {
        let error = error.into();
        let payload = ContextPayload::new(
            serde_json::json!({ "error": error }),
            format!("context gathering failed: {}", error),
        );
        Self {
            iteration,
            context_type,
            payload,
            tokens: 0,
            cost_usd: 0.0,
            cache_key: cache_key.into(),
            failed: true,
            synthetic: false,
            source,
        }
    }

    pub fn with_cost(mut self, cost_usd: f64) -> Self {
        self.cost_usd = cost_usd;
        self
    }

    pub fn is_usable(&self) -> bool {
        !self.failed
    }
}
