//! Application-level configuration.
//!
//! These types control how use cases behave — concurrency caps,
//! timeouts, budgets. They are application concerns, not domain policy,
//! and are populated by the infrastructure config loader.

use panel_domain::{ContextType, Specialty, SpecialtyProfile};
use std::collections::HashMap;
use std::time::Duration;

/// Orchestrator behavior: roster override, concurrency, timeouts.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Fixed roster override; `None` plans from task complexity
    pub roster: Option<Vec<Specialty>>,
    /// Specialists allowed in flight at once
    pub max_concurrent: usize,
    /// Hard wall-clock timeout per specialist
    pub specialist_timeout: Duration,
    /// Per-specialty execution profile overrides
    pub profiles: HashMap<Specialty, SpecialtyProfile>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            roster: None,
            max_concurrent: 4,
            specialist_timeout: Duration::from_secs(300),
            profiles: HashMap::new(),
        }
    }
}

impl OrchestratorConfig {
    /// Profile for a specialty: override if configured, preset otherwise.
    pub fn profile(&self, specialty: Specialty) -> SpecialtyProfile {
        self.profiles
            .get(&specialty)
            .copied()
            .unwrap_or_else(|| SpecialtyProfile::for_specialty(specialty))
    }

    pub fn with_roster(mut self, roster: Vec<Specialty>) -> Self {
        self.roster = Some(roster);
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn with_specialist_timeout(mut self, timeout: Duration) -> Self {
        self.specialist_timeout = timeout;
        self
    }

    pub fn with_profile(mut self, specialty: Specialty, profile: SpecialtyProfile) -> Self {
        self.profiles.insert(specialty, profile);
        self
    }
}

/// Context resolution behavior: cache TTL, retries, fallbacks.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// TTL for entries in the external cache tier
    pub cache_ttl: Duration,
    /// Attempts per tool for transient errors (first try included)
    pub max_attempts: u32,
    /// Base delay for exponential retry backoff
    pub retry_base_delay: Duration,
    /// Explicitly configured fallback tool per context type
    pub fallback_tools: HashMap<ContextType, String>,
    /// Abort a specialist on the first failed context item
    pub fail_fast: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(100),
            fallback_tools: HashMap::new(),
            fail_fast: false,
        }
    }
}

impl ContextConfig {
    pub fn with_fallback(mut self, context_type: ContextType, tool: impl Into<String>) -> Self {
        self.fallback_tools.insert(context_type, tool.into());
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

/// Workflow queue behavior: processing timeout, polling, backoff.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Expected processing timeout; record TTL is twice this
    pub processing_timeout: Duration,
    /// Poll interval for `wait_for_result`
    pub poll_interval: Duration,
    /// Worker sleep when the queue is empty
    pub idle_backoff: Duration,
    /// Worker sleep after a loop-level error
    pub error_backoff: Duration,
}

impl QueueConfig {
    /// TTL applied to request records: 2x the processing timeout, so a
    /// record outlives any waiter that could still poll it.
    pub fn record_ttl(&self) -> Duration {
        self.processing_timeout * 2
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            processing_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_millis(250),
            idle_backoff: Duration::from_secs(2),
            error_backoff: Duration::from_secs(5),
        }
    }
}

/// CI handler behavior.
#[derive(Debug, Clone)]
pub struct CiConfig {
    /// Workflow file to dispatch
    pub workflow: String,
    /// Hard timeout for one CI run
    pub run_timeout: Duration,
    /// Poll interval while a run is in flight
    pub poll_interval: Duration,
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            workflow: "test.yml".to_string(),
            run_timeout: Duration::from_secs(600),
            poll_interval: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orchestrator_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.specialist_timeout, Duration::from_secs(300));
        assert!(config.roster.is_none());
    }

    #[test]
    fn test_profile_override() {
        let config = OrchestratorConfig::default()
            .with_profile(Specialty::Security, SpecialtyProfile::new(5, 3));

        assert_eq!(config.profile(Specialty::Security).max_iterations(), 5);
        // Unconfigured specialties fall back to presets
        assert_eq!(config.profile(Specialty::Alignment).max_iterations(), 3);
    }

    #[test]
    fn test_max_concurrent_floor() {
        let config = OrchestratorConfig::default().with_max_concurrent(0);
        assert_eq!(config.max_concurrent, 1);
    }

    #[test]
    fn test_queue_record_ttl_is_double_timeout() {
        let config = QueueConfig {
            processing_timeout: Duration::from_secs(120),
            ..Default::default()
        };
        assert_eq!(config.record_ttl(), Duration::from_secs(240));
    }
}
