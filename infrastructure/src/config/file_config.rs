//! Raw TOML configuration data types.
//!
//! These structs mirror the structure of `panel.toml` exactly and are
//! deserialized directly. Conversion into the application-layer config
//! types validates specialty and context-type names — unknown names are
//! configuration errors and are raised, not degraded.

use panel_application::{CiConfig, ContextConfig, OrchestratorConfig, QueueConfig};
use panel_domain::{ContextType, DomainError, Specialty, SpecialtyProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Orchestrator settings
    pub orchestrator: FileOrchestratorConfig,
    /// Per-specialty execution profiles, keyed by specialty tag
    pub specialists: BTreeMap<String, FileSpecialistConfig>,
    /// Context resolution settings
    pub context: FileContextConfig,
    /// Workflow queue settings
    pub queue: FileQueueConfig,
    /// CI handler settings
    pub ci: FileCiConfig,
    /// Memory settings
    pub memory: FileMemoryConfig,
    /// Event sink settings
    pub events: FileEventsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOrchestratorConfig {
    /// Fixed roster of specialty tags; empty plans from complexity
    pub roster: Vec<String>,
    pub max_concurrent: usize,
    pub specialist_timeout_secs: u64,
}

impl Default for FileOrchestratorConfig {
    fn default() -> Self {
        Self {
            roster: Vec::new(),
            max_concurrent: 4,
            specialist_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSpecialistConfig {
    pub max_iterations: u32,
    pub context_budget: usize,
}

impl Default for FileSpecialistConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2,
            context_budget: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileContextConfig {
    pub cache_ttl_secs: u64,
    pub max_attempts: u32,
    pub fail_fast: bool,
    /// Fallback tool name per context-type tag
    pub fallbacks: BTreeMap<String, String>,
}

impl Default for FileContextConfig {
    fn default() -> Self {
        let mut fallbacks = BTreeMap::new();
        fallbacks.insert("code_search".to_string(), "search_files".to_string());
        fallbacks.insert("symbol_analysis".to_string(), "read_file".to_string());
        fallbacks.insert("test_coverage".to_string(), "read_file".to_string());
        Self {
            cache_ttl_secs: 3600,
            max_attempts: 3,
            fail_fast: false,
            fallbacks,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileQueueConfig {
    pub processing_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub idle_backoff_ms: u64,
    pub error_backoff_ms: u64,
}

impl Default for FileQueueConfig {
    fn default() -> Self {
        Self {
            processing_timeout_secs: 300,
            poll_interval_ms: 250,
            idle_backoff_ms: 2000,
            error_backoff_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCiConfig {
    pub workflow: String,
    pub run_timeout_secs: u64,
    pub poll_interval_secs: u64,
}

impl Default for FileCiConfig {
    fn default() -> Self {
        Self {
            workflow: "test.yml".to_string(),
            run_timeout_secs: 600,
            poll_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMemoryConfig {
    /// JSONL file of past run outcomes
    pub history_path: String,
}

impl Default for FileMemoryConfig {
    fn default() -> Self {
        Self {
            history_path: ".panel/history.jsonl".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEventsConfig {
    /// JSONL lifecycle event log; empty disables the file sink
    pub jsonl_path: Option<String>,
}

impl FileConfig {
    /// Validate the configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for tag in &self.orchestrator.roster {
            if Specialty::parse(tag).is_err() {
                issues.push(format!("orchestrator.roster: unknown specialty '{}'", tag));
            }
        }
        for tag in self.specialists.keys() {
            if Specialty::parse(tag).is_err() {
                issues.push(format!("specialists: unknown specialty '{}'", tag));
            }
        }
        for tag in self.context.fallbacks.keys() {
            if ContextType::parse(tag).is_err() {
                issues.push(format!("context.fallbacks: unknown context type '{}'", tag));
            }
        }
        if self.orchestrator.max_concurrent == 0 {
            issues.push("orchestrator.max_concurrent must be >= 1".to_string());
        }
        issues
    }

    /// Build the orchestrator config; unknown specialty tags raise.
    pub fn orchestrator_config(&self) -> Result<OrchestratorConfig, DomainError> {
        let mut config = OrchestratorConfig::default()
            .with_max_concurrent(self.orchestrator.max_concurrent)
            .with_specialist_timeout(Duration::from_secs(
                self.orchestrator.specialist_timeout_secs,
            ));

        if !self.orchestrator.roster.is_empty() {
            let roster = self
                .orchestrator
                .roster
                .iter()
                .map(|tag| Specialty::parse(tag))
                .collect::<Result<Vec<_>, _>>()?;
            config = config.with_roster(roster);
        }

        for (tag, profile) in &self.specialists {
            let specialty = Specialty::parse(tag)?;
            config = config.with_profile(
                specialty,
                SpecialtyProfile::new(profile.max_iterations, profile.context_budget),
            );
        }

        Ok(config)
    }

    /// Build the context config; unknown context-type tags raise.
    pub fn context_config(&self) -> Result<ContextConfig, DomainError> {
        let mut config = ContextConfig {
            cache_ttl: Duration::from_secs(self.context.cache_ttl_secs),
            max_attempts: self.context.max_attempts.max(1),
            fail_fast: self.context.fail_fast,
            ..Default::default()
        };

        for (tag, tool) in &self.context.fallbacks {
            let context_type = ContextType::parse(tag)?;
            config.fallback_tools.insert(context_type, tool.clone());
        }

        Ok(config)
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            processing_timeout: Duration::from_secs(self.queue.processing_timeout_secs),
            poll_interval: Duration::from_millis(self.queue.poll_interval_ms),
            idle_backoff: Duration::from_millis(self.queue.idle_backoff_ms),
            error_backoff: Duration::from_millis(self.queue.error_backoff_ms),
        }
    }

    pub fn ci_config(&self) -> CiConfig {
        CiConfig {
            workflow: self.ci.workflow.clone(),
            run_timeout: Duration::from_secs(self.ci.run_timeout_secs),
            poll_interval: Duration::from_secs(self.ci.poll_interval_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = FileConfig::default();
        assert!(config.validate().is_empty());
        assert!(config.orchestrator_config().is_ok());
        assert!(config.context_config().is_ok());
    }

    #[test]
    fn test_toml_roundtrip() {
        let raw = r#"
            [orchestrator]
            roster = ["alignment", "security"]
            max_concurrent = 2
            specialist_timeout_secs = 60

            [specialists.security]
            max_iterations = 4
            context_budget = 3

            [context]
            cache_ttl_secs = 120
            fail_fast = true

            [context.fallbacks]
            code_search = "search_files"

            [queue]
            processing_timeout_secs = 30
        "#;
        let config: FileConfig = toml::from_str(raw).unwrap();
        assert!(config.validate().is_empty());

        let orchestrator = config.orchestrator_config().unwrap();
        assert_eq!(
            orchestrator.roster,
            Some(vec![Specialty::Alignment, Specialty::Security])
        );
        assert_eq!(orchestrator.max_concurrent, 2);
        assert_eq!(orchestrator.profile(Specialty::Security).max_iterations(), 4);

        let context = config.context_config().unwrap();
        assert!(context.fail_fast);
        assert_eq!(context.cache_ttl, Duration::from_secs(120));
        assert_eq!(
            context.fallback_tools.get(&ContextType::CodeSearch),
            Some(&"search_files".to_string())
        );

        assert_eq!(
            config.queue_config().record_ttl(),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_unknown_specialty_is_flagged_and_raised() {
        let raw = r#"
            [orchestrator]
            roster = ["alignment", "vibes"]
        "#;
        let config: FileConfig = toml::from_str(raw).unwrap();

        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("vibes"));
        assert!(config.orchestrator_config().is_err());
    }

    #[test]
    fn test_unknown_context_type_is_flagged() {
        let raw = r#"
            [context.fallbacks]
            crystal_ball = "read_file"
        "#;
        let config: FileConfig = toml::from_str(raw).unwrap();
        assert!(!config.validate().is_empty());
        assert!(config.context_config().is_err());
    }
}
