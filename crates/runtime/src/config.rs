//! Configuration for the deliberation runtime.
//!
//! Provides nested, serde-deserialisable config structs with secure defaults,
//! TOML file loading, and environment variable overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::llm::selector::ModelTier;
use crate::types::AgentRole;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("IO error reading config file: {message}")]
    IoError { message: String },

    #[error("Configuration parsing error: {message}")]
    ParseError { message: String },
}

/// Main runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Workflow loop bounds and reviewer fan-out.
    pub workflow: WorkflowConfig,
    /// Debate safeguard tuning.
    pub debate: DebateConfig,
    /// Consensus weights and threshold.
    pub consensus: ConsensusConfig,
    /// Model tier selection.
    pub selector: SelectorConfig,
    /// Tool execution policy.
    pub tools: ToolsConfig,
    /// State store location.
    pub store: StoreConfig,
    /// Demo mode: canned tool responses and fallback diagrams everywhere.
    pub demo_mode: bool,
}

/// Workflow loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Cap on solution-architect revision loops.
    pub max_revisions: u32,
    /// Reviewer roles that fan out each round.
    pub reviewers: Vec<AgentRole>,
    /// Run-once budget for the adjudicator.
    pub adjudicator_max_runs: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_revisions: 3,
            reviewers: vec![
                AgentRole::ReviewerNfr,
                AgentRole::ReviewerSecurity,
                AgentRole::ReviewerIntegration,
            ],
            adjudicator_max_runs: 1,
        }
    }
}

/// Debate engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateConfig {
    /// Hard cap on debate rounds per disagreement.
    pub max_rounds: u32,
    /// Per-round deadline in seconds.
    pub round_timeout_secs: u64,
    /// Whether to compare consecutive rounds for repeated arguments.
    pub enable_repetition_detection: bool,
    /// Average position similarity at or above which the debate is cut short.
    pub repetition_similarity_threshold: f64,
    /// Whether safeguards close the debate as consensus instead of leaving
    /// it unresolved.
    pub enable_forced_consensus: bool,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            round_timeout_secs: 60,
            enable_repetition_detection: true,
            repetition_similarity_threshold: 0.85,
            enable_forced_consensus: true,
        }
    }
}

impl DebateConfig {
    pub fn round_timeout(&self) -> Duration {
        Duration::from_secs(self.round_timeout_secs)
    }
}

/// Consensus computation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Minimum confidence for agreement.
    pub threshold: f64,
    /// Per-role vote weights. Roles absent here use `default_weight`.
    pub role_weights: BTreeMap<AgentRole, f64>,
    /// Weight for roles without an explicit entry.
    pub default_weight: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        let mut role_weights = BTreeMap::new();
        role_weights.insert(AgentRole::Master, 0.25);
        role_weights.insert(AgentRole::SolutionArchitect, 0.25);
        role_weights.insert(AgentRole::ReviewerSecurity, 0.15);
        role_weights.insert(AgentRole::ReviewerNfr, 0.10);
        role_weights.insert(AgentRole::ReviewerIntegration, 0.10);
        role_weights.insert(AgentRole::ReviewerDomain, 0.08);
        role_weights.insert(AgentRole::ReviewerOps, 0.07);
        Self {
            threshold: 0.65,
            role_weights,
            default_weight: 0.05,
        }
    }
}

impl ConsensusConfig {
    pub fn weight_for(&self, role: AgentRole) -> f64 {
        self.role_weights
            .get(&role)
            .copied()
            .unwrap_or(self.default_weight)
    }
}

/// Model tier selection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// When true (default) the rule engine picks the tier; a manual
    /// override is honoured only when this is false.
    pub auto_mode: bool,
    /// Manual tier override used when `auto_mode` is false.
    pub manual_override: Option<ModelTier>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            auto_mode: true,
            manual_override: None,
        }
    }
}

/// Tool execution policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Retry attempts per tool call (first try included).
    pub max_attempts: u32,
    /// Exponential backoff multiplier between attempts.
    pub backoff_factor: f64,
    /// Base backoff delay in milliseconds.
    pub base_backoff_ms: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor: 1.5,
            base_backoff_ms: 500,
        }
    }
}

/// State store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database path. `None` uses the platform data directory;
    /// the literal `":memory:"` opens an in-memory store.
    pub path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: None }
    }
}

impl RuntimeConfig {
    /// Load configuration from a TOML file, then apply environment
    /// overrides and validate.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            message: format!("{}: {e}", path.display()),
        })?;
        let mut config: RuntimeConfig =
            toml::from_str(&raw).map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = RuntimeConfig::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("QUORUM_DEMO_MODE") {
            self.demo_mode = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(v) = env::var("QUORUM_MAX_REVISIONS") {
            if let Ok(n) = v.parse() {
                self.workflow.max_revisions = n;
            }
        }
        if let Ok(v) = env::var("QUORUM_DB_PATH") {
            self.store.path = Some(PathBuf::from(v));
        }
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debate.max_rounds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "debate.max_rounds".into(),
                reason: "must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.debate.repetition_similarity_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "debate.repetition_similarity_threshold".into(),
                reason: "must be within [0, 1]".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.consensus.threshold) {
            return Err(ConfigError::InvalidValue {
                key: "consensus.threshold".into(),
                reason: "must be within [0, 1]".into(),
            });
        }
        if self.tools.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "tools.max_attempts".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.workflow.reviewers.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "workflow.reviewers".into(),
                reason: "at least one reviewer role is required".into(),
            });
        }
        if let Some(role) = self.workflow.reviewers.iter().find(|r| !r.is_reviewer()) {
            return Err(ConfigError::InvalidValue {
                key: "workflow.reviewers".into(),
                reason: format!("{role} is not a reviewer role"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.workflow.max_revisions, 3);
        assert_eq!(config.debate.max_rounds, 3);
        assert!((config.consensus.threshold - 0.65).abs() < f64::EPSILON);
        assert!(config.selector.auto_mode);
    }

    #[test]
    fn default_weights_match_role_table() {
        let config = ConsensusConfig::default();
        assert!((config.weight_for(AgentRole::Master) - 0.25).abs() < f64::EPSILON);
        assert!((config.weight_for(AgentRole::ReviewerSecurity) - 0.15).abs() < f64::EPSILON);
        assert!((config.weight_for(AgentRole::ReviewerOps) - 0.07).abs() < f64::EPSILON);
        // Faq has no entry and falls back to the default weight.
        assert!((config.weight_for(AgentRole::Faq) - 0.05).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut config = RuntimeConfig::default();
        config.consensus.threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_reviewer_in_fanout() {
        let mut config = RuntimeConfig::default();
        config.workflow.reviewers.push(AgentRole::Master);
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_partial_toml() {
        let toml = r#"
            demo_mode = true

            [workflow]
            max_revisions = 2

            [debate]
            max_rounds = 2
            round_timeout_secs = 5
        "#;
        let config: RuntimeConfig = toml::from_str(toml).unwrap();
        assert!(config.demo_mode);
        assert_eq!(config.workflow.max_revisions, 2);
        assert_eq!(config.debate.max_rounds, 2);
        assert_eq!(config.debate.round_timeout(), Duration::from_secs(5));
        // Untouched sections keep their defaults.
        assert!((config.consensus.threshold - 0.65).abs() < f64::EPSILON);
    }
}
