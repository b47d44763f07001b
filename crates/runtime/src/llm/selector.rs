//! Model tier selection.
//!
//! Maps a task description, the calling role, and an estimated context size
//! onto one of four abstract capability tiers. Rules are ordered; the first
//! match wins. Keeps expensive tiers for the work that needs them.

use serde::{Deserialize, Serialize};

use crate::config::SelectorConfig;

/// Abstract model capability tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Strongest reasoning, reserved for security and compliance work.
    HighPlus,
    /// Complex reasoning and large context.
    High,
    /// Standard tasks and iteration.
    Mid,
    /// Lightweight classification and summaries.
    Low,
}

impl ModelTier {
    /// Context window in tokens for each tier.
    pub fn context_window(&self) -> usize {
        match self {
            ModelTier::HighPlus | ModelTier::High => 2_000_000,
            ModelTier::Mid | ModelTier::Low => 1_000_000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::HighPlus => "high_plus",
            ModelTier::High => "high",
            ModelTier::Mid => "mid",
            ModelTier::Low => "low",
        }
    }
}

const SECURITY_KEYWORDS: &[&str] = &[
    "security",
    "governance",
    "policy",
    "compliance",
    "audit",
    "gdpr",
    "hipaa",
    "sox",
    "pci",
    "encryption",
    "authentication",
    "authorization",
    "vulnerability",
    "penetration",
    "threat",
];

const ARCHITECTURE_KEYWORDS: &[&str] = &[
    "architecture",
    "integration",
    "nfr",
    "high volume",
    "scalability",
    "distributed",
    "microservices",
    "enterprise",
    "multi-tenant",
    "performance optimization",
    "load balancing",
    "caching strategy",
    "disaster recovery",
    "high availability",
    "fault tolerance",
];

const SIMPLE_KEYWORDS: &[&str] = &["review", "feedback", "quick", "polish", "summary", "list"];

/// Rough token estimate: ~4 characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

/// Tier selection engine.
pub struct ModelSelector {
    config: SelectorConfig,
}

impl ModelSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    /// Select a tier. Returns the tier and whether it was auto-selected.
    ///
    /// A manual override is honoured only when `auto_mode` is off.
    pub fn select(
        &self,
        description: &str,
        role: Option<&str>,
        context_tokens: Option<usize>,
    ) -> (ModelTier, bool) {
        if !self.config.auto_mode {
            if let Some(tier) = self.config.manual_override {
                tracing::info!(tier = tier.as_str(), "model tier manually overridden");
                return (tier, false);
            }
        }
        (self.auto_select(description, role, context_tokens), true)
    }

    fn auto_select(
        &self,
        description: &str,
        role: Option<&str>,
        context_tokens: Option<usize>,
    ) -> ModelTier {
        let desc_lower = description.to_lowercase();
        let desc_len = description.len();

        // 1. Very large contexts need a large window.
        if let Some(tokens) = context_tokens {
            if tokens > 1_000_000 {
                return ModelTier::High;
            }
        }

        // 2. Security, governance, compliance.
        if SECURITY_KEYWORDS.iter().any(|k| desc_lower.contains(k)) {
            return ModelTier::HighPlus;
        }

        // 3. Architectural complexity.
        if ARCHITECTURE_KEYWORDS.iter().any(|k| desc_lower.contains(k)) {
            return ModelTier::High;
        }

        // 4. Role-based selection.
        if let Some(role) = role {
            let role_lower = role.to_lowercase();
            if role_lower.contains("master")
                || role_lower.contains("solution_architect")
                || role_lower.contains("solution-architect")
                || role_lower.contains("adjudicator")
            {
                return ModelTier::High;
            }
            if role_lower.contains("security") {
                return ModelTier::HighPlus;
            }
            if ["suggestion", "faq", "quick"]
                .iter()
                .any(|k| role_lower.contains(k))
            {
                return ModelTier::Low;
            }
        }

        // 5. Long descriptions imply complex work.
        if desc_len > 400 {
            return ModelTier::High;
        }

        // 6. Short, simple tasks.
        if SIMPLE_KEYWORDS.iter().any(|k| desc_lower.contains(k)) && desc_len < 200 {
            return ModelTier::Low;
        }

        // 7. Default.
        ModelTier::Mid
    }

    /// Whether a context window covers the required token count. The
    /// window comes from the live provider's `context_window`, not the
    /// static catalog, so validation follows whatever backend actually
    /// serves the tier.
    pub fn validate_context(&self, window: usize, context_tokens: usize) -> bool {
        context_tokens <= window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> ModelSelector {
        ModelSelector::new(SelectorConfig::default())
    }

    #[test]
    fn huge_context_picks_high() {
        let (tier, auto) = selector().select("short task", None, Some(1_500_000));
        assert_eq!(tier, ModelTier::High);
        assert!(auto);
    }

    #[test]
    fn security_keywords_pick_high_plus() {
        let (tier, _) = selector().select("Review the encryption and compliance posture", None, None);
        assert_eq!(tier, ModelTier::HighPlus);
    }

    #[test]
    fn architecture_keywords_pick_high() {
        let (tier, _) = selector().select("Plan a distributed caching strategy", None, None);
        assert_eq!(tier, ModelTier::High);
    }

    #[test]
    fn role_rules_apply_after_keywords() {
        let (tier, _) = selector().select("draft the proposal", Some("master"), None);
        assert_eq!(tier, ModelTier::High);
        let (tier, _) = selector().select("draft the proposal", Some("reviewer_security"), None);
        assert_eq!(tier, ModelTier::HighPlus);
        let (tier, _) = selector().select("draft entries", Some("faq"), None);
        assert_eq!(tier, ModelTier::Low);
    }

    #[test]
    fn long_description_picks_high() {
        let long = "x".repeat(401);
        let (tier, _) = selector().select(&long, None, None);
        assert_eq!(tier, ModelTier::High);
    }

    #[test]
    fn short_simple_task_picks_low() {
        let (tier, _) = selector().select("quick summary of the notes", None, None);
        assert_eq!(tier, ModelTier::Low);
    }

    #[test]
    fn default_is_mid() {
        let (tier, _) = selector().select("draft the onboarding plan", None, None);
        assert_eq!(tier, ModelTier::Mid);
    }

    #[test]
    fn manual_override_requires_auto_mode_off() {
        let mut config = SelectorConfig::default();
        config.manual_override = Some(ModelTier::Low);
        // auto_mode on: override ignored.
        let selector = ModelSelector::new(config.clone());
        let (tier, auto) = selector.select("Plan a distributed rollout", None, None);
        assert_eq!(tier, ModelTier::High);
        assert!(auto);

        config.auto_mode = false;
        let selector = ModelSelector::new(config);
        let (tier, auto) = selector.select("Plan a distributed rollout", None, None);
        assert_eq!(tier, ModelTier::Low);
        assert!(!auto);
    }

    #[test]
    fn context_validation_respects_windows() {
        let s = selector();
        assert!(s.validate_context(ModelTier::Low.context_window(), 900_000));
        assert!(!s.validate_context(ModelTier::Low.context_window(), 1_200_000));
        assert!(s.validate_context(ModelTier::High.context_window(), 1_200_000));
        // A provider reporting a tighter window than the catalog is honoured.
        assert!(!s.validate_context(500_000, 900_000));
    }

    #[test]
    fn token_estimate_is_len_over_four() {
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens(""), 0);
    }
}
