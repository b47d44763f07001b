//! Critic agents: reviewer roles that evaluate content.

use std::sync::Arc;

use super::outputs::ReviewerVerdict;
use super::prompts;
use crate::llm::{GenerationRequest, LlmGateway};
use crate::tools::{ToolRegistry, ToolResult};
use crate::types::{AgentRole, LlmError, ReviewDecision, Severity};

/// Structured result of a critic run.
#[derive(Debug, Clone)]
pub struct CriticOutput {
    pub decision: ReviewDecision,
    pub concerns: Vec<String>,
    pub suggestions: Vec<String>,
    pub rationale: String,
    pub severity: Severity,
    pub success: bool,
    pub tool_results: Vec<ToolResult>,
    pub warnings: Vec<String>,
}

/// A role-specialised reviewer.
pub struct CriticAgent {
    role: AgentRole,
    gateway: Arc<LlmGateway>,
    #[allow(dead_code)]
    tools: Arc<ToolRegistry>,
}

impl CriticAgent {
    pub fn new(role: AgentRole, gateway: Arc<LlmGateway>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            role,
            gateway,
            tools,
        }
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    /// Review the given content and return a structured verdict.
    pub async fn review(&self, content: &str) -> Result<CriticOutput, LlmError> {
        tracing::info!(role = %self.role, "review started");

        let prompt = prompts::reviewer_prompt(content, prompts::review_criteria(self.role));
        let generation = GenerationRequest::new(prompt)
            .with_system_prompt(prompts::system_prompt(self.role))
            .with_selector_hint(format!("review {}", prompts::review_criteria(self.role)))
            .with_role(self.role.as_str().to_string())
            .json();

        let raw = self.gateway.generate(generation).await?;

        let output = match serde_json::from_str::<ReviewerVerdict>(&raw) {
            Ok(verdict) => {
                let (decision, concerns, suggestions, rationale, severity, warnings) =
                    verdict.resolve();
                CriticOutput {
                    decision,
                    concerns,
                    suggestions,
                    rationale,
                    severity,
                    success: true,
                    tool_results: Vec::new(),
                    warnings,
                }
            }
            Err(e) => {
                tracing::warn!(role = %self.role, error = %e, "reviewer verdict failed to parse");
                CriticOutput {
                    decision: ReviewDecision::Revise,
                    concerns: Vec::new(),
                    suggestions: Vec::new(),
                    rationale: raw,
                    severity: Severity::Medium,
                    success: false,
                    tool_results: Vec::new(),
                    warnings: vec![format!("{} verdict failed to parse: {e}", self.role)],
                }
            }
        };

        tracing::info!(
            role = %self.role,
            decision = %output.decision,
            severity = %output.severity,
            "review finished"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SelectorConfig, ToolsConfig};
    use crate::llm::provider::{InferenceProvider, ProviderRequest, ProviderResponse};
    use crate::llm::{CannedProvider, ModelSelector, PromptGuard};
    use async_trait::async_trait;

    fn critic_with(provider: Arc<dyn InferenceProvider>) -> CriticAgent {
        let gateway = Arc::new(LlmGateway::new(
            provider,
            PromptGuard::new(false),
            ModelSelector::new(SelectorConfig::default()),
        ));
        let tools = Arc::new(ToolRegistry::with_builtins(ToolsConfig::default()));
        CriticAgent::new(AgentRole::ReviewerNfr, gateway, tools)
    }

    #[tokio::test]
    async fn canned_review_approves() {
        let critic = critic_with(Arc::new(CannedProvider::new()));
        let output = critic.review("a design").await.unwrap();
        assert!(output.success);
        assert_eq!(output.decision, ReviewDecision::Approve);
        assert_eq!(output.severity, Severity::Low);
    }

    struct ProseProvider;

    #[async_trait]
    impl InferenceProvider for ProseProvider {
        async fn generate(&self, _: &ProviderRequest) -> Result<ProviderResponse, LlmError> {
            // Valid JSON but not a verdict object.
            Ok(ProviderResponse {
                content: r#""looks fine to me""#.into(),
                model: "prose".into(),
            })
        }

        fn provider_name(&self) -> &str {
            "prose"
        }
    }

    #[tokio::test]
    async fn unparseable_verdict_degrades_to_revise() {
        let critic = critic_with(Arc::new(ProseProvider));
        let output = critic.review("a design").await.unwrap();
        assert!(!output.success);
        assert_eq!(output.decision, ReviewDecision::Revise);
        assert_eq!(output.severity, Severity::Medium);
        assert_eq!(output.warnings.len(), 1);
        assert!(output.rationale.contains("looks fine"));
    }
}
