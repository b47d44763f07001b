//! Performer agents: roles that produce or transform content.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::prompts;
use crate::llm::{GenerationRequest, LlmGateway};
use crate::state::{ConsensusResult, DebateOutcome, Disagreement, ReviewFeedback};
use crate::tools::{ToolContext, ToolRegistry, ToolResult};
use crate::types::{AgentRole, LlmError};

/// Everything a performer may need from the session. Builders only read
/// the fields relevant to their role.
#[derive(Debug, Clone, Default)]
pub struct PerformerContext {
    pub user_context_json: String,
    pub reviews: Vec<ReviewFeedback>,
    pub debates: Vec<DebateOutcome>,
    pub consensus: Option<ConsensusResult>,
    pub unresolved: Vec<Disagreement>,
    pub current_design: Option<String>,
    pub revision: u32,
    /// `(role, content)` pairs summarising the discussion so far.
    pub messages: Vec<(String, String)>,
}

/// Result of a performer run.
#[derive(Debug, Clone)]
pub struct PerformerOutput {
    /// For JSON-mode roles this is guaranteed to be valid JSON, possibly
    /// the degraded `{"analysis": ...}` wrapper.
    pub content: String,
    pub success: bool,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub tool_results: Vec<ToolResult>,
    pub warnings: Vec<String>,
}

/// A role-specialised content producer: system prompt, prompt builder,
/// gateway call, strict parse with degraded fallback.
pub struct PerformerAgent {
    role: AgentRole,
    gateway: Arc<LlmGateway>,
    tools: Arc<ToolRegistry>,
    demo_mode: bool,
}

impl PerformerAgent {
    pub fn new(
        role: AgentRole,
        gateway: Arc<LlmGateway>,
        tools: Arc<ToolRegistry>,
        demo_mode: bool,
    ) -> Self {
        Self {
            role,
            gateway,
            tools,
            demo_mode,
        }
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    /// Run the performer over the request and context.
    pub async fn run(
        &self,
        request: &str,
        context: &PerformerContext,
    ) -> Result<PerformerOutput, LlmError> {
        tracing::info!(role = %self.role, "performer started");

        let mut tool_results = Vec::new();
        let mut warnings = Vec::new();

        // The master grounds its analysis with a research lookup.
        if self.role == AgentRole::Master {
            let ctx = ToolContext {
                session_id: None,
                demo_mode: self.demo_mode,
                extra: BTreeMap::new(),
            };
            let result = self
                .tools
                .execute(
                    "research",
                    "analyze",
                    &serde_json::json!({ "topic": request }),
                    &ctx,
                )
                .await;
            if !result.success {
                warnings.push(format!(
                    "research tool unavailable: {}",
                    result
                        .error
                        .as_ref()
                        .map(|e| e.message.clone())
                        .unwrap_or_default()
                ));
            }
            tool_results.push(result);
        }

        let prompt = self.build_prompt(request, context);
        let temperature = match self.role {
            // Adjudication favours consistency over creativity.
            AgentRole::Adjudicator => 0.3,
            _ => 0.7,
        };

        let generation = GenerationRequest::new(prompt)
            .with_system_prompt(prompts::system_prompt(self.role))
            .with_selector_hint(request.to_string())
            .with_role(self.role.as_str().to_string())
            .with_temperature(temperature)
            .json();

        let raw = self.gateway.generate(generation).await?;

        // JSON mode guarantees syntactic validity; the schema check decides
        // whether we keep the payload or degrade it.
        let (content, success) = match self.validate_schema(&raw) {
            Ok(()) => (raw, true),
            Err(e) => {
                tracing::warn!(role = %self.role, error = %e, "performer output failed schema parse");
                warnings.push(format!("{} output failed schema parse: {e}", self.role));
                (super::outputs::raw_fallback(&raw), false)
            }
        };

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "agent".to_string(),
            serde_json::Value::String(self.role.as_str().to_string()),
        );

        tracing::info!(role = %self.role, success, "performer finished");
        Ok(PerformerOutput {
            content,
            success,
            metadata,
            tool_results,
            warnings,
        })
    }

    fn build_prompt(&self, request: &str, context: &PerformerContext) -> String {
        match self.role {
            AgentRole::Master => prompts::master_prompt(request, &context.user_context_json),
            AgentRole::SolutionArchitect => prompts::solution_prompt(
                request,
                &context.reviews,
                context.current_design.as_deref(),
                context.revision,
            ),
            AgentRole::Adjudicator => prompts::adjudicator_prompt(
                request,
                context.current_design.as_deref().unwrap_or(request),
                &context.reviews,
                &context.debates,
                context.consensus.as_ref(),
                &context.unresolved,
            ),
            AgentRole::Faq => prompts::faq_prompt(&context.messages, &context.reviews),
            other => {
                // Critic roles never reach a performer; fall back to the bare
                // request so a misrouted call still produces something.
                tracing::warn!(role = %other, "performer invoked for non-performer role");
                request.to_string()
            }
        }
    }

    fn validate_schema(&self, raw: &str) -> Result<(), serde_json::Error> {
        use super::outputs::{Adjudication, FaqOutput, MasterAnalysis, SolutionDesign};
        match self.role {
            AgentRole::Master => serde_json::from_str::<MasterAnalysis>(raw).map(|_| ()),
            AgentRole::SolutionArchitect => serde_json::from_str::<SolutionDesign>(raw).map(|_| ()),
            AgentRole::Adjudicator => serde_json::from_str::<Adjudication>(raw).map(|_| ()),
            AgentRole::Faq => serde_json::from_str::<FaqOutput>(raw).map(|_| ()),
            _ => serde_json::from_str::<serde_json::Value>(raw).map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SelectorConfig, ToolsConfig};
    use crate::llm::provider::{InferenceProvider, ProviderRequest, ProviderResponse};
    use crate::llm::{CannedProvider, ModelSelector, PromptGuard};
    use async_trait::async_trait;

    fn agent_with(provider: Arc<dyn InferenceProvider>, role: AgentRole) -> PerformerAgent {
        let gateway = Arc::new(LlmGateway::new(
            provider,
            PromptGuard::new(false),
            ModelSelector::new(SelectorConfig::default()),
        ));
        let tools = Arc::new(ToolRegistry::with_builtins(ToolsConfig::default()));
        PerformerAgent::new(role, gateway, tools, true)
    }

    #[tokio::test]
    async fn master_attaches_research_tool_result() {
        let agent = agent_with(Arc::new(CannedProvider::new()), AgentRole::Master);
        let output = agent
            .run("Integrate CRM with ERP", &PerformerContext::default())
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.tool_results.len(), 1);
        assert!(output.tool_results[0].success);
        // Content parses into the declared schema.
        let parsed: super::super::outputs::MasterAnalysis =
            serde_json::from_str(&output.content).unwrap();
        assert!(!parsed.requirements_summary.is_empty());
    }

    struct WrongShapeProvider;

    #[async_trait]
    impl InferenceProvider for WrongShapeProvider {
        async fn generate(&self, _: &ProviderRequest) -> Result<ProviderResponse, LlmError> {
            // Valid JSON, wrong shape for the adjudicator schema.
            Ok(ProviderResponse {
                content: r#"{"final_decisions": "not-a-list"}"#.into(),
                model: "test".into(),
            })
        }

        fn provider_name(&self) -> &str {
            "wrong-shape"
        }
    }

    #[tokio::test]
    async fn schema_mismatch_degrades_to_raw_fallback() {
        let agent = agent_with(Arc::new(WrongShapeProvider), AgentRole::Adjudicator);
        let output = agent.run("req", &PerformerContext::default()).await.unwrap();
        assert!(!output.success);
        assert_eq!(output.warnings.len(), 1);
        let value: serde_json::Value = serde_json::from_str(&output.content).unwrap();
        assert!(value["analysis"].as_str().unwrap().contains("final_decisions"));
    }
}
