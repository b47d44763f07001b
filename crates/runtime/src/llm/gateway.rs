//! Safety-wrapped, retryable LLM gateway.
//!
//! Every agent generation goes through here: guard screening, banner
//! injection, tier selection, bounded retry with exponential backoff, and
//! JSON-mode enforcement.

use std::sync::Arc;
use std::time::Duration;

use super::guards::PromptGuard;
use super::provider::{InferenceProvider, ProviderRequest};
use super::selector::{estimate_tokens, ModelSelector, ModelTier};
use crate::types::LlmError;

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(500);

/// One generation request as agents express it.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// The user-side prompt.
    pub prompt: String,
    /// Role-specific system prompt.
    pub system_prompt: Option<String>,
    /// Short task description driving tier selection. Falls back to the
    /// prompt itself when empty.
    pub selector_hint: String,
    /// Calling role name, for role-based tier rules.
    pub role: Option<String>,
    /// When set, the response is guaranteed to parse as JSON.
    pub json_mode: bool,
    pub temperature: f32,
    /// Explicit tier override for this call (bypasses selection).
    pub tier: Option<ModelTier>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            selector_hint: String::new(),
            role: None,
            json_mode: false,
            temperature: 0.3,
            tier: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_selector_hint(mut self, hint: impl Into<String>) -> Self {
        self.selector_hint = hint.into();
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// The gateway. Cheap to clone via `Arc`.
pub struct LlmGateway {
    provider: Arc<dyn InferenceProvider>,
    guard: PromptGuard,
    selector: ModelSelector,
    max_attempts: u32,
    base_backoff: Duration,
}

impl LlmGateway {
    pub fn new(
        provider: Arc<dyn InferenceProvider>,
        guard: PromptGuard,
        selector: ModelSelector,
    ) -> Self {
        Self {
            provider,
            guard,
            selector,
            max_attempts: MAX_ATTEMPTS,
            base_backoff: BASE_BACKOFF,
        }
    }

    /// Override retry tuning (used by tests to avoid real sleeps).
    pub fn with_retry(mut self, max_attempts: u32, base_backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.base_backoff = base_backoff;
        self
    }

    /// Run one generation. On success with `json_mode`, the returned string
    /// is guaranteed to parse as JSON.
    pub async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError> {
        let safe_prompt = self.guard.sanitize_input(&request.prompt)?;
        let system_prompt = request
            .system_prompt
            .as_deref()
            .map(|sp| self.guard.apply_banner(sp));

        let context_tokens = estimate_tokens(&safe_prompt)
            + system_prompt.as_deref().map(estimate_tokens).unwrap_or(0);

        let tier = match request.tier {
            Some(tier) => tier,
            None => {
                let hint = if request.selector_hint.is_empty() {
                    &request.prompt
                } else {
                    &request.selector_hint
                };
                let (tier, auto) =
                    self.selector
                        .select(hint, request.role.as_deref(), Some(context_tokens));
                tracing::debug!(
                    tier = tier.as_str(),
                    auto,
                    context_tokens,
                    "model tier selected"
                );
                tier
            }
        };

        let window = self.provider.context_window(tier);
        if !self.selector.validate_context(window, context_tokens) {
            return Err(LlmError::Provider(format!(
                "context of {context_tokens} tokens exceeds the {} tier window of {window}",
                tier.as_str()
            )));
        }

        let provider_request = ProviderRequest {
            prompt: safe_prompt,
            system_prompt,
            tier,
            temperature: request.temperature,
            json_mode: request.json_mode,
        };

        let mut last_err = LlmError::Provider("no attempts made".into());
        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = self.base_backoff * 2u32.saturating_pow(attempt - 1);
                tokio::time::sleep(delay).await;
            }

            match self.attempt(&provider_request).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "generation attempt failed"
                    );
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    async fn attempt(&self, request: &ProviderRequest) -> Result<String, LlmError> {
        let response = self.provider.generate(request).await?;
        self.guard.validate_output(&response.content)?;

        if request.json_mode {
            serde_json::from_str::<serde_json::Value>(&response.content).map_err(|e| {
                LlmError::Provider(format!("JSON-mode output was not valid JSON: {e}"))
            })?;
        }

        tracing::debug!(
            model = %response.model,
            output_len = response.content.len(),
            "generation succeeded"
        );
        Ok(response.content)
    }
}
