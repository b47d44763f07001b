//! Central tool registry and execution wrapper.
//!
//! Built once at startup and read-only afterwards. Every execution runs
//! under a per-call deadline with bounded retry on transient failures and
//! begin/end logging. The wrapper never raises: all failure paths collapse
//! into a failed `ToolResult`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{Tool, ToolContext, ToolResult};
use crate::config::ToolsConfig;
use crate::types::ToolError;

/// Named tool singletons plus the shared retry policy.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    config: ToolsConfig,
}

impl ToolRegistry {
    pub fn new(config: ToolsConfig) -> Self {
        Self {
            tools: HashMap::new(),
            config,
        }
    }

    /// Registry preloaded with the built-in tools.
    pub fn with_builtins(config: ToolsConfig) -> Self {
        let mut registry = Self::new(config);
        registry.register(Arc::new(super::DiagramTool::new(None)));
        registry.register(Arc::new(super::ResearchTool::new(None)));
        registry
    }

    /// Register a tool. Overwrites any previous tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_lowercase(), tool);
    }

    /// Look up a tool by case-insensitive name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(&name.to_lowercase()).cloned()
    }

    /// Registered tool names, sorted for deterministic output.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool with timeout, retry, and logging. Never errors.
    pub async fn execute(
        &self,
        name: &str,
        operation: &str,
        params: &serde_json::Value,
        ctx: &ToolContext,
    ) -> ToolResult {
        let Some(tool) = self.get(name) else {
            tracing::error!(tool = name, "tool not found");
            return ToolResult::failed(
                name,
                ToolError::invalid_operation(format!(
                    "tool '{name}' not found; available: {:?}",
                    self.names()
                )),
            );
        };

        tracing::info!(tool = name, operation, "tool execution started");

        let mut last_error = ToolError::execution("no attempts made");
        for attempt in 0..self.config.max_attempts {
            if attempt > 0 {
                let backoff = self.backoff_delay(attempt);
                tracing::warn!(
                    tool = name,
                    operation,
                    attempt = attempt + 1,
                    max_attempts = self.config.max_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %last_error,
                    "retrying tool execution"
                );
                tokio::time::sleep(backoff).await;
            }

            let outcome = tokio::time::timeout(tool.timeout(), tool.execute(operation, params, ctx))
                .await
                .unwrap_or_else(|_| {
                    Err(ToolError::timeout(format!(
                        "execution exceeded {:?}",
                        tool.timeout()
                    )))
                });

            match outcome {
                Ok(result) => {
                    tracing::info!(
                        tool = name,
                        operation,
                        success = result.success,
                        "tool execution finished"
                    );
                    return result;
                }
                Err(error) => {
                    if !error.kind.is_transient() {
                        tracing::error!(tool = name, operation, error = %error, "tool contract error");
                        return ToolResult::failed(name, error);
                    }
                    last_error = error;
                }
            }
        }

        tracing::error!(
            tool = name,
            operation,
            attempts = self.config.max_attempts,
            error = %last_error,
            "tool execution failed after retries"
        );
        ToolResult::failed(name, last_error)
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = self.config.backoff_factor.powi(attempt.saturating_sub(1) as i32);
        Duration::from_millis((self.config.base_backoff_ms as f64 * factor) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolErrorKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config() -> ToolsConfig {
        ToolsConfig {
            max_attempts: 3,
            backoff_factor: 1.5,
            base_backoff_ms: 1,
        }
    }

    struct CountingTool {
        name: &'static str,
        calls: AtomicU32,
        fail_first: u32,
        error: fn() -> ToolError,
        delay: Option<Duration>,
    }

    impl CountingTool {
        fn transient(fail_first: u32) -> Self {
            Self {
                name: "flaky",
                calls: AtomicU32::new(0),
                fail_first,
                error: || ToolError::execution("transient blip"),
                delay: None,
            }
        }
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "a test tool"
        }

        fn timeout(&self) -> Duration {
            Duration::from_millis(50)
        }

        async fn execute(
            &self,
            _operation: &str,
            _params: &serde_json::Value,
            _ctx: &ToolContext,
        ) -> Result<ToolResult, ToolError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err((self.error)());
            }
            Ok(ToolResult::ok(self.name, "done"))
        }
    }

    #[tokio::test]
    async fn unknown_tool_fails_without_raising() {
        let registry = ToolRegistry::new(fast_config());
        let result = registry
            .execute("ghost", "anything", &serde_json::json!({}), &ToolContext::default())
            .await;
        assert!(!result.success);
        assert_eq!(
            result.error.map(|e| e.kind),
            Some(ToolErrorKind::InvalidOperation)
        );
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let tool = Arc::new(CountingTool::transient(2));
        let mut registry = ToolRegistry::new(fast_config());
        registry.register(tool.clone());

        let result = registry
            .execute("flaky", "op", &serde_json::json!({}), &ToolContext::default())
            .await;
        assert!(result.success);
        assert_eq!(tool.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn contract_errors_are_not_retried() {
        let tool = Arc::new(CountingTool {
            name: "strict",
            calls: AtomicU32::new(0),
            fail_first: 10,
            error: || ToolError::invalid_parameter("bad params"),
            delay: None,
        });
        let mut registry = ToolRegistry::new(fast_config());
        registry.register(tool.clone());

        let result = registry
            .execute("strict", "op", &serde_json::json!({}), &ToolContext::default())
            .await;
        assert!(!result.success);
        assert_eq!(tool.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            result.error.map(|e| e.kind),
            Some(ToolErrorKind::InvalidParameter)
        );
    }

    #[tokio::test]
    async fn slow_tool_times_out_and_retries() {
        let tool = Arc::new(CountingTool {
            name: "slow",
            calls: AtomicU32::new(0),
            fail_first: 0,
            error: || ToolError::execution("unused"),
            delay: Some(Duration::from_secs(5)),
        });
        let mut registry = ToolRegistry::new(fast_config());
        registry.register(tool);

        let result = registry
            .execute("slow", "op", &serde_json::json!({}), &ToolContext::default())
            .await;
        assert!(!result.success);
        assert_eq!(result.error.map(|e| e.kind), Some(ToolErrorKind::Timeout));
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive() {
        let mut registry = ToolRegistry::new(fast_config());
        registry.register(Arc::new(CountingTool::transient(0)));
        assert!(registry.get("FLAKY").is_some());
        assert!(registry.get("flaky").is_some());
    }

    #[tokio::test]
    async fn builtins_are_registered() {
        let registry = ToolRegistry::with_builtins(fast_config());
        assert_eq!(registry.names(), vec!["diagram", "research"]);
    }
}
