//! External tool contract.
//!
//! Every tool exposes the same `execute(operation, params, ctx)` shape and
//! returns a uniform `ToolResult`. Failures are folded into the result by
//! the registry; the kernel never sees a raised tool error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::types::{SessionId, ToolError};

mod demo;
mod registry;

pub use demo::{DiagramTool, ResearchTool};
pub use registry::ToolRegistry;

/// Uniform result shape for every tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_name: String,
    pub success: bool,
    pub summary: String,
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ToolResult {
    pub fn ok(tool_name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            summary: summary.into(),
            details: serde_json::Value::Object(Default::default()),
            artifacts: None,
            error: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn failed(tool_name: impl Into<String>, error: ToolError) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            summary: format!("Error: {}", error.message),
            details: serde_json::Value::Object(Default::default()),
            artifacts: None,
            error: Some(error),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_artifacts(mut self, artifacts: Vec<String>) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Workflow context handed to every tool call.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub session_id: Option<SessionId>,
    /// Forces canned responses regardless of credentials.
    pub demo_mode: bool,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ToolContext {
    pub fn demo() -> Self {
        Self {
            demo_mode: true,
            ..Default::default()
        }
    }
}

/// A capability the runtime can invoke on behalf of agents.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable identifier, matched case-insensitively by the registry.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Per-call deadline. 30 s default; analysis tools use 45 s and
    /// LLM-wrapper tools 60 s.
    fn timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    /// Execute one operation. Implementations return `ToolError` for
    /// failures; the registry folds those into a failed `ToolResult`.
    async fn execute(
        &self,
        operation: &str,
        params: &serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError>;
}
