//! Deliverables bundle: the deterministic artefact assembled from
//! terminal workflow state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AgentRole, Severity};

mod builder;
mod diagrams;
mod report;

pub use builder::DeliverablesBuilder;

/// Version stamp written into every bundle.
pub const WORKFLOW_VERSION: &str = "1.0";

/// High-level architecture summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchitectureSummary {
    pub overview: String,
    pub key_capabilities: Vec<String>,
    pub non_functional_highlights: Vec<String>,
}

/// An ADR-style decision record. IDs match `ADR-\d{3}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionRecord {
    pub id: String,
    pub title: String,
    pub context: String,
    pub decision: String,
    pub rationale: String,
    pub consequences: String,
}

/// A risk with its mitigation. IDs match `RISK-\d{3}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskItem {
    pub id: String,
    pub description: String,
    pub impact: Severity,
    pub likelihood: String,
    pub mitigation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<AgentRole>,
}

/// A question-and-answer pair for the review board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Kinds of diagram emitted with every bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramKind {
    Context,
    IntegrationFlow,
    Deployment,
    Sequence,
}

impl DiagramKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramKind::Context => "context",
            DiagramKind::IntegrationFlow => "integration_flow",
            DiagramKind::Deployment => "deployment",
            DiagramKind::Sequence => "sequence",
        }
    }
}

/// A diagram reference: either an external-service URL or an inline
/// text-graph (Mermaid) source. Consumers must render whichever is present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagramDescriptor {
    pub kind: DiagramKind,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mermaid_source: Option<String>,
}

/// The complete deliverables bundle for one session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliverablesBundle {
    pub session_id: crate::types::SessionId,
    pub architecture_summary: ArchitectureSummary,
    pub decisions: Vec<DecisionRecord>,
    pub risks: Vec<RiskItem>,
    pub faqs: Vec<FaqItem>,
    pub diagrams: Vec<DiagramDescriptor>,
    pub markdown_report: String,
    pub generated_at: DateTime<Utc>,
    pub workflow_version: String,
    pub includes_tool_insights: bool,
    pub demo_mode: bool,
}
