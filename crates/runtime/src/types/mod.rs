//! Core identifier and enumeration types shared across the runtime.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub mod error;

pub use error::{LlmError, RuntimeError, RuntimeResult, StoreError, ToolError, ToolErrorKind};

/// Unique identifier for a deliberation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Execution status of a workflow session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    InProgress,
    AwaitingHuman,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    /// Terminal states never transition again (Completed may still gain
    /// a deliverables bundle in the same run).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Pending => "pending",
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::AwaitingHuman => "awaiting_human",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Failed => "failed",
            WorkflowStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles participating in a deliberation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Master,
    SolutionArchitect,
    ReviewerNfr,
    ReviewerSecurity,
    ReviewerIntegration,
    ReviewerDomain,
    ReviewerOps,
    Adjudicator,
    Faq,
    Human,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Master => "master",
            AgentRole::SolutionArchitect => "solution_architect",
            AgentRole::ReviewerNfr => "reviewer_nfr",
            AgentRole::ReviewerSecurity => "reviewer_security",
            AgentRole::ReviewerIntegration => "reviewer_integration",
            AgentRole::ReviewerDomain => "reviewer_domain",
            AgentRole::ReviewerOps => "reviewer_ops",
            AgentRole::Adjudicator => "adjudicator",
            AgentRole::Faq => "faq",
            AgentRole::Human => "human",
        }
    }

    pub fn is_reviewer(&self) -> bool {
        matches!(
            self,
            AgentRole::ReviewerNfr
                | AgentRole::ReviewerSecurity
                | AgentRole::ReviewerIntegration
                | AgentRole::ReviewerDomain
                | AgentRole::ReviewerOps
        )
    }

    /// Parse a role from its wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "master" => Some(AgentRole::Master),
            "solution_architect" => Some(AgentRole::SolutionArchitect),
            "reviewer_nfr" => Some(AgentRole::ReviewerNfr),
            "reviewer_security" => Some(AgentRole::ReviewerSecurity),
            "reviewer_integration" => Some(AgentRole::ReviewerIntegration),
            "reviewer_domain" => Some(AgentRole::ReviewerDomain),
            "reviewer_ops" => Some(AgentRole::ReviewerOps),
            "adjudicator" => Some(AgentRole::Adjudicator),
            "faq" => Some(AgentRole::Faq),
            "human" => Some(AgentRole::Human),
            _ => None,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
    Revise,
    Escalate,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::Approve => "approve",
            ReviewDecision::Reject => "reject",
            ReviewDecision::Revise => "revise",
            ReviewDecision::Escalate => "escalate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "approve" => Some(ReviewDecision::Approve),
            "reject" => Some(ReviewDecision::Reject),
            "revise" => Some(ReviewDecision::Revise),
            "escalate" => Some(ReviewDecision::Escalate),
            _ => None,
        }
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity grading used by reviews, disagreements, and risks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions a human can take at the approval gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HumanAction {
    Approve,
    Revise,
}

impl HumanAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "approve" => Some(HumanAction::Approve),
            "revise" => Some(HumanAction::Revise),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_round_trip() {
        let id = SessionId::new();
        let parsed = SessionId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn role_serde_uses_snake_case() {
        let json = serde_json::to_string(&AgentRole::ReviewerSecurity).unwrap();
        assert_eq!(json, "\"reviewer_security\"");
        let restored: AgentRole = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, AgentRole::ReviewerSecurity);
    }

    #[test]
    fn role_parse_matches_as_str() {
        for role in [
            AgentRole::Master,
            AgentRole::SolutionArchitect,
            AgentRole::ReviewerNfr,
            AgentRole::ReviewerSecurity,
            AgentRole::ReviewerIntegration,
            AgentRole::ReviewerDomain,
            AgentRole::ReviewerOps,
            AgentRole::Adjudicator,
            AgentRole::Faq,
            AgentRole::Human,
        ] {
            assert_eq!(AgentRole::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn terminal_statuses() {
        assert!(WorkflowStatus::Completed.is_terminal());
        assert!(WorkflowStatus::Failed.is_terminal());
        assert!(!WorkflowStatus::AwaitingHuman.is_terminal());
        assert!(!WorkflowStatus::InProgress.is_terminal());
    }
}
