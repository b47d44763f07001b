//! Workflow state: the single source of truth for one deliberation session.
//!
//! The whole state serialises to one JSON document. Sequence fields are
//! append-only within a session and only mutated through the methods here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::deliverables::DeliverablesBundle;
use crate::tools::ToolResult;
use crate::types::{AgentRole, ReviewDecision, SessionId, Severity, WorkflowStatus};

mod store;

pub use store::{SessionPage, SessionSummary, SqliteStateStore, StateStore};

/// Hard ceiling on reviewer rounds, blocking accidental loops.
pub const MAX_ROUNDS: u32 = 10;

/// A single agent's contribution to the deliberation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub agent_role: AgentRole,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<ReviewDecision>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResult>,
}

/// Structured feedback from one reviewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewFeedback {
    pub reviewer_role: AgentRole,
    pub decision: ReviewDecision,
    #[serde(default)]
    pub concerns: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub rationale: String,
    #[serde(default)]
    pub severity: Severity,
}

/// A named component of the evolving design.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DesignComponent {
    pub name: String,
    #[serde(default)]
    pub responsibility: String,
}

/// A connection to an external system.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IntegrationPoint {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// The evolving solution design, replaced (with a version bump) on each
/// architect revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignDocument {
    pub version: u32,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub architecture_overview: String,
    #[serde(default)]
    pub components: Vec<DesignComponent>,
    #[serde(default)]
    pub nfr_considerations: BTreeMap<String, String>,
    #[serde(default)]
    pub security_considerations: BTreeMap<String, String>,
    #[serde(default)]
    pub integration_points: Vec<IntegrationPoint>,
    #[serde(default)]
    pub deployment_notes: String,
    #[serde(default)]
    pub diagrams: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

/// A typed conflict between reviewer outputs within a round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disagreement {
    pub id: String,
    pub agent_roles: Vec<AgentRole>,
    pub topic: String,
    /// Role name → stated position.
    pub positions: BTreeMap<String, String>,
    pub severity: Severity,
    /// `decision_conflict`, `pattern_conflict_<name>`, or `severity_conflict`.
    pub category: String,
    pub detected_at: DateTime<Utc>,
}

/// Result of one bounded debate over a single disagreement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateOutcome {
    pub id: String,
    pub disagreement: Disagreement,
    pub rounds: u32,
    pub revised_positions: BTreeMap<String, String>,
    pub consensus_reached: bool,
    pub resolution_summary: String,
    /// Resolution confidence in [0, 1].
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

/// Weighted consensus across one round of reviews and its debates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub round_id: String,
    pub agreed: bool,
    pub confidence: f64,
    pub summary: String,
    pub resolved_ids: Vec<String>,
    pub unresolved_ids: Vec<String>,
    pub vote_breakdown: BTreeMap<String, ReviewDecision>,
    pub weights_applied: BTreeMap<String, f64>,
    pub threshold: f64,
    pub timestamp: DateTime<Utc>,
}

/// One complete reviewer round: the fan-out snapshot plus detection,
/// debates, and consensus attached as the round progresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerRoundResult {
    pub round_number: u32,
    pub reviews: Vec<ReviewFeedback>,
    #[serde(default)]
    pub disagreements: Vec<Disagreement>,
    #[serde(default)]
    pub debates: Vec<DebateOutcome>,
    #[serde(default)]
    pub consensus: Option<ConsensusResult>,
    #[serde(default)]
    pub requires_adjudication: bool,
    pub timestamp: DateTime<Utc>,
}

/// One question-and-answer pair produced during the deliberation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Bookkeeping carried alongside the main state fields.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StateMetadata {
    /// Run-once guard for the adjudicator node.
    pub adjudicator_run_count: u32,
    pub key_takeaways: Vec<String>,
    /// Records every safeguard that fired (timeouts, repetition, forced
    /// consensus, skipped re-adjudication).
    pub safeguard_flags: Vec<String>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// The full state of one deliberation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub user_request: String,
    #[serde(default)]
    pub user_context: BTreeMap<String, serde_json::Value>,
    pub status: WorkflowStatus,
    /// The last node that committed.
    #[serde(default)]
    pub current_node: String,
    #[serde(default)]
    pub messages: Vec<AgentMessage>,
    /// Full audit log of reviews, across every round.
    #[serde(default)]
    pub reviews: Vec<ReviewFeedback>,
    /// Index into `reviews` marking where the next round snapshot begins.
    #[serde(default)]
    pub reviews_cursor: usize,
    #[serde(default)]
    pub reviewer_rounds: Vec<ReviewerRoundResult>,
    #[serde(default)]
    pub debates: Vec<DebateOutcome>,
    #[serde(default)]
    pub consensus_history: Vec<ConsensusResult>,
    #[serde(default)]
    pub current_design: Option<DesignDocument>,
    #[serde(default)]
    pub final_design: Option<DesignDocument>,
    #[serde(default)]
    pub revision_count: u32,
    pub max_revisions: u32,
    #[serde(default)]
    pub current_round: u32,
    #[serde(default)]
    pub requires_adjudication: bool,
    #[serde(default)]
    pub adjudication_complete: bool,
    #[serde(default)]
    pub final_architecture_rationale: String,
    #[serde(default)]
    pub decision_rationale: String,
    #[serde(default)]
    pub final_summary: String,
    #[serde(default)]
    pub human_approved: bool,
    #[serde(default)]
    pub human_feedback: Vec<String>,
    #[serde(default)]
    pub faq_entries: Vec<FaqEntry>,
    #[serde(default)]
    pub metadata: StateMetadata,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub deliverables: Option<DeliverablesBundle>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
    /// Create the initial state for a new session.
    pub fn new(
        user_request: impl Into<String>,
        user_context: BTreeMap<String, serde_json::Value>,
        max_revisions: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: SessionId::new(),
            name: None,
            description: None,
            user_request: user_request.into(),
            user_context,
            status: WorkflowStatus::Pending,
            current_node: String::new(),
            messages: Vec::new(),
            reviews: Vec::new(),
            reviews_cursor: 0,
            reviewer_rounds: Vec::new(),
            debates: Vec::new(),
            consensus_history: Vec::new(),
            current_design: None,
            final_design: None,
            revision_count: 0,
            max_revisions,
            current_round: 0,
            requires_adjudication: false,
            adjudication_complete: false,
            final_architecture_rationale: String::new(),
            decision_rationale: String::new(),
            final_summary: String::new(),
            human_approved: false,
            human_feedback: Vec::new(),
            faq_entries: Vec::new(),
            metadata: StateMetadata::default(),
            errors: Vec::new(),
            warnings: Vec::new(),
            deliverables: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append an agent message.
    pub fn add_message(
        &mut self,
        agent_role: AgentRole,
        content: impl Into<String>,
        success: bool,
        decision: Option<ReviewDecision>,
        tool_results: Vec<ToolResult>,
    ) {
        self.messages.push(AgentMessage {
            agent_role,
            timestamp: Utc::now(),
            content: content.into(),
            success,
            decision,
            tool_results,
        });
        self.touch();
    }

    /// Append a review to the audit log.
    pub fn add_review(&mut self, review: ReviewFeedback) {
        self.reviews.push(review);
        self.touch();
    }

    /// Reviews appended since the last round snapshot.
    pub fn pending_reviews(&self) -> &[ReviewFeedback] {
        &self.reviews[self.reviews_cursor.min(self.reviews.len())..]
    }

    /// Snapshot pending reviews into a new round and advance the cursor.
    pub fn open_round(&mut self) -> &mut ReviewerRoundResult {
        let round_number = self.reviewer_rounds.len() as u32 + 1;
        let reviews = self.pending_reviews().to_vec();
        self.reviews_cursor = self.reviews.len();
        self.reviewer_rounds.push(ReviewerRoundResult {
            round_number,
            reviews,
            disagreements: Vec::new(),
            debates: Vec::new(),
            consensus: None,
            requires_adjudication: false,
            timestamp: Utc::now(),
        });
        self.current_round = round_number;
        self.touch();
        self.reviewer_rounds
            .last_mut()
            .expect("round was just pushed")
    }

    /// The latest round, if any.
    pub fn latest_round(&self) -> Option<&ReviewerRoundResult> {
        self.reviewer_rounds.last()
    }

    pub fn latest_round_mut(&mut self) -> Option<&mut ReviewerRoundResult> {
        self.reviewer_rounds.last_mut()
    }

    /// Reviews driving routing decisions: the latest round's snapshot.
    pub fn latest_round_reviews(&self) -> &[ReviewFeedback] {
        self.latest_round().map(|r| &r.reviews[..]).unwrap_or(&[])
    }

    /// Latest committed design from the solution architect.
    pub fn latest_design_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.agent_role == AgentRole::SolutionArchitect)
            .map(|m| m.content.as_str())
    }

    /// Whether another revision loop is allowed.
    pub fn can_revise(&self) -> bool {
        self.revision_count < self.max_revisions
    }

    /// Whether another reviewer round is allowed.
    pub fn can_open_round(&self) -> bool {
        self.current_round < MAX_ROUNDS
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.touch();
    }

    pub fn record_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
        self.touch();
    }

    pub fn record_safeguard(&mut self, flag: impl Into<String>) {
        self.metadata.safeguard_flags.push(flag.into());
        self.touch();
    }

    /// Bump the `updated_at` timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> WorkflowState {
        WorkflowState::new("Design a payments integration", BTreeMap::new(), 3)
    }

    fn review(role: AgentRole, decision: ReviewDecision) -> ReviewFeedback {
        ReviewFeedback {
            reviewer_role: role,
            decision,
            concerns: vec![],
            suggestions: vec![],
            rationale: "fine".into(),
            severity: Severity::Low,
        }
    }

    #[test]
    fn new_state_is_pending_and_empty() {
        let s = state();
        assert_eq!(s.status, WorkflowStatus::Pending);
        assert!(s.messages.is_empty());
        assert!(s.reviewer_rounds.is_empty());
        assert_eq!(s.revision_count, 0);
        assert_eq!(s.current_round, 0);
        assert!(s.deliverables.is_none());
    }

    #[test]
    fn open_round_snapshots_pending_reviews() {
        let mut s = state();
        s.add_review(review(AgentRole::ReviewerNfr, ReviewDecision::Approve));
        s.add_review(review(AgentRole::ReviewerSecurity, ReviewDecision::Revise));

        let round = s.open_round();
        assert_eq!(round.round_number, 1);
        assert_eq!(round.reviews.len(), 2);
        assert_eq!(s.current_round, 1);
        assert!(s.pending_reviews().is_empty());

        // Reviews from a second fan-out land in the next snapshot only.
        s.add_review(review(AgentRole::ReviewerNfr, ReviewDecision::Approve));
        let round = s.open_round();
        assert_eq!(round.round_number, 2);
        assert_eq!(round.reviews.len(), 1);
        // The audit log keeps everything.
        assert_eq!(s.reviews.len(), 3);
    }

    #[test]
    fn latest_round_reviews_is_empty_before_first_round() {
        let s = state();
        assert!(s.latest_round_reviews().is_empty());
    }

    #[test]
    fn revision_and_round_ceilings() {
        let mut s = state();
        assert!(s.can_revise());
        s.revision_count = 3;
        assert!(!s.can_revise());

        assert!(s.can_open_round());
        s.current_round = MAX_ROUNDS;
        assert!(!s.can_open_round());
    }

    #[test]
    fn state_round_trips_through_json() {
        let mut s = state();
        s.add_message(AgentRole::Master, "analysis", true, None, vec![]);
        s.add_review(review(AgentRole::ReviewerNfr, ReviewDecision::Approve));
        s.open_round();
        s.record_warning("w1");
        s.record_safeguard("debate_timeout");

        let json = serde_json::to_string(&s).unwrap();
        let restored: WorkflowState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.session_id, s.session_id);
        assert_eq!(restored.messages.len(), 1);
        assert_eq!(restored.reviewer_rounds.len(), 1);
        assert_eq!(restored.reviews_cursor, 1);
        assert_eq!(restored.warnings, vec!["w1".to_string()]);
        assert_eq!(
            restored.metadata.safeguard_flags,
            vec!["debate_timeout".to_string()]
        );
    }
}
