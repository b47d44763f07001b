//! The workflow kernel: node graph, conditional routing, human gate, and
//! failure semantics.
//!
//! Nodes execute sequentially; reviewer fan-outs and debates run
//! concurrently inside their nodes. State is persisted after every node
//! commit, so a crash at any point leaves a resumable session. Any node
//! error is caught here, recorded, and fails the workflow, except
//! deliverables generation, which may never regress a completed session.

use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::agents::{AgentFactory, CriticOutput, PerformerContext};
use crate::agents::outputs::{Adjudication, FaqOutput, SolutionDesign};
use crate::config::WorkflowConfig;
use crate::debate::{ConsensusEngine, DebateEngine, DisagreementDetector};
use crate::deliverables::{DeliverablesBuilder, DeliverablesBundle};
use crate::state::{ConsensusResult, ReviewFeedback, StateStore, WorkflowState};
use crate::tools::ToolContext;
use crate::types::{
    AgentRole, HumanAction, ReviewDecision, RuntimeError, RuntimeResult, SessionId, Severity,
    StoreError, WorkflowStatus,
};

/// Nodes of the workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowNode {
    MasterArchitect,
    SolutionArchitect,
    Reviewers,
    CreateReviewerRound,
    DetectDisagreements,
    DebateCycle,
    ComputeConsensus,
    Adjudicator,
    HumanApproval,
    FaqGeneration,
    Finalise,
    GenerateDeliverables,
}

impl WorkflowNode {
    /// Parse a node from its persisted name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "master_architect" => Some(WorkflowNode::MasterArchitect),
            "solution_architect" => Some(WorkflowNode::SolutionArchitect),
            "reviewers" => Some(WorkflowNode::Reviewers),
            "create_reviewer_round" => Some(WorkflowNode::CreateReviewerRound),
            "detect_disagreements" => Some(WorkflowNode::DetectDisagreements),
            "debate_cycle" => Some(WorkflowNode::DebateCycle),
            "compute_consensus" => Some(WorkflowNode::ComputeConsensus),
            "adjudicator" => Some(WorkflowNode::Adjudicator),
            "human_approval" => Some(WorkflowNode::HumanApproval),
            "faq_generation" => Some(WorkflowNode::FaqGeneration),
            "finalise" => Some(WorkflowNode::Finalise),
            "generate_deliverables" => Some(WorkflowNode::GenerateDeliverables),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowNode::MasterArchitect => "master_architect",
            WorkflowNode::SolutionArchitect => "solution_architect",
            WorkflowNode::Reviewers => "reviewers",
            WorkflowNode::CreateReviewerRound => "create_reviewer_round",
            WorkflowNode::DetectDisagreements => "detect_disagreements",
            WorkflowNode::DebateCycle => "debate_cycle",
            WorkflowNode::ComputeConsensus => "compute_consensus",
            WorkflowNode::Adjudicator => "adjudicator",
            WorkflowNode::HumanApproval => "human_approval",
            WorkflowNode::FaqGeneration => "faq_generation",
            WorkflowNode::Finalise => "finalise",
            WorkflowNode::GenerateDeliverables => "generate_deliverables",
        }
    }
}

impl std::fmt::Display for WorkflowNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only projection of a session's workflow state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub session_id: SessionId,
    pub status: WorkflowStatus,
    pub current_node: String,
    pub current_round: u32,
    pub revision_count: u32,
    pub max_revisions: u32,
    pub requires_adjudication: bool,
    pub adjudication_complete: bool,
    pub human_approved: bool,
    pub message_count: usize,
    pub review_count: usize,
    pub debate_count: usize,
    pub latest_consensus: Option<ConsensusResult>,
    pub final_summary: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub deliverables: Option<DeliverablesBundle>,
}

impl From<&WorkflowState> for WorkflowSnapshot {
    fn from(state: &WorkflowState) -> Self {
        Self {
            session_id: state.session_id,
            status: state.status,
            current_node: state.current_node.clone(),
            current_round: state.current_round,
            revision_count: state.revision_count,
            max_revisions: state.max_revisions,
            requires_adjudication: state.requires_adjudication,
            adjudication_complete: state.adjudication_complete,
            human_approved: state.human_approved,
            message_count: state.messages.len(),
            review_count: state.reviews.len(),
            debate_count: state.debates.len(),
            latest_consensus: state.consensus_history.last().cloned(),
            final_summary: state.final_summary.clone(),
            errors: state.errors.clone(),
            warnings: state.warnings.clone(),
            deliverables: state.deliverables.clone(),
        }
    }
}

/// The kernel. One per process; sessions partition by ID.
pub struct WorkflowKernel {
    store: Arc<dyn StateStore>,
    agents: Arc<AgentFactory>,
    debate_engine: Arc<DebateEngine>,
    detector: DisagreementDetector,
    consensus_engine: ConsensusEngine,
    builder: DeliverablesBuilder,
    config: WorkflowConfig,
    demo_mode: bool,
    running: DashSet<SessionId>,
}

impl WorkflowKernel {
    pub fn new(
        store: Arc<dyn StateStore>,
        agents: Arc<AgentFactory>,
        debate_engine: Arc<DebateEngine>,
        consensus_engine: ConsensusEngine,
        builder: DeliverablesBuilder,
        config: WorkflowConfig,
        demo_mode: bool,
    ) -> Self {
        Self {
            store,
            agents,
            debate_engine,
            detector: DisagreementDetector::new(),
            consensus_engine,
            builder,
            config,
            demo_mode,
            running: DashSet::new(),
        }
    }

    /// Run the kernel from the beginning until it reaches `AwaitingHuman`,
    /// `Completed`, or `Failed`.
    pub async fn start(&self, session_id: SessionId) -> RuntimeResult<WorkflowSnapshot> {
        let mut state = self.load(session_id).await?;

        let entry = match state.status {
            WorkflowStatus::Pending => WorkflowNode::MasterArchitect,
            WorkflowStatus::InProgress => {
                if self.running.contains(&session_id) {
                    return Err(RuntimeError::AlreadyRunning(session_id));
                }
                // The last run died mid-flight: resume by re-executing the
                // node that never committed.
                let node = WorkflowNode::parse(&state.current_node)
                    .unwrap_or(WorkflowNode::MasterArchitect);
                tracing::warn!(
                    session_id = %session_id,
                    node = %node,
                    "resuming interrupted session"
                );
                state.record_warning(format!("resumed after interruption at {node}"));
                node
            }
            WorkflowStatus::AwaitingHuman => {
                return Err(RuntimeError::WrongStatus {
                    status: state.status,
                    reason: "session is paused at the human gate; use step".into(),
                })
            }
            // Terminal sessions return their snapshot unchanged.
            _ => return Ok(WorkflowSnapshot::from(&state)),
        };

        let _guard = self.acquire(session_id)?;
        self.run_from(state, entry).await
    }

    /// Resume a session paused at the human gate.
    pub async fn step(
        &self,
        session_id: SessionId,
        action: HumanAction,
        comment: Option<String>,
    ) -> RuntimeResult<WorkflowSnapshot> {
        let mut state = self.load(session_id).await?;

        if state.status != WorkflowStatus::AwaitingHuman {
            return Err(RuntimeError::WrongStatus {
                status: state.status,
                reason: "step is only valid while awaiting human review".into(),
            });
        }

        let _guard = self.acquire(session_id)?;

        let resume_at = match action {
            HumanAction::Approve => {
                state.human_approved = true;
                if let Some(comment) = comment.filter(|c| !c.is_empty()) {
                    state.human_feedback.push(comment);
                }
                WorkflowNode::FaqGeneration
            }
            HumanAction::Revise => {
                let feedback = comment
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| {
                        "Please revise the design based on reviewer feedback.".into()
                    });
                state.human_feedback.push(feedback.clone());
                state.add_review(ReviewFeedback {
                    reviewer_role: AgentRole::Human,
                    decision: ReviewDecision::Revise,
                    concerns: Vec::new(),
                    suggestions: vec![feedback.clone()],
                    rationale: feedback,
                    severity: Severity::Medium,
                });
                // Human feedback stays out of round snapshots.
                state.reviews_cursor = state.reviews.len();

                if state.can_revise() {
                    state.revision_count += 1;
                    WorkflowNode::SolutionArchitect
                } else {
                    WorkflowNode::FaqGeneration
                }
            }
        };

        state.status = WorkflowStatus::InProgress;
        self.run_from(state, resume_at).await
    }

    /// Snapshot without advancing anything.
    pub async fn status(&self, session_id: SessionId) -> RuntimeResult<WorkflowSnapshot> {
        let state = self.load(session_id).await?;
        Ok(WorkflowSnapshot::from(&state))
    }

    async fn load(&self, session_id: SessionId) -> RuntimeResult<WorkflowState> {
        match self.store.load(session_id).await {
            Ok(state) => Ok(state),
            Err(StoreError::NotFound(id)) => Err(RuntimeError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    fn acquire(&self, session_id: SessionId) -> RuntimeResult<RunGuard<'_>> {
        if !self.running.insert(session_id) {
            return Err(RuntimeError::AlreadyRunning(session_id));
        }
        Ok(RunGuard {
            set: &self.running,
            id: session_id,
        })
    }

    async fn run_from(
        &self,
        mut state: WorkflowState,
        mut node: WorkflowNode,
    ) -> RuntimeResult<WorkflowSnapshot> {
        loop {
            tracing::info!(session_id = %state.session_id, node = %node, "executing node");
            state.current_node = node.as_str().to_string();

            let next = match self.execute_node(node, &mut state).await {
                Ok(next) => next,
                Err(e) if node == WorkflowNode::GenerateDeliverables => {
                    // The single exception: a deliverables failure never
                    // regresses a completed workflow.
                    tracing::error!(session_id = %state.session_id, error = %e, "deliverables generation failed");
                    state.record_error(format!("Deliverables generation failed: {e}"));
                    state.record_warning("Deliverables bundle not available");
                    None
                }
                Err(e) => {
                    tracing::error!(session_id = %state.session_id, node = %node, error = %e, "node failed");
                    state.record_error(format!("{node} failed: {e}"));
                    state.status = WorkflowStatus::Failed;
                    self.store.save(&state).await?;
                    return Ok(WorkflowSnapshot::from(&state));
                }
            };

            state.touch();
            self.store.save(&state).await?;

            match next {
                Some(next_node) => node = next_node,
                None => break,
            }
        }

        Ok(WorkflowSnapshot::from(&state))
    }

    async fn execute_node(
        &self,
        node: WorkflowNode,
        state: &mut WorkflowState,
    ) -> RuntimeResult<Option<WorkflowNode>> {
        match node {
            WorkflowNode::MasterArchitect => self.node_master(state).await,
            WorkflowNode::SolutionArchitect => self.node_solution_architect(state).await,
            WorkflowNode::Reviewers => self.node_reviewers(state).await,
            WorkflowNode::CreateReviewerRound => self.node_create_round(state),
            WorkflowNode::DetectDisagreements => self.node_detect(state),
            WorkflowNode::DebateCycle => self.node_debate_cycle(state).await,
            WorkflowNode::ComputeConsensus => self.node_compute_consensus(state),
            WorkflowNode::Adjudicator => self.node_adjudicator(state).await,
            WorkflowNode::HumanApproval => {
                state.status = WorkflowStatus::AwaitingHuman;
                tracing::info!(session_id = %state.session_id, "awaiting human review");
                Ok(None)
            }
            WorkflowNode::FaqGeneration => self.node_faq(state).await,
            WorkflowNode::Finalise => self.node_finalise(state),
            WorkflowNode::GenerateDeliverables => self.node_deliverables(state).await,
        }
    }

    async fn node_master(&self, state: &mut WorkflowState) -> RuntimeResult<Option<WorkflowNode>> {
        let agent = self.agents.performer(AgentRole::Master);
        let context = PerformerContext {
            user_context_json: serde_json::to_string_pretty(&state.user_context)
                .unwrap_or_else(|_| "{}".into()),
            ..Default::default()
        };
        let output = agent
            .run(&state.user_request, &context)
            .await
            .map_err(|e| node_error(WorkflowNode::MasterArchitect, e))?;

        for warning in &output.warnings {
            state.record_warning(warning.clone());
        }
        state.add_message(
            AgentRole::Master,
            output.content,
            output.success,
            None,
            output.tool_results,
        );
        state.status = WorkflowStatus::InProgress;
        Ok(Some(WorkflowNode::SolutionArchitect))
    }

    async fn node_solution_architect(
        &self,
        state: &mut WorkflowState,
    ) -> RuntimeResult<Option<WorkflowNode>> {
        // Revisions see the latest round plus any human feedback.
        let mut reviews: Vec<ReviewFeedback> = state.latest_round_reviews().to_vec();
        reviews.extend(
            state
                .reviews
                .iter()
                .filter(|r| r.reviewer_role == AgentRole::Human)
                .cloned(),
        );

        let agent = self.agents.performer(AgentRole::SolutionArchitect);
        let context = PerformerContext {
            reviews,
            current_design: state.latest_design_content().map(str::to_string),
            revision: state.revision_count,
            ..Default::default()
        };
        let output = agent
            .run(&state.user_request, &context)
            .await
            .map_err(|e| node_error(WorkflowNode::SolutionArchitect, e))?;

        for warning in &output.warnings {
            state.record_warning(warning.clone());
        }

        if output.success {
            match serde_json::from_str::<SolutionDesign>(&output.content) {
                Ok(design) => {
                    let version = state
                        .current_design
                        .as_ref()
                        .map(|d| d.version + 1)
                        .unwrap_or(1);
                    state.current_design = Some(design.into_document(version));
                }
                Err(e) => {
                    state.record_warning(format!("design document parse failed: {e}"));
                }
            }
        }

        state.add_message(
            AgentRole::SolutionArchitect,
            output.content,
            output.success,
            None,
            output.tool_results,
        );
        Ok(Some(WorkflowNode::Reviewers))
    }

    async fn node_reviewers(
        &self,
        state: &mut WorkflowState,
    ) -> RuntimeResult<Option<WorkflowNode>> {
        let content = state
            .latest_design_content()
            .unwrap_or(&state.user_request)
            .to_string();

        let mut join_set = JoinSet::new();
        for role in self.config.reviewers.iter().copied() {
            let critic = self.agents.critic(role);
            let content = content.clone();
            join_set.spawn(async move { (role, critic.review(&content).await) });
        }

        let mut results: Vec<(AgentRole, CriticOutput)> = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            let (role, result) =
                joined.map_err(|e| node_error(WorkflowNode::Reviewers, e))?;
            let output = result.map_err(|e| {
                RuntimeError::Node {
                    node: WorkflowNode::Reviewers.as_str().into(),
                    message: format!("{role} review failed: {e}"),
                }
            })?;
            results.push((role, output));
        }

        // Deterministic merge: stable sort on reviewer role, not arrival.
        results.sort_by_key(|(role, _)| *role);

        for (role, output) in results {
            for warning in &output.warnings {
                state.record_warning(warning.clone());
            }
            state.add_review(ReviewFeedback {
                reviewer_role: role,
                decision: output.decision,
                concerns: output.concerns,
                suggestions: output.suggestions,
                rationale: output.rationale.clone(),
                severity: output.severity,
            });
            state.add_message(
                role,
                output.rationale,
                output.success,
                Some(output.decision),
                output.tool_results,
            );
        }

        Ok(Some(WorkflowNode::CreateReviewerRound))
    }

    fn node_create_round(&self, state: &mut WorkflowState) -> RuntimeResult<Option<WorkflowNode>> {
        if !state.can_open_round() {
            state.record_warning(format!(
                "round ceiling of {} reached; escalating to human review",
                crate::state::MAX_ROUNDS
            ));
            state.record_safeguard("round_ceiling");
            return Ok(Some(WorkflowNode::HumanApproval));
        }
        let round = state.open_round();
        tracing::info!(round = round.round_number, "reviewer round created");
        Ok(Some(WorkflowNode::DetectDisagreements))
    }

    fn node_detect(&self, state: &mut WorkflowState) -> RuntimeResult<Option<WorkflowNode>> {
        let disagreements = self.detector.detect(state.latest_round_reviews());
        if let Some(round) = state.latest_round_mut() {
            round.disagreements = disagreements;
        }
        Ok(Some(WorkflowNode::DebateCycle))
    }

    async fn node_debate_cycle(
        &self,
        state: &mut WorkflowState,
    ) -> RuntimeResult<Option<WorkflowNode>> {
        let disagreements = state
            .latest_round()
            .map(|round| round.disagreements.clone())
            .unwrap_or_default();
        if disagreements.is_empty() {
            return Ok(Some(WorkflowNode::ComputeConsensus));
        }

        let mut context = state.user_request.clone();
        if let Some(design) = state.latest_design_content() {
            context.push_str("\n\n");
            context.push_str(design);
        }

        let result = self.debate_engine.run_all(&disagreements, &context).await;
        for warning in result.warnings {
            state.record_warning(warning);
        }
        for safeguard in result.safeguards {
            state.record_safeguard(safeguard);
        }
        state.debates.extend(result.outcomes.iter().cloned());
        if let Some(round) = state.latest_round_mut() {
            round.debates = result.outcomes;
        }

        Ok(Some(WorkflowNode::ComputeConsensus))
    }

    fn node_compute_consensus(
        &self,
        state: &mut WorkflowState,
    ) -> RuntimeResult<Option<WorkflowNode>> {
        let reviews = state.latest_round_reviews().to_vec();
        let debates = state
            .latest_round()
            .map(|round| round.debates.clone())
            .unwrap_or_default();

        let result = self.consensus_engine.compute(&reviews, &debates);
        state.requires_adjudication = !result.agreed;
        if let Some(round) = state.latest_round_mut() {
            round.consensus = Some(result.clone());
            round.requires_adjudication = !result.agreed;
        }
        state.consensus_history.push(result);

        let next = if state.requires_adjudication
            && state.metadata.adjudicator_run_count < self.config.adjudicator_max_runs
        {
            WorkflowNode::Adjudicator
        } else {
            self.route_after_round(state)
        };
        Ok(Some(next))
    }

    async fn node_adjudicator(
        &self,
        state: &mut WorkflowState,
    ) -> RuntimeResult<Option<WorkflowNode>> {
        if state.metadata.adjudicator_run_count >= self.config.adjudicator_max_runs {
            state.record_warning("adjudicator already ran for this session; skipping re-entry");
            state.record_safeguard("adjudicator_rerun_blocked");
            return Ok(Some(self.route_after_round(state)));
        }
        state.metadata.adjudicator_run_count += 1;

        let unresolved = state
            .latest_round()
            .map(|round| {
                round
                    .debates
                    .iter()
                    .filter(|d| !d.consensus_reached)
                    .map(|d| d.disagreement.clone())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let agent = self.agents.performer(AgentRole::Adjudicator);
        let context = PerformerContext {
            reviews: state.latest_round_reviews().to_vec(),
            debates: state.debates.clone(),
            consensus: state.consensus_history.last().cloned(),
            unresolved,
            current_design: state.latest_design_content().map(str::to_string),
            ..Default::default()
        };
        let output = agent
            .run(&state.user_request, &context)
            .await
            .map_err(|e| node_error(WorkflowNode::Adjudicator, e))?;

        for warning in &output.warnings {
            state.record_warning(warning.clone());
        }

        match serde_json::from_str::<Adjudication>(&output.content) {
            Ok(adjudication) => {
                state.final_architecture_rationale = adjudication.architecture_rationale;
                state.faq_entries.extend(adjudication.faq_entries);
            }
            Err(_) => {
                // Degraded payloads carry the raw analysis as the rationale.
                let value: serde_json::Value =
                    serde_json::from_str(&output.content).unwrap_or_default();
                state.final_architecture_rationale = value
                    .get("analysis")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&output.content)
                    .to_string();
            }
        }
        state.adjudication_complete = true;
        state.add_message(
            AgentRole::Adjudicator,
            output.content,
            output.success,
            None,
            output.tool_results,
        );

        Ok(Some(self.route_after_round(state)))
    }

    async fn node_faq(&self, state: &mut WorkflowState) -> RuntimeResult<Option<WorkflowNode>> {
        let agent = self.agents.performer(AgentRole::Faq);
        let context = PerformerContext {
            messages: state
                .messages
                .iter()
                .map(|m| (m.agent_role.as_str().to_string(), m.content.clone()))
                .collect(),
            reviews: state.reviews.clone(),
            ..Default::default()
        };
        let output = agent
            .run(
                "Generate FAQ and decision rationale from council discussion",
                &context,
            )
            .await
            .map_err(|e| node_error(WorkflowNode::FaqGeneration, e))?;

        for warning in &output.warnings {
            state.record_warning(warning.clone());
        }

        if output.success {
            match serde_json::from_str::<FaqOutput>(&output.content) {
                Ok(parsed) => {
                    state.faq_entries.extend(parsed.faq_entries);
                    if !parsed.decision_rationale.is_empty() {
                        state.decision_rationale = parsed.decision_rationale;
                    }
                    state.metadata.key_takeaways.extend(parsed.key_takeaways);
                }
                Err(e) => {
                    state.record_warning(format!("FAQ output parse failed: {e}"));
                    state.decision_rationale = output.content.clone();
                }
            }
        } else {
            // Degraded output: keep the raw content as the rationale.
            state.decision_rationale = output.content.clone();
        }

        state.add_message(AgentRole::Faq, output.content, output.success, None, vec![]);
        Ok(Some(WorkflowNode::Finalise))
    }

    fn node_finalise(&self, state: &mut WorkflowState) -> RuntimeResult<Option<WorkflowNode>> {
        state.final_design = state.current_design.clone();

        let mut summary_parts = vec![
            format!("Deliberation completed for: {}", state.user_request),
            format!("Total messages: {}", state.messages.len()),
            format!("Total reviews: {}", state.reviews.len()),
            format!("Revisions: {}", state.revision_count),
        ];
        if state.human_approved {
            summary_parts.push("Human approval: approved".into());
        }
        state.final_summary = summary_parts.join("\n");
        state.status = WorkflowStatus::Completed;

        tracing::info!(session_id = %state.session_id, "workflow finalised");
        Ok(Some(WorkflowNode::GenerateDeliverables))
    }

    async fn node_deliverables(
        &self,
        state: &mut WorkflowState,
    ) -> RuntimeResult<Option<WorkflowNode>> {
        // Gather external diagram URLs when live; canned tools return none.
        let mut diagram_urls = BTreeMap::new();
        let ctx = ToolContext {
            session_id: Some(state.session_id),
            demo_mode: self.demo_mode,
            extra: BTreeMap::new(),
        };
        for kind in ["context", "integration_flow", "deployment", "sequence"] {
            let result = self
                .agents
                .tools()
                .execute("diagram", "generate", &serde_json::json!({ "kind": kind }), &ctx)
                .await;
            if result.success {
                if let Some(url) = result.artifacts.as_ref().and_then(|a| a.first()) {
                    diagram_urls.insert(kind.to_string(), url.clone());
                }
            }
        }

        let bundle = self.builder.build(state, &diagram_urls);
        state.deliverables = Some(bundle);
        Ok(None)
    }

    /// Conditional routing evaluated after each reviewer round (and after
    /// adjudication).
    fn route_after_round(&self, state: &mut WorkflowState) -> WorkflowNode {
        let reviews = state.latest_round_reviews();

        if reviews.is_empty() {
            return if state.can_open_round() {
                WorkflowNode::Reviewers
            } else {
                WorkflowNode::HumanApproval
            };
        }

        let has_critical = reviews.iter().any(|r| r.severity == Severity::Critical);
        let has_escalation = reviews
            .iter()
            .any(|r| r.decision == ReviewDecision::Escalate);
        if has_critical || has_escalation || state.revision_count >= state.max_revisions {
            tracing::info!(
                has_critical,
                has_escalation,
                revision_count = state.revision_count,
                "routing to human approval"
            );
            return WorkflowNode::HumanApproval;
        }

        let wants_revision = reviews.iter().any(|r| r.decision == ReviewDecision::Revise);
        if wants_revision && state.can_revise() && state.can_open_round() {
            state.revision_count += 1;
            tracing::info!(
                revision_count = state.revision_count,
                "routing back for revision"
            );
            return WorkflowNode::SolutionArchitect;
        }

        let all_approved = reviews.iter().all(|r| r.decision == ReviewDecision::Approve);
        if all_approved {
            tracing::info!("all reviewers approved; routing to FAQ generation");
            return WorkflowNode::FaqGeneration;
        }

        // Ambiguous outcomes default to the human gate.
        tracing::info!("ambiguous review outcome; routing to human approval");
        WorkflowNode::HumanApproval
    }
}

fn node_error(node: WorkflowNode, error: impl std::fmt::Display) -> RuntimeError {
    RuntimeError::Node {
        node: node.as_str().into(),
        message: error.to_string(),
    }
}

/// Removes the session from the running set when the run ends.
struct RunGuard<'a> {
    set: &'a DashSet<SessionId>,
    id: SessionId,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.id);
    }
}
