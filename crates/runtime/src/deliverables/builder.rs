//! Deterministic transformation of terminal workflow state into a
//! deliverables bundle.
//!
//! Pure over its inputs: the same state and diagram URLs produce the same
//! counts, IDs, and section headers on every call.

use chrono::Utc;
use std::collections::BTreeMap;

use super::{
    diagrams, report, ArchitectureSummary, DecisionRecord, DeliverablesBundle, DiagramDescriptor,
    DiagramKind, FaqItem, RiskItem, WORKFLOW_VERSION,
};
use crate::state::WorkflowState;
use crate::types::Severity;

const MAX_CAPABILITIES: usize = 8;
const MIN_CAPABILITIES: usize = 3;
const MAX_NFR_HIGHLIGHTS: usize = 6;
const MIN_NFR_HIGHLIGHTS: usize = 4;
const MAX_DEBATE_DECISIONS: usize = 3;
const MIN_DECISIONS: usize = 2;
const MAX_RISKS: usize = 6;
const MAX_FAQS: usize = 8;
const MIN_FAQS: usize = 3;

const DEFAULT_CAPABILITIES: &[&str] = &[
    "Multi-system integration",
    "Secure API gateway",
    "Data transformation and routing",
    "Error handling and retry logic",
];

const DEFAULT_NFR_HIGHLIGHTS: &[&str] = &[
    "Scalability: Supports horizontal scaling for high throughput",
    "Availability: 99.9% uptime with automated failover",
    "Security: OAuth 2.0, TLS encryption, API key management",
    "Performance: Sub-500ms response times for standard operations",
];

/// Builds bundles from terminal state.
pub struct DeliverablesBuilder {
    demo_mode: bool,
}

impl DeliverablesBuilder {
    pub fn new(demo_mode: bool) -> Self {
        Self { demo_mode }
    }

    /// Build the complete bundle. `diagram_urls` maps diagram kind names to
    /// external-service URLs gathered by the caller; in demo mode it is
    /// ignored and every diagram carries a text fallback.
    pub fn build(
        &self,
        state: &WorkflowState,
        diagram_urls: &BTreeMap<String, String>,
    ) -> DeliverablesBundle {
        tracing::info!(session_id = %state.session_id, demo_mode = self.demo_mode, "building deliverables bundle");

        let architecture_summary = self.build_summary(state);
        let decisions = self.build_decisions(state);
        let risks = self.build_risks(state);
        let faqs = self.build_faqs(state);
        let diagrams = self.build_diagrams(state, diagram_urls);
        let includes_tool_insights = !self.demo_mode && !diagram_urls.is_empty();

        let mut bundle = DeliverablesBundle {
            session_id: state.session_id,
            architecture_summary,
            decisions,
            risks,
            faqs,
            diagrams,
            markdown_report: String::new(),
            generated_at: Utc::now(),
            workflow_version: WORKFLOW_VERSION.to_string(),
            includes_tool_insights,
            demo_mode: self.demo_mode,
        };
        bundle.markdown_report = report::assemble(&bundle);

        tracing::info!(
            session_id = %state.session_id,
            decisions = bundle.decisions.len(),
            risks = bundle.risks.len(),
            faqs = bundle.faqs.len(),
            diagrams = bundle.diagrams.len(),
            report_bytes = bundle.markdown_report.len(),
            "deliverables bundle built"
        );
        bundle
    }

    fn build_summary(&self, state: &WorkflowState) -> ArchitectureSummary {
        let design = state.current_design.as_ref();

        let overview = if !state.final_architecture_rationale.is_empty() {
            state.final_architecture_rationale.clone()
        } else if let Some(overview) = design
            .map(|d| d.architecture_overview.as_str())
            .filter(|o| !o.is_empty())
        {
            overview.to_string()
        } else {
            format!("Architecture solution for: {}", state.user_request)
        };

        let mut key_capabilities: Vec<String> = Vec::new();
        if let Some(design) = design {
            key_capabilities.extend(design.components.iter().map(|c| c.name.clone()));
            key_capabilities.extend(
                design
                    .integration_points
                    .iter()
                    .map(|i| format!("Integration: {}", i.name)),
            );
        }
        if key_capabilities.len() < MIN_CAPABILITIES {
            key_capabilities.extend(DEFAULT_CAPABILITIES.iter().map(|s| s.to_string()));
        }
        key_capabilities.truncate(MAX_CAPABILITIES);

        let mut nfr_highlights: Vec<String> = Vec::new();
        if let Some(design) = design {
            nfr_highlights.extend(
                design
                    .nfr_considerations
                    .iter()
                    .map(|(key, value)| format!("{}: {value}", capitalize(key))),
            );
            nfr_highlights.extend(
                design
                    .security_considerations
                    .iter()
                    .map(|(key, value)| format!("Security - {}: {value}", capitalize(key))),
            );
        }
        if nfr_highlights.len() < MIN_NFR_HIGHLIGHTS {
            nfr_highlights.extend(
                DEFAULT_NFR_HIGHLIGHTS
                    .iter()
                    .take(MIN_NFR_HIGHLIGHTS.saturating_sub(nfr_highlights.len()))
                    .map(|s| s.to_string()),
            );
        }
        nfr_highlights.truncate(MAX_NFR_HIGHLIGHTS);

        ArchitectureSummary {
            overview,
            key_capabilities,
            non_functional_highlights: nfr_highlights,
        }
    }

    fn build_decisions(&self, state: &WorkflowState) -> Vec<DecisionRecord> {
        let mut decisions = Vec::new();
        let mut counter = 1u32;
        let mut next_id = |counter: &mut u32| {
            let id = format!("ADR-{counter:03}");
            *counter += 1;
            id
        };

        if !state.final_architecture_rationale.is_empty() {
            decisions.push(DecisionRecord {
                id: next_id(&mut counter),
                title: "Final Architecture Pattern Selection".into(),
                context: format!(
                    "User requested: {}. Multiple agent reviews and potential debates occurred.",
                    truncate(&state.user_request, 200)
                ),
                decision: "Final architecture approved through adjudication".into(),
                rationale: truncate(&state.final_architecture_rationale, 500),
                consequences: "Architecture aligns with best practices, security requirements, \
                               and NFRs. Implementation can proceed with confidence."
                    .into(),
            });
        }

        // Only resolved debates become decision records.
        for debate in state
            .debates
            .iter()
            .filter(|d| d.consensus_reached)
            .take(MAX_DEBATE_DECISIONS)
        {
            let topic = &debate.disagreement.topic;
            decisions.push(DecisionRecord {
                id: next_id(&mut counter),
                title: format!("Resolution: {topic}"),
                context: format!("Disagreement between reviewers on: {topic}"),
                decision: "Consensus reached through the debate cycle".into(),
                rationale: if debate.resolution_summary.is_empty() {
                    "Resolved through agent debate cycle".into()
                } else {
                    truncate(&debate.resolution_summary, 500)
                },
                consequences: format!(
                    "Design updated to address {topic}. Confidence: {:.2}",
                    debate.confidence
                ),
            });
        }

        if let Some(consensus) = state.consensus_history.last() {
            decisions.push(DecisionRecord {
                id: next_id(&mut counter),
                title: "Overall Council Consensus".into(),
                context: format!(
                    "After {} review round(s), agents evaluated the architecture",
                    state.current_round
                ),
                decision: format!(
                    "Consensus {}",
                    if consensus.agreed {
                        "achieved"
                    } else {
                        "not achieved"
                    }
                ),
                rationale: truncate(&consensus.summary, 500),
                consequences: format!(
                    "Confidence level: {:.2}. {}",
                    consensus.confidence,
                    if consensus.agreed {
                        "Proceed with implementation."
                    } else {
                        "Further review recommended."
                    }
                ),
            });
        }

        if let Some(design) = &state.current_design {
            if !design.integration_points.is_empty() {
                let names = design
                    .integration_points
                    .iter()
                    .map(|i| i.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                decisions.push(DecisionRecord {
                    id: next_id(&mut counter),
                    title: "Integration Pattern Selection".into(),
                    context: "Multiple integration options considered for system connectivity"
                        .into(),
                    decision: format!(
                        "{} integration point(s) defined",
                        design.integration_points.len()
                    ),
                    rationale: format!(
                        "Selected pattern optimises for maintainability, security, and \
                         performance across: {names}"
                    ),
                    consequences: "Clear integration contracts defined. APIs documented. \
                                   Security policies applied at each integration point."
                        .into(),
                });
            }

            if !design.deployment_notes.is_empty() {
                decisions.push(DecisionRecord {
                    id: next_id(&mut counter),
                    title: "Deployment Architecture".into(),
                    context: "Deployment model must support NFRs and operational requirements"
                        .into(),
                    decision: "Deployment strategy defined".into(),
                    rationale: truncate(&design.deployment_notes, 300),
                    consequences: "Deployment approach enables scalability, monitoring, and \
                                   operational excellence."
                        .into(),
                });
            }
        }

        while decisions.len() < MIN_DECISIONS {
            decisions.push(DecisionRecord {
                id: next_id(&mut counter),
                title: "API-First Architecture Approach".into(),
                context: "System requires integration with multiple external systems and \
                          future extensibility"
                    .into(),
                decision: "Adopt API-first design with RESTful interfaces and comprehensive \
                           API management"
                    .into(),
                rationale: "API-first approach enables loose coupling, independent scaling, \
                            and clear contracts between systems."
                    .into(),
                consequences: "All integrations go through a managed API layer, enabling \
                               monitoring, security policies, and rate limiting."
                    .into(),
            });
        }

        decisions
    }

    fn build_risks(&self, state: &WorkflowState) -> Vec<RiskItem> {
        let mut risks = Vec::new();
        let mut counter = 1u32;
        let mut next_id = |counter: &mut u32| {
            let id = format!("RISK-{counter:03}");
            *counter += 1;
            id
        };

        for review in &state.reviews {
            if !matches!(review.severity, Severity::High | Severity::Critical) {
                continue;
            }
            for concern in review.concerns.iter().take(2) {
                risks.push(RiskItem {
                    id: next_id(&mut counter),
                    description: concern.clone(),
                    impact: review.severity,
                    likelihood: "medium".into(),
                    mitigation: review
                        .suggestions
                        .first()
                        .cloned()
                        .unwrap_or_else(|| {
                            "Review and address during implementation phase".into()
                        }),
                    owner: Some(review.reviewer_role),
                });
            }
        }

        let covers = |risks: &[RiskItem], needles: &[&str]| {
            risks.iter().any(|r| {
                let description = r.description.to_lowercase();
                needles.iter().any(|needle| description.contains(needle))
            })
        };

        if !covers(&risks, &["integration"]) {
            risks.push(RiskItem {
                id: next_id(&mut counter),
                description: "Integration point failures or timeouts could impact system \
                              availability"
                    .into(),
                impact: Severity::High,
                likelihood: "medium".into(),
                mitigation: "Implement circuit breakers, retry logic with exponential backoff, \
                             and fallback mechanisms at each integration point"
                    .into(),
                owner: None,
            });
        }

        if !covers(&risks, &["security", "auth"]) {
            risks.push(RiskItem {
                id: next_id(&mut counter),
                description: "Unauthorized access to APIs or sensitive data exposure".into(),
                impact: Severity::Critical,
                likelihood: "medium".into(),
                mitigation: "Enforce OAuth 2.0, API key rotation, TLS 1.2+, input validation, \
                             and rate limiting on all endpoints"
                    .into(),
                owner: None,
            });
        }

        if !covers(&risks, &["performance", "scale"]) {
            risks.push(RiskItem {
                id: next_id(&mut counter),
                description: "System may not meet performance SLAs under peak load conditions"
                    .into(),
                impact: Severity::High,
                likelihood: "low".into(),
                mitigation: "Conduct load testing, implement caching strategies, enable \
                             auto-scaling, and optimise database queries"
                    .into(),
                owner: None,
            });
        }

        if !covers(&risks, &["data"]) {
            risks.push(RiskItem {
                id: next_id(&mut counter),
                description: "Data inconsistencies or format mismatches between integrated \
                              systems"
                    .into(),
                impact: Severity::Medium,
                likelihood: "medium".into(),
                mitigation: "Implement comprehensive data validation, transformation rules, \
                             error handling, and data quality monitoring"
                    .into(),
                owner: None,
            });
        }

        risks.truncate(MAX_RISKS);
        risks
    }

    fn build_faqs(&self, state: &WorkflowState) -> Vec<FaqItem> {
        let mut faqs = Vec::new();

        if !state.final_architecture_rationale.is_empty() {
            faqs.push(FaqItem {
                question: "Why was this architecture approach selected?".into(),
                answer: truncate(&state.final_architecture_rationale, 400),
                source: Some("adjudicator".into()),
            });
        }

        for debate in state.debates.iter().take(2) {
            faqs.push(FaqItem {
                question: format!("Why was {} decided this way?", debate.disagreement.topic),
                answer: if debate.resolution_summary.is_empty() {
                    "Resolved through agent consensus".into()
                } else {
                    truncate(&debate.resolution_summary, 400)
                },
                source: Some("debate_outcome".into()),
            });
        }

        for entry in state.faq_entries.iter().take(3) {
            faqs.push(FaqItem {
                question: entry.question.clone(),
                answer: entry.answer.clone(),
                source: Some("faq_agent".into()),
            });
        }

        if let Some(design) = &state.current_design {
            if !design.integration_points.is_empty() {
                faqs.push(FaqItem {
                    question: "How are external systems integrated?".into(),
                    answer: format!(
                        "The architecture includes {} integration point(s) using an API-first \
                         pattern. Each integration has defined contracts, security policies, \
                         and error handling.",
                        design.integration_points.len()
                    ),
                    source: Some("reviewer".into()),
                });
            }

            if !design.security_considerations.is_empty() {
                let answer = design
                    .security_considerations
                    .iter()
                    .take(2)
                    .map(|(key, value)| format!("{key}: {value}"))
                    .collect::<Vec<_>>()
                    .join(". ");
                faqs.push(FaqItem {
                    question: "How is security handled?".into(),
                    answer,
                    source: Some("reviewer".into()),
                });
            }

            if !design.nfr_considerations.is_empty() {
                let answer = design
                    .nfr_considerations
                    .iter()
                    .take(2)
                    .map(|(key, value)| format!("{key}: {value}"))
                    .collect::<Vec<_>>()
                    .join(". ");
                faqs.push(FaqItem {
                    question: "What are the key non-functional requirements?".into(),
                    answer,
                    source: Some("reviewer".into()),
                });
            }
        }

        if faqs.len() < MIN_FAQS {
            faqs.push(FaqItem {
                question: "What deployment model is recommended?".into(),
                answer: "Managed container runtimes with auto-scaling, multi-region redundancy, \
                         and managed services for databases and messaging."
                    .into(),
                source: Some("platform_architect".into()),
            });
            faqs.push(FaqItem {
                question: "How is monitoring and observability handled?".into(),
                answer: "Runtime metrics with custom dashboards, alerting on SLA thresholds, \
                         and integration with enterprise monitoring tools."
                    .into(),
                source: Some("ops_reviewer".into()),
            });
        }

        faqs.truncate(MAX_FAQS);
        faqs
    }

    fn build_diagrams(
        &self,
        state: &WorkflowState,
        diagram_urls: &BTreeMap<String, String>,
    ) -> Vec<DiagramDescriptor> {
        let url_for = |kind: DiagramKind| -> Option<String> {
            if self.demo_mode {
                None
            } else {
                diagram_urls.get(kind.as_str()).cloned()
            }
        };

        let mut descriptor = |kind: DiagramKind, title: &str, description: &str, source: String| {
            let external_url = url_for(kind);
            let mermaid_source = if external_url.is_none() {
                Some(source)
            } else {
                None
            };
            DiagramDescriptor {
                kind,
                title: title.into(),
                description: description.into(),
                external_url,
                mermaid_source,
            }
        };

        let mut out = vec![
            descriptor(
                DiagramKind::Context,
                "System Context Diagram",
                "High-level view of the system and its external interfaces",
                diagrams::context_diagram(state),
            ),
            descriptor(
                DiagramKind::IntegrationFlow,
                "Integration Flow Diagram",
                "Data flow and transformations across integrated systems",
                diagrams::integration_flow_diagram(state),
            ),
            descriptor(
                DiagramKind::Deployment,
                "Deployment Architecture",
                "Physical deployment topology with runtime and hosting components",
                diagrams::deployment_diagram(state),
            ),
        ];

        let has_integrations = state
            .current_design
            .as_ref()
            .map(|d| !d.integration_points.is_empty())
            .unwrap_or(false);
        if has_integrations {
            out.push(descriptor(
                DiagramKind::Sequence,
                "Integration Sequence Diagram",
                "Detailed message flow for key integration scenarios",
                diagrams::sequence_diagram(state),
            ));
        }

        out
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        DesignComponent, DesignDocument, Disagreement, IntegrationPoint, ReviewFeedback,
    };
    use crate::types::{AgentRole, ReviewDecision};
    use chrono::Utc;

    fn bare_state() -> WorkflowState {
        WorkflowState::new("Design an order sync integration", BTreeMap::new(), 3)
    }

    fn state_with_design() -> WorkflowState {
        let mut state = bare_state();
        let mut nfr = BTreeMap::new();
        nfr.insert("scalability".to_string(), "horizontal scaling".to_string());
        let mut security = BTreeMap::new();
        security.insert("authentication".to_string(), "OAuth 2.0".to_string());
        state.current_design = Some(DesignDocument {
            version: 1,
            title: "Order Sync".into(),
            description: "d".into(),
            architecture_overview: "API-led order synchronisation".into(),
            components: vec![
                DesignComponent {
                    name: "Gateway".into(),
                    responsibility: "ingress".into(),
                },
                DesignComponent {
                    name: "Orchestrator".into(),
                    responsibility: "flows".into(),
                },
            ],
            nfr_considerations: nfr,
            security_considerations: security,
            integration_points: vec![IntegrationPoint {
                name: "ERP".into(),
                description: "orders".into(),
            }],
            deployment_notes: "containerised".into(),
            diagrams: vec![],
            last_updated: Utc::now(),
        });
        state
    }

    fn builder() -> DeliverablesBuilder {
        DeliverablesBuilder::new(true)
    }

    #[test]
    fn bare_state_still_yields_a_complete_bundle() {
        let state = bare_state();
        let bundle = builder().build(&state, &BTreeMap::new());

        assert!(bundle.decisions.len() >= 2);
        assert!(bundle.risks.len() >= 3);
        assert!(bundle.faqs.len() >= 3);
        assert!(bundle.diagrams.len() >= 3);
        assert!(bundle.markdown_report.len() >= 500);
        assert!(bundle
            .architecture_summary
            .overview
            .contains("Architecture solution for"));
        assert!(bundle.architecture_summary.key_capabilities.len() >= 3);
        assert!(bundle.architecture_summary.non_functional_highlights.len() >= 4);
    }

    #[test]
    fn ids_are_sequential_and_well_formed() {
        let bundle = builder().build(&state_with_design(), &BTreeMap::new());
        for (index, decision) in bundle.decisions.iter().enumerate() {
            assert_eq!(decision.id, format!("ADR-{:03}", index + 1));
        }
        for (index, risk) in bundle.risks.iter().enumerate() {
            assert_eq!(risk.id, format!("RISK-{:03}", index + 1));
        }
    }

    #[test]
    fn high_severity_concerns_become_risks() {
        let mut state = state_with_design();
        state.add_review(ReviewFeedback {
            reviewer_role: AgentRole::ReviewerSecurity,
            decision: ReviewDecision::Revise,
            concerns: vec![
                "Token rotation missing".into(),
                "Audit log gaps".into(),
                "Third concern beyond the cap".into(),
            ],
            suggestions: vec!["Rotate tokens daily".into()],
            rationale: "gaps".into(),
            severity: Severity::High,
        });
        let bundle = builder().build(&state, &BTreeMap::new());

        let from_review: Vec<_> = bundle
            .risks
            .iter()
            .filter(|r| r.owner == Some(AgentRole::ReviewerSecurity))
            .collect();
        // Top two concerns only.
        assert_eq!(from_review.len(), 2);
        assert_eq!(from_review[0].mitigation, "Rotate tokens daily");
        assert!(bundle.risks.len() <= 6);
    }

    #[test]
    fn only_resolved_debates_become_decision_records() {
        let mut state = state_with_design();
        let debate = |topic: &str, resolved: bool| crate::state::DebateOutcome {
            id: format!("debate-{topic}"),
            disagreement: Disagreement {
                id: format!("disagreement-{topic}"),
                agent_roles: vec![],
                topic: topic.into(),
                positions: BTreeMap::new(),
                severity: Severity::Medium,
                category: "decision_conflict".into(),
                detected_at: Utc::now(),
            },
            rounds: 1,
            revised_positions: BTreeMap::new(),
            consensus_reached: resolved,
            resolution_summary: format!("{topic} outcome"),
            confidence: 0.6,
            timestamp: Utc::now(),
        };
        state.debates.push(debate("Sync Vs Async", true));
        state.debates.push(debate("Sql Vs Nosql", false));

        let bundle = builder().build(&state, &BTreeMap::new());
        let resolutions: Vec<_> = bundle
            .decisions
            .iter()
            .filter(|d| d.title.starts_with("Resolution:"))
            .collect();
        assert_eq!(resolutions.len(), 1);
        assert!(resolutions[0].title.contains("Sync Vs Async"));
    }

    #[test]
    fn sequence_diagram_only_with_integrations() {
        let without = builder().build(&bare_state(), &BTreeMap::new());
        assert!(without
            .diagrams
            .iter()
            .all(|d| d.kind != DiagramKind::Sequence));

        let with = builder().build(&state_with_design(), &BTreeMap::new());
        assert!(with.diagrams.iter().any(|d| d.kind == DiagramKind::Sequence));
    }

    #[test]
    fn demo_mode_forces_text_fallback() {
        let mut urls = BTreeMap::new();
        urls.insert(
            "context".to_string(),
            "https://diagrams.example/abc".to_string(),
        );

        let demo_bundle = DeliverablesBuilder::new(true).build(&state_with_design(), &urls);
        assert!(demo_bundle
            .diagrams
            .iter()
            .all(|d| d.external_url.is_none() && d.mermaid_source.is_some()));
        assert!(!demo_bundle.includes_tool_insights);

        let live_bundle = DeliverablesBuilder::new(false).build(&state_with_design(), &urls);
        let context = live_bundle
            .diagrams
            .iter()
            .find(|d| d.kind == DiagramKind::Context)
            .unwrap();
        assert_eq!(
            context.external_url.as_deref(),
            Some("https://diagrams.example/abc")
        );
        assert!(context.mermaid_source.is_none());
        assert!(live_bundle.includes_tool_insights);
    }

    #[test]
    fn builder_is_idempotent_on_counts_and_headers() {
        let state = state_with_design();
        let first = builder().build(&state, &BTreeMap::new());
        let second = builder().build(&state, &BTreeMap::new());

        assert_eq!(first.decisions.len(), second.decisions.len());
        assert_eq!(first.risks.len(), second.risks.len());
        assert_eq!(first.faqs.len(), second.faqs.len());
        assert_eq!(first.diagrams.len(), second.diagrams.len());

        let headers = |report: &str| -> Vec<String> {
            report
                .lines()
                .filter(|l| l.starts_with('#'))
                .map(str::to_string)
                .collect()
        };
        assert_eq!(headers(&first.markdown_report), headers(&second.markdown_report));
    }

    #[test]
    fn report_contains_required_sections_and_all_items() {
        let mut state = state_with_design();
        state.debates.push(crate::state::DebateOutcome {
            id: "debate-1".into(),
            disagreement: Disagreement {
                id: "disagreement-1".into(),
                agent_roles: vec![],
                topic: "Sync Vs Async".into(),
                positions: BTreeMap::new(),
                severity: Severity::Medium,
                category: "pattern_conflict_sync_vs_async".into(),
                detected_at: Utc::now(),
            },
            rounds: 1,
            revised_positions: BTreeMap::new(),
            consensus_reached: true,
            resolution_summary: "Converged on async".into(),
            confidence: 0.8,
            timestamp: Utc::now(),
        });
        let bundle = builder().build(&state, &BTreeMap::new());
        let report = &bundle.markdown_report;

        for header in [
            "# Architecture Deliverables",
            "## Architecture Summary",
            "## Key Design Decisions",
            "## Risks & Mitigations",
            "## FAQ",
            "## Architecture Diagrams",
        ] {
            assert!(report.contains(header), "missing header {header}");
        }
        for decision in &bundle.decisions {
            assert!(report.contains(&decision.id));
        }
        for risk in &bundle.risks {
            assert!(report.contains(&risk.id));
        }
        for faq in &bundle.faqs {
            assert!(report.contains(&faq.question));
        }
        for diagram in &bundle.diagrams {
            assert!(report.contains(&diagram.title));
        }
    }
}
