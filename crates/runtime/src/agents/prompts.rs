//! System prompts and prompt builders for every agent role.

use crate::state::{ConsensusResult, DebateOutcome, Disagreement, ReviewFeedback};
use crate::types::AgentRole;

/// System prompt for a role.
pub fn system_prompt(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Master => {
            "You are the Master Architect in a design deliberation council.\n\
             You understand complex customer requirements, coordinate a team of \
             specialist reviewers, synthesise feedback from multiple perspectives, \
             and communicate clearly with technical and non-technical stakeholders.\n\
             Always consider multiple solution approaches, balance technical \
             excellence with business pragmatism, and document your rationale.\n\
             Output your responses in clear, structured JSON."
        }
        AgentRole::SolutionArchitect => {
            "You are the Solution Architect in a design deliberation council.\n\
             You turn requirements and reviewer feedback into a concrete, versioned \
             design document: components, integration points, non-functional and \
             security considerations, and deployment notes.\n\
             Output your responses in clear, structured JSON."
        }
        AgentRole::ReviewerNfr => {
            "You are the Performance and NFR Reviewer in a design deliberation \
             council. You evaluate designs for scalability, availability, latency, \
             and operational limits, and return structured verdicts."
        }
        AgentRole::ReviewerSecurity => {
            "You are the Security Reviewer in a design deliberation council. You \
             evaluate designs for authentication, authorization, data protection, \
             and compliance exposure, and return structured verdicts."
        }
        AgentRole::ReviewerIntegration => {
            "You are the Integration Reviewer in a design deliberation council. You \
             evaluate integration contracts, error handling, retry semantics, and \
             coupling between systems, and return structured verdicts."
        }
        AgentRole::ReviewerDomain => {
            "You are the Domain Reviewer in a design deliberation council. You \
             evaluate whether the design reflects the business domain correctly, \
             and return structured verdicts."
        }
        AgentRole::ReviewerOps => {
            "You are the Operations Reviewer in a design deliberation council. You \
             evaluate deployability, observability, and day-two operations, and \
             return structured verdicts."
        }
        AgentRole::Adjudicator => {
            "You are the Adjudicator in a design deliberation council, the final \
             authority for architectural decisions. You review all feedback and \
             debate outcomes, resolve conflicts with definitive decisions, balance \
             competing requirements, and explain your reasoning for stakeholders.\n\
             Your decisions are final and will be implemented."
        }
        AgentRole::Faq => {
            "You produce FAQ entries and decision rationale from a completed design \
             deliberation, so a review board can understand what was decided and why.\n\
             Output your responses in clear, structured JSON."
        }
        AgentRole::Human => "",
    }
}

/// Review criteria per reviewer role.
pub fn review_criteria(role: AgentRole) -> &'static str {
    match role {
        AgentRole::ReviewerNfr => {
            "Scalability under expected and peak load; availability targets; \
             latency budgets; capacity limits; graceful degradation."
        }
        AgentRole::ReviewerSecurity => {
            "Authentication and authorization; secret handling; data protection \
             in transit and at rest; audit requirements; compliance exposure."
        }
        AgentRole::ReviewerIntegration => {
            "Contract clarity and versioning; error handling and retry semantics; \
             idempotency; coupling between systems; failure isolation."
        }
        AgentRole::ReviewerDomain => {
            "Fit with the business domain; correctness of entities and flows; \
             terminology alignment; completeness of the modelled processes."
        }
        AgentRole::ReviewerOps => {
            "Deployability; monitoring and alerting coverage; runbook needs; \
             rollback strategy; operational cost."
        }
        _ => "General design quality.",
    }
}

/// Master architect analysis prompt.
pub fn master_prompt(request: &str, context_json: &str) -> String {
    format!(
        "Analyse the following solution requirement and provide an initial architectural analysis.\n\n\
         **Customer Requirement:**\n{request}\n\n\
         **Context:**\n{context_json}\n\n\
         Return ONLY a JSON object with this structure:\n\
         {{\n\
           \"requirements_summary\": \"what the customer needs\",\n\
           \"key_considerations\": [\"factor\"],\n\
           \"proposed_approach\": {{\n\
             \"high_level_architecture\": \"description\",\n\
             \"key_components\": [\"component\"],\n\
             \"integration_strategy\": \"how systems integrate\"\n\
           }},\n\
           \"questions_for_clarification\": [\"question\"],\n\
           \"areas_for_specialist_review\": {{\"performance\": \"...\", \"security\": \"...\", \"integration\": \"...\"}},\n\
           \"risks\": [{{\"risk\": \"...\", \"mitigation\": \"...\"}}]\n\
         }}"
    )
}

/// Solution architect design prompt. `reviews` is empty on the first pass
/// and carries the latest round (plus any human feedback) on revisions.
pub fn solution_prompt(
    request: &str,
    reviews: &[ReviewFeedback],
    previous_design: Option<&str>,
    revision: u32,
) -> String {
    let mut prompt = format!(
        "Produce a design document for the following requirement.\n\n\
         **Requirement:**\n{request}\n"
    );

    if let Some(previous) = previous_design {
        prompt.push_str(&format!(
            "\n**Previous design (revision {revision}):**\n{previous}\n"
        ));
    }

    if !reviews.is_empty() {
        prompt.push_str("\n**Reviewer feedback to address:**\n");
        for review in reviews {
            prompt.push_str(&format!(
                "- {} ({}, severity {}): {}\n",
                review.reviewer_role,
                review.decision,
                review.severity,
                review.rationale
            ));
            for concern in &review.concerns {
                prompt.push_str(&format!("  concern: {concern}\n"));
            }
            for suggestion in &review.suggestions {
                prompt.push_str(&format!("  suggestion: {suggestion}\n"));
            }
        }
    }

    prompt.push_str(
        "\nReturn ONLY a JSON object with this structure:\n\
         {\n\
           \"title\": \"...\",\n\
           \"description\": \"...\",\n\
           \"architecture_overview\": \"...\",\n\
           \"components\": [{\"name\": \"...\", \"responsibility\": \"...\"}],\n\
           \"nfr_considerations\": {\"scalability\": \"...\"},\n\
           \"security_considerations\": {\"authentication\": \"...\"},\n\
           \"integration_points\": [{\"name\": \"...\", \"description\": \"...\"}],\n\
           \"deployment_notes\": \"...\"\n\
         }",
    );
    prompt
}

/// Reviewer prompt over the content under review.
pub fn reviewer_prompt(content: &str, criteria: &str) -> String {
    format!(
        "Review the following content according to these criteria:\n\n\
         {criteria}\n\n\
         Content to Review:\n{content}\n\n\
         Provide structured feedback in JSON format with:\n\
         - decision: \"approve\", \"reject\", \"revise\", or \"escalate\"\n\
         - concerns: list of specific issues found\n\
         - suggestions: list of actionable improvements\n\
         - rationale: explanation of your decision\n\
         - severity: \"low\", \"medium\", \"high\", or \"critical\""
    )
}

/// Adjudicator prompt over the full deliberation record.
pub fn adjudicator_prompt(
    request: &str,
    current_design: &str,
    reviews: &[ReviewFeedback],
    debates: &[DebateOutcome],
    consensus: Option<&ConsensusResult>,
    unresolved: &[Disagreement],
) -> String {
    let reviews_summary = if reviews.is_empty() {
        "No reviews available.".to_string()
    } else {
        reviews
            .iter()
            .map(|r| {
                format!(
                    "**{}** - {} (severity: {})\n  {}",
                    r.reviewer_role, r.decision, r.severity, r.rationale
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    let debates_summary = if debates.is_empty() {
        "No debates occurred.".to_string()
    } else {
        debates
            .iter()
            .map(|d| {
                let status = if d.consensus_reached {
                    "Resolved"
                } else {
                    "Unresolved"
                };
                format!(
                    "**{}** - {status}\n  {}",
                    d.disagreement.topic, d.resolution_summary
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    let unresolved_summary = if unresolved.is_empty() {
        "All disagreements have been resolved through debate.".to_string()
    } else {
        unresolved
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let positions = d
                    .positions
                    .iter()
                    .map(|(role, position)| format!("    {role}: {position}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!(
                    "{}. **{}** ({}, severity: {})\n{positions}",
                    i + 1,
                    d.topic,
                    d.category,
                    d.severity
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    let consensus_summary = match consensus {
        Some(c) => format!(
            "- Agreed: {}\n- Confidence: {:.0}%\n- Summary: {}",
            c.agreed,
            c.confidence * 100.0,
            c.summary
        ),
        None => "- No consensus computed.".to_string(),
    };

    format!(
        "You are making final architectural decisions.\n\n\
         **Original Requirements:**\n{request}\n\n\
         **Current Design:**\n{current_design}\n\n\
         **Reviewer Feedback Summary:**\n{reviews_summary}\n\n\
         **Debate Outcomes:**\n{debates_summary}\n\n\
         **Consensus Status:**\n{consensus_summary}\n\n\
         **Unresolved Disagreements Requiring Your Decision:**\n{unresolved_summary}\n\n\
         Provide your Final Architectural Decisions. Return ONLY a JSON object:\n\
         {{\n\
           \"final_decisions\": [{{\"disagreement_topic\": \"...\", \"decision\": \"...\", \"rationale\": \"...\"}}],\n\
           \"architecture_rationale\": \"comprehensive overall rationale\",\n\
           \"design_updates\": [\"change\"],\n\
           \"faq_entries\": [{{\"question\": \"...\", \"answer\": \"...\"}}],\n\
           \"priority_concerns\": [\"concern\"],\n\
           \"approved_for_implementation\": true\n\
         }}"
    )
}

/// FAQ generation prompt over the deliberation record.
pub fn faq_prompt(messages: &[(String, String)], reviews: &[ReviewFeedback]) -> String {
    let discussion = messages
        .iter()
        .map(|(agent, content)| format!("**{agent}**: {content}"))
        .collect::<Vec<_>>()
        .join("\n\n");

    let review_lines = reviews
        .iter()
        .map(|r| format!("- {}: {} ({})", r.reviewer_role, r.decision, r.rationale))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Generate FAQ and decision rationale from the council discussion below.\n\n\
         **Discussion:**\n{discussion}\n\n\
         **Reviews:**\n{review_lines}\n\n\
         Return ONLY a JSON object:\n\
         {{\n\
           \"faq_entries\": [{{\"question\": \"...\", \"answer\": \"...\"}}],\n\
           \"decision_rationale\": \"...\",\n\
           \"key_takeaways\": [\"takeaway\"]\n\
         }}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReviewDecision, Severity};

    #[test]
    fn every_active_role_has_a_system_prompt() {
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
        ] {
            assert!(!system_prompt(role).is_empty(), "missing prompt for {role}");
        }
    }

    #[test]
    fn solution_prompt_includes_feedback_on_revision() {
        let review = ReviewFeedback {
            reviewer_role: AgentRole::ReviewerSecurity,
            decision: ReviewDecision::Revise,
            concerns: vec!["no token rotation".into()],
            suggestions: vec!["rotate tokens daily".into()],
            rationale: "security gaps".into(),
            severity: Severity::High,
        };
        let prompt = solution_prompt("req", &[review], Some("old design"), 1);
        assert!(prompt.contains("Previous design (revision 1)"));
        assert!(prompt.contains("no token rotation"));
        assert!(prompt.contains("rotate tokens daily"));
    }

    #[test]
    fn reviewer_prompt_names_the_verdict_fields() {
        let prompt = reviewer_prompt("the design", review_criteria(AgentRole::ReviewerNfr));
        assert!(prompt.contains("structured feedback in JSON"));
        assert!(prompt.contains("\"escalate\""));
    }
}
