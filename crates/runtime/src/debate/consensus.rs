//! Weighted consensus over one round of reviews and its debates.

use chrono::Utc;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::config::ConsensusConfig;
use crate::state::{ConsensusResult, DebateOutcome, ReviewFeedback};
use crate::types::ReviewDecision;

/// Per-debate confidence adjustment, clamped to ±0.2 overall.
const DEBATE_ADJUSTMENT_STEP: f64 = 0.05;
const DEBATE_ADJUSTMENT_CAP: f64 = 0.2;

/// Computes whether the council agrees, and how confidently.
pub struct ConsensusEngine {
    config: ConsensusConfig,
}

impl ConsensusEngine {
    pub fn new(config: ConsensusConfig) -> Self {
        Self { config }
    }

    /// Compute consensus from the round's reviews and debates.
    pub fn compute(&self, reviews: &[ReviewFeedback], debates: &[DebateOutcome]) -> ConsensusResult {
        let round_id = Uuid::new_v4().to_string();

        let mut vote_breakdown = BTreeMap::new();
        let mut weights_applied = BTreeMap::new();
        for review in reviews {
            let role = review.reviewer_role;
            vote_breakdown.insert(role.as_str().to_string(), review.decision);
            weights_applied.insert(role.as_str().to_string(), self.config.weight_for(role));
        }

        let raw_confidence = self.weighted_confidence(reviews);
        let adjustment = debate_adjustment(debates);
        let confidence = (raw_confidence + adjustment).clamp(0.0, 1.0);
        let agreed = confidence >= self.config.threshold;

        let resolved_ids: Vec<String> = debates
            .iter()
            .filter(|d| d.consensus_reached)
            .map(|d| d.id.clone())
            .collect();
        let unresolved_ids: Vec<String> = debates
            .iter()
            .filter(|d| !d.consensus_reached)
            .map(|d| d.id.clone())
            .collect();

        let summary = self.summary(agreed, confidence, &vote_breakdown, debates);

        tracing::info!(
            round_id = %round_id,
            agreed,
            confidence,
            resolved = resolved_ids.len(),
            unresolved = unresolved_ids.len(),
            "consensus computed"
        );

        ConsensusResult {
            round_id,
            agreed,
            confidence,
            summary,
            resolved_ids,
            unresolved_ids,
            vote_breakdown,
            weights_applied,
            threshold: self.config.threshold,
            timestamp: Utc::now(),
        }
    }

    /// Weighted vote score normalised to [0, 1].
    ///
    /// Approve scores +1·w, Revise 0, Escalate +0.3·w, Reject −0.5·w; the
    /// raw sum is shifted from [−0.5Σw, Σw] into the unit interval.
    fn weighted_confidence(&self, reviews: &[ReviewFeedback]) -> f64 {
        let total_weight: f64 = reviews
            .iter()
            .map(|r| self.config.weight_for(r.reviewer_role))
            .sum();
        if total_weight == 0.0 {
            return 0.0;
        }

        let weighted_sum: f64 = reviews
            .iter()
            .map(|r| {
                let weight = self.config.weight_for(r.reviewer_role);
                match r.decision {
                    ReviewDecision::Approve => 1.0 * weight,
                    ReviewDecision::Revise => 0.0,
                    ReviewDecision::Escalate => 0.3 * weight,
                    ReviewDecision::Reject => -0.5 * weight,
                }
            })
            .sum();

        ((weighted_sum + 0.5 * total_weight) / (1.5 * total_weight)).clamp(0.0, 1.0)
    }

    fn summary(
        &self,
        agreed: bool,
        confidence: f64,
        votes: &BTreeMap<String, ReviewDecision>,
        debates: &[DebateOutcome],
    ) -> String {
        let count = |decision: ReviewDecision| votes.values().filter(|v| **v == decision).count();
        let approvals = count(ReviewDecision::Approve);
        let revisions = count(ReviewDecision::Revise);
        let rejections = count(ReviewDecision::Reject);
        let resolved = debates.iter().filter(|d| d.consensus_reached).count();
        let unresolved = debates.len() - resolved;

        if agreed {
            let mut summary = format!(
                "Consensus reached with {:.1}% confidence. Votes: {approvals} approve, \
                 {revisions} revise, {rejections} reject.",
                confidence * 100.0
            );
            if !debates.is_empty() {
                summary.push_str(&format!(" Resolved {resolved}/{} debates.", debates.len()));
            }
            summary
        } else if !debates.is_empty() {
            format!(
                "Consensus not reached ({:.1}% confidence, threshold {:.1}%). \
                 {unresolved} unresolved debate(s). Requires adjudication.",
                confidence * 100.0,
                self.config.threshold * 100.0
            )
        } else {
            format!(
                "Consensus not reached ({:.1}% confidence, threshold {:.1}%). Votes: \
                 {approvals} approve, {revisions} revise, {rejections} reject. \
                 Requires adjudication.",
                confidence * 100.0,
                self.config.threshold * 100.0
            )
        }
    }
}

/// +0.05 per resolved debate, −0.05 per unresolved, capped at ±0.2.
fn debate_adjustment(debates: &[DebateOutcome]) -> f64 {
    if debates.is_empty() {
        return 0.0;
    }
    let resolved = debates.iter().filter(|d| d.consensus_reached).count() as f64;
    let unresolved = debates.len() as f64 - resolved;
    ((resolved - unresolved) * DEBATE_ADJUSTMENT_STEP)
        .clamp(-DEBATE_ADJUSTMENT_CAP, DEBATE_ADJUSTMENT_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Disagreement;
    use crate::types::{AgentRole, Severity};

    fn review(role: AgentRole, decision: ReviewDecision) -> ReviewFeedback {
        ReviewFeedback {
            reviewer_role: role,
            decision,
            concerns: vec![],
            suggestions: vec![],
            rationale: String::new(),
            severity: Severity::Low,
        }
    }

    fn debate(resolved: bool) -> DebateOutcome {
        DebateOutcome {
            id: Uuid::new_v4().to_string(),
            disagreement: Disagreement {
                id: Uuid::new_v4().to_string(),
                agent_roles: vec![],
                topic: "t".into(),
                positions: BTreeMap::new(),
                severity: Severity::Medium,
                category: "decision_conflict".into(),
                detected_at: Utc::now(),
            },
            rounds: 1,
            revised_positions: BTreeMap::new(),
            consensus_reached: resolved,
            resolution_summary: String::new(),
            confidence: 0.7,
            timestamp: Utc::now(),
        }
    }

    fn engine() -> ConsensusEngine {
        ConsensusEngine::new(ConsensusConfig::default())
    }

    #[test]
    fn all_approvals_agree_with_full_confidence() {
        let reviews = vec![
            review(AgentRole::ReviewerNfr, ReviewDecision::Approve),
            review(AgentRole::ReviewerSecurity, ReviewDecision::Approve),
            review(AgentRole::ReviewerIntegration, ReviewDecision::Approve),
        ];
        let result = engine().compute(&reviews, &[]);
        assert!(result.agreed);
        assert!((result.confidence - 1.0).abs() < 1e-9);
        assert!(result.summary.contains("Consensus reached"));
        assert_eq!(result.vote_breakdown.len(), 3);
        assert_eq!(result.weights_applied.len(), 3);
    }

    #[test]
    fn all_rejections_do_not_agree() {
        let reviews = vec![
            review(AgentRole::ReviewerNfr, ReviewDecision::Reject),
            review(AgentRole::ReviewerSecurity, ReviewDecision::Reject),
        ];
        let result = engine().compute(&reviews, &[]);
        assert!(!result.agreed);
        // All rejects score -0.5Σw, normalising to exactly 0.
        assert!(result.confidence.abs() < 1e-9);
        assert!(result.summary.contains("Requires adjudication"));
    }

    #[test]
    fn all_revisions_land_on_neutral_third() {
        let reviews = vec![
            review(AgentRole::ReviewerNfr, ReviewDecision::Revise),
            review(AgentRole::ReviewerSecurity, ReviewDecision::Revise),
        ];
        let result = engine().compute(&reviews, &[]);
        // Revise scores 0, normalising to 1/3.
        assert!((result.confidence - 1.0 / 3.0).abs() < 1e-9);
        assert!(!result.agreed);
    }

    #[test]
    fn resolved_debates_lift_confidence() {
        let reviews = vec![
            review(AgentRole::ReviewerNfr, ReviewDecision::Approve),
            review(AgentRole::ReviewerSecurity, ReviewDecision::Revise),
        ];
        let without = engine().compute(&reviews, &[]);
        let with = engine().compute(&reviews, &[debate(true)]);
        assert!((with.confidence - (without.confidence + 0.05)).abs() < 1e-9);
        assert_eq!(with.resolved_ids.len(), 1);
        assert!(with.unresolved_ids.is_empty());
    }

    #[test]
    fn unresolved_debates_lower_confidence() {
        let reviews = vec![
            review(AgentRole::ReviewerNfr, ReviewDecision::Approve),
            review(AgentRole::ReviewerSecurity, ReviewDecision::Approve),
        ];
        let result = engine().compute(&reviews, &[debate(false)]);
        assert!((result.confidence - 0.95).abs() < 1e-9);
        assert_eq!(result.unresolved_ids.len(), 1);
    }

    #[test]
    fn adjustment_caps_at_plus_minus_point_two() {
        let resolved: Vec<DebateOutcome> = (0..10).map(|_| debate(true)).collect();
        assert!((debate_adjustment(&resolved) - 0.2).abs() < 1e-9);
        let unresolved: Vec<DebateOutcome> = (0..10).map(|_| debate(false)).collect();
        assert!((debate_adjustment(&unresolved) + 0.2).abs() < 1e-9);
    }

    #[test]
    fn agreed_iff_confidence_meets_threshold() {
        let reviews = vec![
            review(AgentRole::ReviewerNfr, ReviewDecision::Approve),
            review(AgentRole::ReviewerSecurity, ReviewDecision::Reject),
            review(AgentRole::ReviewerIntegration, ReviewDecision::Revise),
        ];
        let result = engine().compute(&reviews, &[]);
        assert_eq!(result.agreed, result.confidence >= result.threshold);
    }

    #[test]
    fn empty_reviews_yield_zero_confidence() {
        let result = engine().compute(&[], &[]);
        assert!(!result.agreed);
        assert!(result.confidence.abs() < 1e-9);
    }
}
