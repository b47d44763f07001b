//! Disagreement detection across one round of reviews.
//!
//! Three independent detectors whose outputs are concatenated: decision
//! conflicts, opposing-pattern conflicts, and severity conflicts. Fewer
//! than two reviews yields nothing to disagree about.

use chrono::Utc;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::state::{Disagreement, ReviewFeedback};
use crate::types::{AgentRole, ReviewDecision, Severity};

/// Named opposing-pattern keyword dictionaries. A conflict requires at
/// least two sides each mentioned by some reviewer.
const OPPOSING_PATTERNS: &[(&str, &[(&str, &[&str])])] = &[
    (
        "sync_vs_async",
        &[
            (
                "sync",
                &["synchronous", "sync", "real-time", "immediate", "blocking"],
            ),
            (
                "async",
                &[
                    "asynchronous",
                    "async",
                    "eventual consistency",
                    "non-blocking",
                    "queue",
                ],
            ),
        ],
    ),
    (
        "monolith_vs_microservices",
        &[
            (
                "monolith",
                &["monolithic", "single application", "tightly coupled"],
            ),
            (
                "microservices",
                &[
                    "microservices",
                    "distributed",
                    "loosely coupled",
                    "service mesh",
                ],
            ),
        ],
    ),
    (
        "sql_vs_nosql",
        &[
            ("sql", &["relational", "sql", "acid", "normalized"]),
            (
                "nosql",
                &[
                    "nosql",
                    "document store",
                    "key-value",
                    "eventually consistent",
                ],
            ),
        ],
    ),
    (
        "rest_vs_graphql",
        &[
            ("rest", &["rest", "restful", "resource-based"]),
            ("graphql", &["graphql", "query language", "single endpoint"]),
        ],
    ),
    (
        "cost_vs_performance",
        &[
            (
                "cost_optimized",
                &["cost-effective", "economical", "budget", "cheaper"],
            ),
            (
                "performance_optimized",
                &[
                    "high performance",
                    "low latency",
                    "fast",
                    "optimized for speed",
                ],
            ),
        ],
    ),
];

/// Stateless detector over a round's reviews.
pub struct DisagreementDetector;

impl DisagreementDetector {
    pub fn new() -> Self {
        Self
    }

    /// Detect all disagreements within one round.
    pub fn detect(&self, reviews: &[ReviewFeedback]) -> Vec<Disagreement> {
        if reviews.len() < 2 {
            tracing::info!(
                count = reviews.len(),
                "disagreement detection skipped: insufficient reviews"
            );
            return Vec::new();
        }

        let mut disagreements = Vec::new();
        disagreements.extend(self.detect_decision_conflicts(reviews));
        disagreements.extend(self.detect_pattern_conflicts(reviews));
        disagreements.extend(self.detect_severity_conflicts(reviews));

        tracing::info!(
            total = disagreements.len(),
            "disagreement detection completed"
        );
        disagreements
    }

    /// Approvals coexisting with revise/reject votes form one conflict over
    /// the overall design approval.
    fn detect_decision_conflicts(&self, reviews: &[ReviewFeedback]) -> Vec<Disagreement> {
        let has_approval = reviews
            .iter()
            .any(|r| r.decision == ReviewDecision::Approve);
        let has_objection = reviews
            .iter()
            .any(|r| matches!(r.decision, ReviewDecision::Revise | ReviewDecision::Reject));

        if !(has_approval && has_objection) {
            return Vec::new();
        }

        let positions = reviews
            .iter()
            .map(|r| {
                (
                    r.reviewer_role.as_str().to_string(),
                    format!("{}: {}", r.decision, truncate(&r.rationale, 100)),
                )
            })
            .collect();

        tracing::info!("decision conflict detected");
        vec![Disagreement {
            id: Uuid::new_v4().to_string(),
            agent_roles: reviews.iter().map(|r| r.reviewer_role).collect(),
            topic: "Overall Design Approval".into(),
            positions,
            severity: conflict_severity(reviews),
            category: "decision_conflict".into(),
            detected_at: Utc::now(),
        }]
    }

    /// Opposing sides of a named pattern each mentioned by some reviewer.
    fn detect_pattern_conflicts(&self, reviews: &[ReviewFeedback]) -> Vec<Disagreement> {
        let mut conflicts = Vec::new();

        for (pattern_name, sides) in OPPOSING_PATTERNS {
            // side name → roles that mentioned it.
            let mut sides_detected: BTreeMap<&str, Vec<AgentRole>> = BTreeMap::new();

            for (side_name, keywords) in *sides {
                for review in reviews {
                    let text = review_text(review);
                    if keywords.iter().any(|k| text.contains(k)) {
                        let roles = sides_detected.entry(side_name).or_default();
                        if !roles.contains(&review.reviewer_role) {
                            roles.push(review.reviewer_role);
                        }
                    }
                }
            }

            if sides_detected.len() < 2 {
                continue;
            }

            // Each involved role takes the first side it was detected on.
            let mut positions = BTreeMap::new();
            let mut agent_roles = Vec::new();
            for (side, roles) in &sides_detected {
                for role in roles {
                    positions
                        .entry(role.as_str().to_string())
                        .or_insert_with(|| format!("Recommends {side}"));
                    if !agent_roles.contains(role) {
                        agent_roles.push(*role);
                    }
                }
            }

            tracing::info!(pattern = pattern_name, "pattern conflict detected");
            conflicts.push(Disagreement {
                id: Uuid::new_v4().to_string(),
                agent_roles,
                topic: format!("Technical Approach: {}", title_case(pattern_name)),
                positions,
                severity: Severity::Medium,
                category: format!("pattern_conflict_{pattern_name}"),
                detected_at: Utc::now(),
            });
        }

        conflicts
    }

    /// The same concern raised by several reviewers at different severities.
    fn detect_severity_conflicts(&self, reviews: &[ReviewFeedback]) -> Vec<Disagreement> {
        let mut concern_map: BTreeMap<String, Vec<(AgentRole, Severity)>> = BTreeMap::new();
        for review in reviews {
            for concern in &review.concerns {
                concern_map
                    .entry(concern.to_lowercase())
                    .or_default()
                    .push((review.reviewer_role, review.severity));
            }
        }

        let mut conflicts = Vec::new();
        for (concern, entries) in concern_map {
            if entries.len() < 2 {
                continue;
            }
            let distinct: std::collections::BTreeSet<Severity> =
                entries.iter().map(|(_, s)| *s).collect();
            if distinct.len() < 2 {
                continue;
            }

            let positions = entries
                .iter()
                .map(|(role, severity)| {
                    (role.as_str().to_string(), format!("Severity: {severity}"))
                })
                .collect();

            tracing::info!(concern = %truncate(&concern, 50), "severity conflict detected");
            conflicts.push(Disagreement {
                id: Uuid::new_v4().to_string(),
                agent_roles: entries.iter().map(|(role, _)| *role).collect(),
                topic: format!("Severity Assessment: {}", truncate(&concern, 50)),
                positions,
                severity: Severity::Low,
                category: "severity_conflict".into(),
                detected_at: Utc::now(),
            });
        }

        conflicts
    }
}

impl Default for DisagreementDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Severity of a conflict derived from the reviews involved: any critical
/// wins, two highs make high, one high or two mediums make medium.
pub fn conflict_severity(reviews: &[ReviewFeedback]) -> Severity {
    let count = |severity: Severity| reviews.iter().filter(|r| r.severity == severity).count();

    if count(Severity::Critical) > 0 {
        Severity::Critical
    } else if count(Severity::High) > 1 {
        Severity::High
    } else if count(Severity::High) > 0 || count(Severity::Medium) > 1 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn review_text(review: &ReviewFeedback) -> String {
    let mut parts: Vec<&str> = Vec::new();
    parts.extend(review.concerns.iter().map(String::as_str));
    parts.extend(review.suggestions.iter().map(String::as_str));
    parts.join(" ").to_lowercase()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}...")
    }
}

fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
