//! Typed agent output schemas.
//!
//! Each JSON-mode agent has a declared output shape. Parsing is strict about
//! structure but tolerant about optional fields; reviewer list items accept
//! both plain strings and the structured `{area, description}` form. On full
//! parse failure callers degrade to a raw fallback and record a warning;
//! untyped maps never cross component boundaries.

use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::state::{DesignComponent, DesignDocument, FaqEntry, IntegrationPoint};
use crate::types::{ReviewDecision, Severity};

/// A list item that may be a bare string or a structured object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FlexItem {
    Text(String),
    Structured {
        #[serde(default)]
        area: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        suggestion: Option<String>,
    },
}

impl FlexItem {
    /// Flatten to a plain string.
    pub fn into_text(self) -> String {
        match self {
            FlexItem::Text(s) => s,
            FlexItem::Structured {
                area,
                description,
                suggestion,
            } => {
                let body = description.or(suggestion).unwrap_or_default();
                match area {
                    Some(area) if !area.is_empty() => format!("{area}: {body}"),
                    _ => body,
                }
            }
        }
    }
}

fn flatten(items: Vec<FlexItem>) -> Vec<String> {
    items
        .into_iter()
        .map(FlexItem::into_text)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Master architect's initial analysis.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MasterAnalysis {
    pub requirements_summary: String,
    pub key_considerations: Vec<String>,
    pub proposed_approach: ProposedApproach,
    pub questions_for_clarification: Vec<String>,
    pub areas_for_specialist_review: BTreeMap<String, String>,
    pub risks: Vec<RiskNote>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProposedApproach {
    pub high_level_architecture: String,
    pub key_components: Vec<String>,
    pub integration_strategy: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RiskNote {
    pub risk: String,
    pub mitigation: String,
}

/// Solution architect's design payload.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SolutionDesign {
    pub title: String,
    pub description: String,
    pub architecture_overview: String,
    pub components: Vec<DesignComponent>,
    pub nfr_considerations: BTreeMap<String, String>,
    pub security_considerations: BTreeMap<String, String>,
    pub integration_points: Vec<IntegrationPoint>,
    pub deployment_notes: String,
}

impl SolutionDesign {
    /// Materialise a versioned design document.
    pub fn into_document(self, version: u32) -> DesignDocument {
        DesignDocument {
            version,
            title: if self.title.is_empty() {
                "Solution Design".into()
            } else {
                self.title
            },
            description: self.description,
            architecture_overview: self.architecture_overview,
            components: self.components,
            nfr_considerations: self.nfr_considerations,
            security_considerations: self.security_considerations,
            integration_points: self.integration_points,
            deployment_notes: self.deployment_notes,
            diagrams: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

/// Raw reviewer verdict as returned by the model.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewerVerdict {
    pub decision: String,
    #[serde(default)]
    pub concerns: Vec<FlexItem>,
    #[serde(default)]
    pub suggestions: Vec<FlexItem>,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub severity: Option<String>,
}

impl ReviewerVerdict {
    /// Resolve the enum fields, reporting what could not be parsed.
    pub fn resolve(self) -> (ReviewDecision, Vec<String>, Vec<String>, String, Severity, Vec<String>) {
        let mut warnings = Vec::new();
        let decision = match ReviewDecision::parse(&self.decision) {
            Some(d) => d,
            None => {
                warnings.push(format!(
                    "unknown review decision '{}', defaulting to revise",
                    self.decision
                ));
                ReviewDecision::Revise
            }
        };
        let severity = match self.severity.as_deref() {
            None => Severity::Medium,
            Some(raw) => match Severity::parse(raw) {
                Some(s) => s,
                None => {
                    warnings.push(format!("unknown severity '{raw}', defaulting to medium"));
                    Severity::Medium
                }
            },
        };
        (
            decision,
            flatten(self.concerns),
            flatten(self.suggestions),
            self.rationale,
            severity,
            warnings,
        )
    }
}

/// Adjudicator's final ruling.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Adjudication {
    pub final_decisions: Vec<FinalDecision>,
    pub architecture_rationale: String,
    pub design_updates: Vec<String>,
    pub faq_entries: Vec<FaqEntry>,
    pub priority_concerns: Vec<String>,
    pub approved_for_implementation: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FinalDecision {
    pub disagreement_topic: String,
    pub decision: String,
    pub rationale: String,
}

/// FAQ agent output.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FaqOutput {
    pub faq_entries: Vec<FaqEntry>,
    pub decision_rationale: String,
    pub key_takeaways: Vec<String>,
}

/// Wrap unparseable JSON-mode content as a degraded-but-valid payload.
pub fn raw_fallback(raw: &str) -> String {
    serde_json::json!({ "analysis": raw }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flex_items_accept_both_shapes() {
        let json = r#"{
            "decision": "revise",
            "concerns": [
                "plain concern",
                {"area": "security", "description": "token rotation missing"}
            ],
            "suggestions": [
                {"area": "ops", "suggestion": "add runbooks"}
            ],
            "rationale": "needs work",
            "severity": "high"
        }"#;
        let verdict: ReviewerVerdict = serde_json::from_str(json).unwrap();
        let (decision, concerns, suggestions, rationale, severity, warnings) = verdict.resolve();
        assert_eq!(decision, ReviewDecision::Revise);
        assert_eq!(concerns, vec![
            "plain concern".to_string(),
            "security: token rotation missing".to_string()
        ]);
        assert_eq!(suggestions, vec!["ops: add runbooks".to_string()]);
        assert_eq!(rationale, "needs work");
        assert_eq!(severity, Severity::High);
        assert!(warnings.is_empty());
    }

    #[test]
    fn unknown_decision_degrades_with_warning() {
        let verdict = ReviewerVerdict {
            decision: "maybe".into(),
            concerns: vec![],
            suggestions: vec![],
            rationale: String::new(),
            severity: Some("catastrophic".into()),
        };
        let (decision, _, _, _, severity, warnings) = verdict.resolve();
        assert_eq!(decision, ReviewDecision::Revise);
        assert_eq!(severity, Severity::Medium);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn solution_design_becomes_versioned_document() {
        let design: SolutionDesign = serde_json::from_str(
            r#"{
                "title": "Payments",
                "description": "d",
                "architecture_overview": "o",
                "components": [{"name": "Gateway", "responsibility": "ingress"}],
                "integration_points": [{"name": "ERP", "description": "orders"}]
            }"#,
        )
        .unwrap();
        let doc = design.into_document(2);
        assert_eq!(doc.version, 2);
        assert_eq!(doc.components.len(), 1);
        assert_eq!(doc.integration_points.len(), 1);
    }

    #[test]
    fn empty_title_gets_a_default() {
        let doc = SolutionDesign::default().into_document(1);
        assert_eq!(doc.title, "Solution Design");
    }

    #[test]
    fn adjudication_tolerates_missing_fields() {
        let adjudication: Adjudication =
            serde_json::from_str(r#"{"architecture_rationale": "r"}"#).unwrap();
        assert_eq!(adjudication.architecture_rationale, "r");
        assert!(adjudication.final_decisions.is_empty());
        assert!(!adjudication.approved_for_implementation);
    }

    #[test]
    fn raw_fallback_is_valid_json() {
        let wrapped = raw_fallback("not { json");
        let value: serde_json::Value = serde_json::from_str(&wrapped).unwrap();
        assert_eq!(value["analysis"], "not { json");
    }
}
