//! Markdown report assembly.

use super::DeliverablesBundle;

/// Assemble the complete Markdown report. Section headers are fixed;
/// every decision, risk, FAQ, and diagram in the bundle appears in it.
pub fn assemble(bundle: &DeliverablesBundle) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push("# Architecture Deliverables".into());
    lines.push(String::new());
    lines.push(format!("**Session ID:** {}", bundle.session_id));
    lines.push(format!(
        "**Generated:** {}",
        bundle.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.push(format!("**Workflow Version:** {}", bundle.workflow_version));
    lines.push(String::new());
    lines.push("---".into());
    lines.push(String::new());

    lines.push("## Architecture Summary".into());
    lines.push(String::new());
    lines.push(bundle.architecture_summary.overview.clone());
    lines.push(String::new());
    lines.push("### Key Capabilities".into());
    lines.push(String::new());
    for capability in &bundle.architecture_summary.key_capabilities {
        lines.push(format!("* {capability}"));
    }
    lines.push(String::new());
    lines.push("### Non-Functional Highlights".into());
    lines.push(String::new());
    for highlight in &bundle.architecture_summary.non_functional_highlights {
        lines.push(format!("* {highlight}"));
    }
    lines.push(String::new());
    lines.push("---".into());
    lines.push(String::new());

    lines.push("## Key Design Decisions".into());
    lines.push(String::new());
    for decision in &bundle.decisions {
        lines.push(format!("### {}: {}", decision.id, decision.title));
        lines.push(String::new());
        lines.push(format!("**Context:** {}", decision.context));
        lines.push(String::new());
        lines.push(format!("**Decision:** {}", decision.decision));
        lines.push(String::new());
        lines.push(format!("**Rationale:** {}", decision.rationale));
        lines.push(String::new());
        lines.push(format!("**Consequences:** {}", decision.consequences));
        lines.push(String::new());
    }
    lines.push("---".into());
    lines.push(String::new());

    lines.push("## Risks & Mitigations".into());
    lines.push(String::new());
    lines.push("| Risk ID | Description | Impact | Likelihood | Mitigation |".into());
    lines.push("|---------|-------------|--------|------------|------------|".into());
    for risk in &bundle.risks {
        lines.push(format!(
            "| {} | {} | {} | {} | {} |",
            risk.id,
            cell(&risk.description),
            risk.impact,
            risk.likelihood,
            cell(&risk.mitigation),
        ));
    }
    lines.push(String::new());
    lines.push("---".into());
    lines.push(String::new());

    lines.push("## FAQ".into());
    lines.push(String::new());
    for (index, faq) in bundle.faqs.iter().enumerate() {
        lines.push(format!("### Q{}: {}", index + 1, faq.question));
        lines.push(String::new());
        lines.push(format!("**A:** {}", faq.answer));
        lines.push(String::new());
    }
    lines.push("---".into());
    lines.push(String::new());

    lines.push("## Architecture Diagrams".into());
    lines.push(String::new());
    for diagram in &bundle.diagrams {
        lines.push(format!("### {}", diagram.title));
        lines.push(String::new());
        lines.push(format!("**Type:** {}", diagram.kind.as_str()));
        lines.push(String::new());
        lines.push(format!("**Description:** {}", diagram.description));
        lines.push(String::new());
        if let Some(url) = &diagram.external_url {
            lines.push(format!("**Diagram:** [Open diagram]({url})"));
            lines.push(String::new());
        } else if let Some(source) = &diagram.mermaid_source {
            lines.push("**Mermaid Source:**".into());
            lines.push(String::new());
            lines.push("```mermaid".into());
            lines.push(source.clone());
            lines.push("```".into());
            lines.push(String::new());
        }
    }

    lines.push("---".into());
    lines.push(String::new());
    lines.push("*Generated by the Quorum deliberation platform*".into());
    lines.push(String::new());

    lines.join("\n")
}

/// Table cells cap at 80 characters and must not break the row.
fn cell(text: &str) -> String {
    let flat = text.replace('|', "/").replace('\n', " ");
    let truncated: String = flat.chars().take(80).collect();
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_escapes_pipes_and_truncates() {
        let long = "a|b\n".repeat(40);
        let out = cell(&long);
        assert!(!out.contains('|'));
        assert!(!out.contains('\n'));
        assert_eq!(out.chars().count(), 80);
    }
}
