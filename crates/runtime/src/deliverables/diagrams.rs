//! Fallback text-diagram (Mermaid) sources.
//!
//! Emitted whenever no external diagram-service URL is available, and
//! always in demo mode. Consumers render either form.

use crate::state::WorkflowState;

fn short_title(state: &WorkflowState) -> String {
    let title: String = state.user_request.chars().take(30).collect();
    if state.user_request.chars().count() > 30 {
        format!("{title}...")
    } else {
        title
    }
}

pub fn context_diagram(state: &WorkflowState) -> String {
    format!(
        "graph TB\n\
         \x20   subgraph External Systems\n\
         \x20       A[Consumer Applications]\n\
         \x20       B[Backend System 1]\n\
         \x20       C[Backend System 2]\n\
         \x20   end\n\n\
         \x20   subgraph \"{}\"\n\
         \x20       G[API Gateway]\n\
         \x20       P[Process Layer]\n\
         \x20   end\n\n\
         \x20   A --> G\n\
         \x20   G --> P\n\
         \x20   P --> B\n\
         \x20   P --> C",
        short_title(state)
    )
}

pub fn integration_flow_diagram(state: &WorkflowState) -> String {
    let integration_count = state
        .current_design
        .as_ref()
        .map(|d| d.integration_points.len())
        .unwrap_or(0)
        .max(1);
    format!(
        "graph LR\n\
         \x20   A[Source System] --> B[API Gateway]\n\
         \x20   B --> C[Data Transformation]\n\
         \x20   C --> D[Business Logic]\n\
         \x20   D --> E[Target Systems x{integration_count}]\n\
         \x20   D --> F[Logging & Monitoring]"
    )
}

pub fn deployment_diagram(_state: &WorkflowState) -> String {
    "graph TB\n\
     \x20   subgraph Runtime Platform\n\
     \x20       A[API Gateway]\n\
     \x20       B[Integration Apps]\n\
     \x20       C[Data Services]\n\
     \x20   end\n\n\
     \x20   subgraph Backends\n\
     \x20       D[Platform APIs]\n\
     \x20   end\n\n\
     \x20   subgraph Monitoring\n\
     \x20       E[Metrics]\n\
     \x20       F[Dashboards]\n\
     \x20   end\n\n\
     \x20   B --> A\n\
     \x20   B --> C\n\
     \x20   B --> D\n\
     \x20   A --> E\n\
     \x20   B --> E"
        .to_string()
}

pub fn sequence_diagram(_state: &WorkflowState) -> String {
    "sequenceDiagram\n\
     \x20   participant Client\n\
     \x20   participant Gateway\n\
     \x20   participant Orchestrator\n\
     \x20   participant Backend\n\n\
     \x20   Client->>Gateway: Request\n\
     \x20   Gateway->>Orchestrator: Validate & Route\n\
     \x20   Orchestrator->>Backend: Query/Update\n\
     \x20   Backend-->>Orchestrator: Response\n\
     \x20   Orchestrator-->>Gateway: Transformed Data\n\
     \x20   Gateway-->>Client: Response"
        .to_string()
}
