//! Agent runtimes: role-specialised call pipelines composed of a system
//! prompt, a gateway call, and a strict parser.

use std::sync::Arc;

use crate::llm::LlmGateway;
use crate::tools::ToolRegistry;
use crate::types::AgentRole;

pub mod critic;
pub mod outputs;
pub mod performer;
pub mod prompts;

pub use critic::{CriticAgent, CriticOutput};
pub use performer::{PerformerAgent, PerformerContext, PerformerOutput};

/// Factory mapping roles onto configured agents.
///
/// Holds the shared gateway and tool registry; consensus weights live in
/// configuration, not here.
pub struct AgentFactory {
    gateway: Arc<LlmGateway>,
    tools: Arc<ToolRegistry>,
    demo_mode: bool,
}

impl AgentFactory {
    pub fn new(gateway: Arc<LlmGateway>, tools: Arc<ToolRegistry>, demo_mode: bool) -> Self {
        Self {
            gateway,
            tools,
            demo_mode,
        }
    }

    /// Build a performer for a content-producing role.
    pub fn performer(&self, role: AgentRole) -> PerformerAgent {
        debug_assert!(
            matches!(
                role,
                AgentRole::Master
                    | AgentRole::SolutionArchitect
                    | AgentRole::Adjudicator
                    | AgentRole::Faq
            ),
            "{role} is not a performer role"
        );
        PerformerAgent::new(
            role,
            self.gateway.clone(),
            self.tools.clone(),
            self.demo_mode,
        )
    }

    /// Build a critic for a reviewer role.
    pub fn critic(&self, role: AgentRole) -> CriticAgent {
        debug_assert!(role.is_reviewer(), "{role} is not a reviewer role");
        CriticAgent::new(role, self.gateway.clone(), self.tools.clone())
    }

    pub fn gateway(&self) -> Arc<LlmGateway> {
        self.gateway.clone()
    }

    pub fn tools(&self) -> Arc<ToolRegistry> {
        self.tools.clone()
    }

    pub fn demo_mode(&self) -> bool {
        self.demo_mode
    }
}
