//! Quorum deliberation runtime.
//!
//! Orchestrates a bounded, multi-stage deliberation among LLM-backed agent
//! roles: an architect proposes a design, specialist reviewers critique it
//! in parallel, disagreements are debated under stability safeguards,
//! weighted consensus decides whether adjudication is needed, a human gate
//! pauses the run for approval, and terminal state is transformed into a
//! deterministic deliverables bundle.

pub mod agents;
pub mod config;
pub mod debate;
pub mod deliverables;
pub mod llm;
pub mod state;
pub mod tools;
pub mod types;
pub mod workflow;

// Re-export the boundary surface.
pub use config::{ConfigError, RuntimeConfig};
pub use deliverables::DeliverablesBundle;
pub use llm::{CannedProvider, InferenceProvider};
pub use state::{SessionPage, SessionSummary, SqliteStateStore, StateStore, WorkflowState};
pub use types::{
    AgentRole, HumanAction, ReviewDecision, RuntimeError, RuntimeResult, SessionId, Severity,
    WorkflowStatus,
};
pub use workflow::{NewSessionRequest, SessionService, WorkflowSnapshot};
