//! Session service: the boundary facade over the kernel and store.
//!
//! Owns session CRUD plus the workflow operations (start, step, status,
//! deliverables). The HTTP transport, when present, is a thin shell over
//! this type.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::kernel::{WorkflowKernel, WorkflowSnapshot};
use crate::agents::AgentFactory;
use crate::config::RuntimeConfig;
use crate::debate::{ConsensusEngine, DebateEngine};
use crate::deliverables::{DeliverablesBuilder, DeliverablesBundle};
use crate::llm::{InferenceProvider, LlmGateway, ModelSelector, PromptGuard};
use crate::state::{SessionPage, StateStore, WorkflowState};
use crate::tools::ToolRegistry;
use crate::types::{
    HumanAction, RuntimeError, RuntimeResult, SessionId, StoreError, WorkflowStatus,
};

/// Input for creating a session.
#[derive(Debug, Clone, Default)]
pub struct NewSessionRequest {
    pub user_request: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub user_context: BTreeMap<String, serde_json::Value>,
}

/// The service facade.
pub struct SessionService {
    store: Arc<dyn StateStore>,
    kernel: Arc<WorkflowKernel>,
    max_revisions: u32,
}

impl SessionService {
    /// Wire the full runtime from configuration, a store, and a provider.
    /// This is the composition root: everything is constructed once here
    /// and shared by reference afterwards.
    pub fn new(
        config: RuntimeConfig,
        store: Arc<dyn StateStore>,
        provider: Arc<dyn InferenceProvider>,
    ) -> Self {
        let gateway = Arc::new(LlmGateway::new(
            provider,
            PromptGuard::new(false),
            ModelSelector::new(config.selector.clone()),
        ));
        let tools = Arc::new(ToolRegistry::with_builtins(config.tools.clone()));
        let agents = Arc::new(AgentFactory::new(
            gateway.clone(),
            tools,
            config.demo_mode,
        ));
        let debate_engine = Arc::new(DebateEngine::new(gateway, config.debate.clone()));
        let consensus_engine = ConsensusEngine::new(config.consensus.clone());
        let builder = DeliverablesBuilder::new(config.demo_mode);

        let kernel = Arc::new(WorkflowKernel::new(
            store.clone(),
            agents,
            debate_engine,
            consensus_engine,
            builder,
            config.workflow.clone(),
            config.demo_mode,
        ));

        Self {
            store,
            kernel,
            max_revisions: config.workflow.max_revisions,
        }
    }

    /// Wire the service with an externally constructed kernel (tests).
    pub fn with_kernel(
        store: Arc<dyn StateStore>,
        kernel: Arc<WorkflowKernel>,
        max_revisions: u32,
    ) -> Self {
        Self {
            store,
            kernel,
            max_revisions,
        }
    }

    /// Create a new session in `Pending` status.
    pub async fn create_session(
        &self,
        request: NewSessionRequest,
    ) -> RuntimeResult<WorkflowState> {
        if request.user_request.trim().is_empty() {
            return Err(RuntimeError::Validation(
                "user_request must not be empty".into(),
            ));
        }

        let mut state = WorkflowState::new(
            request.user_request,
            request.user_context,
            self.max_revisions,
        );
        state.name = request.name;
        state.description = request.description;

        self.store.save(&state).await?;
        tracing::info!(session_id = %state.session_id, "session created");
        Ok(state)
    }

    /// Full state projection for one session.
    pub async fn get_session(&self, session_id: SessionId) -> RuntimeResult<WorkflowState> {
        self.load(session_id).await
    }

    /// Page through sessions, newest first.
    pub async fn list_sessions(&self, limit: u64, offset: u64) -> RuntimeResult<SessionPage> {
        Ok(self.store.list(limit, offset).await?)
    }

    /// Delete a session.
    pub async fn delete_session(&self, session_id: SessionId) -> RuntimeResult<()> {
        match self.store.delete(session_id).await {
            Ok(()) => {
                tracing::info!(session_id = %session_id, "session deleted");
                Ok(())
            }
            Err(StoreError::NotFound(id)) => Err(RuntimeError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Run the workflow until it pauses or terminates.
    pub async fn start_workflow(&self, session_id: SessionId) -> RuntimeResult<WorkflowSnapshot> {
        self.kernel.start(session_id).await
    }

    /// Advance a session paused at the human gate.
    pub async fn step_workflow(
        &self,
        session_id: SessionId,
        action: HumanAction,
        comment: Option<String>,
    ) -> RuntimeResult<WorkflowSnapshot> {
        self.kernel.step(session_id, action, comment).await
    }

    /// Current workflow snapshot.
    pub async fn get_status(&self, session_id: SessionId) -> RuntimeResult<WorkflowSnapshot> {
        self.kernel.status(session_id).await
    }

    /// The deliverables bundle, available once the workflow completes.
    pub async fn get_deliverables(
        &self,
        session_id: SessionId,
    ) -> RuntimeResult<DeliverablesBundle> {
        let state = self.load(session_id).await?;
        if state.status != WorkflowStatus::Completed {
            return Err(RuntimeError::NotAvailable(format!(
                "workflow status is {}; deliverables are generated on completion",
                state.status
            )));
        }
        state.deliverables.ok_or_else(|| {
            RuntimeError::NotAvailable("deliverables bundle was not generated".into())
        })
    }

    async fn load(&self, session_id: SessionId) -> RuntimeResult<WorkflowState> {
        match self.store.load(session_id).await {
            Ok(state) => Ok(state),
            Err(StoreError::NotFound(id)) => Err(RuntimeError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CannedProvider;
    use crate::state::SqliteStateStore;

    fn service() -> SessionService {
        let mut config = RuntimeConfig::default();
        config.demo_mode = true;
        let store = Arc::new(SqliteStateStore::open_in_memory().unwrap());
        SessionService::new(config, store, Arc::new(CannedProvider::new()))
    }

    #[tokio::test]
    async fn create_rejects_empty_request() {
        let service = service();
        let err = service
            .create_session(NewSessionRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Validation(_)));
    }

    #[tokio::test]
    async fn create_get_list_delete_round_trip() {
        let service = service();
        let state = service
            .create_session(NewSessionRequest {
                user_request: "Design a data sync".into(),
                name: Some("sync".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(state.status, WorkflowStatus::Pending);

        let loaded = service.get_session(state.session_id).await.unwrap();
        assert_eq!(loaded.name.as_deref(), Some("sync"));

        let page = service.list_sessions(10, 0).await.unwrap();
        assert_eq!(page.total, 1);

        service.delete_session(state.session_id).await.unwrap();
        let err = service.get_session(state.session_id).await.unwrap_err();
        assert!(matches!(err, RuntimeError::NotFound(_)));
    }

    #[tokio::test]
    async fn deliverables_unavailable_before_completion() {
        let service = service();
        let state = service
            .create_session(NewSessionRequest {
                user_request: "Design a data sync".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let err = service.get_deliverables(state.session_id).await.unwrap_err();
        assert!(matches!(err, RuntimeError::NotAvailable(_)));
    }

    #[tokio::test]
    async fn status_for_unknown_session_is_not_found() {
        let service = service();
        let err = service.get_status(SessionId::new()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::NotFound(_)));
    }
}
