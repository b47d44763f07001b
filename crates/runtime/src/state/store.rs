//! Persistent session store backed by SQLite.
//!
//! One row per session: indexed columns for listing plus the full state as
//! a JSON blob. Every save is a single atomic upsert, which makes the store
//! the durability boundary: a crash between node commits always leaves a
//! resumable state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;

use super::WorkflowState;
use crate::types::{SessionId, StoreError, WorkflowStatus};

/// Summary row returned by `list`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One page of session summaries.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionPage {
    pub sessions: Vec<SessionSummary>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// Abstract session store.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Persist the full state (insert or update, atomic).
    async fn save(&self, state: &WorkflowState) -> Result<(), StoreError>;

    /// Load the state for a session.
    async fn load(&self, session_id: SessionId) -> Result<WorkflowState, StoreError>;

    /// List sessions, newest first.
    async fn list(&self, limit: u64, offset: u64) -> Result<SessionPage, StoreError>;

    /// Delete a session.
    async fn delete(&self, session_id: SessionId) -> Result<(), StoreError>;
}

/// SQLite-backed store.
pub struct SqliteStateStore {
    conn: tokio::sync::Mutex<rusqlite::Connection>,
}

impl SqliteStateStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &std::path::Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Sqlite(format!("create dir: {e}")))?;
        }
        let conn =
            rusqlite::Connection::open(path).map_err(|e| StoreError::Sqlite(e.to_string()))?;

        // WAL mode for concurrent readers.
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| StoreError::Sqlite(e.to_string()))?;

        Self::init_schema(&conn)?;

        Ok(Self {
            conn: tokio::sync::Mutex::new(conn),
        })
    }

    /// Open an in-memory store (useful for tests and demos).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| StoreError::Sqlite(e.to_string()))?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: tokio::sync::Mutex::new(conn),
        })
    }

    /// Default database path: `$XDG_DATA_HOME/quorum/sessions.db`
    pub fn default_path() -> std::path::PathBuf {
        let base = dirs::data_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        base.join("quorum").join("sessions.db")
    }

    fn init_schema(conn: &rusqlite::Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            INSERT OR IGNORE INTO schema_version (version) VALUES (1);

            CREATE TABLE IF NOT EXISTS sessions (
                session_id   TEXT PRIMARY KEY,
                name         TEXT,
                description  TEXT,
                status       TEXT NOT NULL,
                user_request TEXT NOT NULL,
                state_json   TEXT NOT NULL,
                created_at   TEXT NOT NULL,
                updated_at   TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_status ON sessions(status);
            CREATE INDEX IF NOT EXISTS idx_sessions_updated ON sessions(updated_at);",
        )
        .map_err(|e| StoreError::Sqlite(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn save(&self, state: &WorkflowState) -> Result<(), StoreError> {
        let state_json = serde_json::to_string(state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO sessions
                (session_id, name, description, status, user_request,
                 state_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                state.session_id.to_string(),
                state.name,
                state.description,
                state.status.as_str(),
                state.user_request,
                state_json,
                state.created_at.to_rfc3339(),
                state.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Sqlite(e.to_string()))?;
        Ok(())
    }

    async fn load(&self, session_id: SessionId) -> Result<WorkflowState, StoreError> {
        let conn = self.conn.lock().await;
        let state_json: Option<String> = conn
            .query_row(
                "SELECT state_json FROM sessions WHERE session_id = ?1",
                rusqlite::params![session_id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Sqlite(e.to_string()))?;

        let state_json = state_json.ok_or(StoreError::NotFound(session_id))?;
        serde_json::from_str(&state_json).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn list(&self, limit: u64, offset: u64) -> Result<SessionPage, StoreError> {
        let conn = self.conn.lock().await;

        let total: u64 = conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| {
                row.get::<_, i64>(0)
            })
            .map_err(|e| StoreError::Sqlite(e.to_string()))? as u64;

        let mut stmt = conn
            .prepare(
                "SELECT session_id, name, description, status, created_at, updated_at
                 FROM sessions
                 ORDER BY updated_at DESC
                 LIMIT ?1 OFFSET ?2",
            )
            .map_err(|e| StoreError::Sqlite(e.to_string()))?;

        let rows = stmt
            .query_map(
                rusqlite::params![limit as i64, offset as i64],
                row_to_summary,
            )
            .map_err(|e| StoreError::Sqlite(e.to_string()))?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row.map_err(|e| StoreError::Sqlite(e.to_string()))??);
        }

        Ok(SessionPage {
            sessions,
            total,
            limit,
            offset,
        })
    }

    async fn delete(&self, session_id: SessionId) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        let rows = conn
            .execute(
                "DELETE FROM sessions WHERE session_id = ?1",
                rusqlite::params![session_id.to_string()],
            )
            .map_err(|e| StoreError::Sqlite(e.to_string()))?;
        if rows == 0 {
            return Err(StoreError::NotFound(session_id));
        }
        Ok(())
    }
}

fn row_to_summary(
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<Result<SessionSummary, StoreError>> {
    let id_text: String = row.get(0)?;
    let name: Option<String> = row.get(1)?;
    let description: Option<String> = row.get(2)?;
    let status_text: String = row.get(3)?;
    let created_text: String = row.get(4)?;
    let updated_text: String = row.get(5)?;

    Ok((|| {
        let session_id = SessionId::parse(&id_text)
            .map_err(|e| StoreError::Serialization(format!("session_id: {e}")))?;
        let status: WorkflowStatus = serde_json::from_value(serde_json::Value::String(status_text))
            .map_err(|e| StoreError::Serialization(format!("status: {e}")))?;
        let created_at = DateTime::parse_from_rfc3339(&created_text)
            .map_err(|e| StoreError::Serialization(format!("created_at: {e}")))?
            .with_timezone(&Utc);
        let updated_at = DateTime::parse_from_rfc3339(&updated_text)
            .map_err(|e| StoreError::Serialization(format!("updated_at: {e}")))?
            .with_timezone(&Utc);
        Ok(SessionSummary {
            session_id,
            name,
            description,
            status,
            created_at,
            updated_at,
        })
    })())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample_state() -> WorkflowState {
        WorkflowState::new("Design a warehouse sync", BTreeMap::new(), 3)
    }

    #[tokio::test]
    async fn save_load_round_trip() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        let mut state = sample_state();
        state.record_warning("parser degraded");
        store.save(&state).await.unwrap();

        let loaded = store.load(state.session_id).await.unwrap();
        assert_eq!(loaded.session_id, state.session_id);
        assert_eq!(loaded.user_request, state.user_request);
        assert_eq!(loaded.warnings, state.warnings);
    }

    #[tokio::test]
    async fn save_is_an_upsert() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        let mut state = sample_state();
        store.save(&state).await.unwrap();

        state.status = WorkflowStatus::InProgress;
        state.record_error("node exploded");
        store.save(&state).await.unwrap();

        let loaded = store.load(state.session_id).await.unwrap();
        assert_eq!(loaded.status, WorkflowStatus::InProgress);
        assert_eq!(loaded.errors.len(), 1);

        let page = store.list(10, 0).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn load_unknown_session_is_not_found() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        let err = store.load(SessionId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_pages_newest_first() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        let mut ids = Vec::new();
        for i in 0..3i64 {
            let mut state = sample_state();
            state.name = Some(format!("session-{i}"));
            // Distinct timestamps so ordering is deterministic.
            state.updated_at = Utc::now() + chrono::Duration::seconds(i);
            store.save(&state).await.unwrap();
            ids.push(state.session_id);
        }

        let page = store.list(2, 0).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.sessions.len(), 2);
        assert_eq!(page.sessions[0].session_id, ids[2]);

        let page = store.list(2, 2).await.unwrap();
        assert_eq!(page.sessions.len(), 1);
        assert_eq!(page.sessions[0].session_id, ids[0]);
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        let state = sample_state();
        store.save(&state).await.unwrap();
        store.delete(state.session_id).await.unwrap();

        let err = store.delete(state.session_id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn opens_on_disk_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let store = SqliteStateStore::open(&path).unwrap();
        let state = sample_state();
        store.save(&state).await.unwrap();
        drop(store);

        // Reopen and read back.
        let store = SqliteStateStore::open(&path).unwrap();
        let loaded = store.load(state.session_id).await.unwrap();
        assert_eq!(loaded.session_id, state.session_id);
    }
}
