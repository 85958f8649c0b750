//! crates/evaluation_core/src/memory.rs
//!
//! An in-process implementation of the `SessionStore` port. Used by tests and
//! for running the service without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{EvaluationSession, InvalidationReason};
use crate::ports::{PortError, PortResult, SessionStore};

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, EvaluationSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

fn not_found(session_id: Uuid) -> PortError {
    PortError::NotFound(format!("Session {} not found", session_id))
}

fn active_mut(
    sessions: &mut HashMap<Uuid, EvaluationSession>,
    session_id: Uuid,
) -> PortResult<&mut EvaluationSession> {
    let session = sessions.get_mut(&session_id).ok_or_else(|| not_found(session_id))?;
    if !session.is_active {
        return Err(PortError::Inactive(session_id.to_string()));
    }
    Ok(session)
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert_session(&self, session: &EvaluationSession) -> PortResult<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.session_id) {
            return Err(PortError::Unexpected(format!(
                "Session {} already exists",
                session.session_id
            )));
        }
        sessions.insert(session.session_id, session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<EvaluationSession> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or_else(|| not_found(session_id))
    }

    async fn touch_session(&self, session_id: Uuid, at: DateTime<Utc>) -> PortResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = active_mut(&mut sessions, session_id)?;
        session.last_activity = at;
        Ok(())
    }

    async fn increment_tab_switches(
        &self,
        session_id: Uuid,
        at: DateTime<Utc>,
    ) -> PortResult<i32> {
        // Check, read and write happen under one write guard.
        let mut sessions = self.sessions.write().await;
        let session = active_mut(&mut sessions, session_id)?;
        session.tab_switches += 1;
        session.last_activity = at;
        Ok(session.tab_switches)
    }

    async fn mark_invalidated(
        &self,
        session_id: Uuid,
        reason: &InvalidationReason,
        at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&session_id).ok_or_else(|| not_found(session_id))?;
        if session.completed_at.is_some() {
            return Ok(());
        }
        session.is_active = false;
        session.invalidation_reason = Some(reason.clone());
        session.invalidated_at = Some(at);
        Ok(())
    }

    async fn mark_completed(&self, session_id: Uuid, at: DateTime<Utc>) -> PortResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&session_id).ok_or_else(|| not_found(session_id))?;
        if session.completed_at.is_some() || session.invalidated_at.is_some() {
            return Ok(());
        }
        session.is_active = false;
        session.completed_at = Some(at);
        Ok(())
    }

    async fn find_sessions(
        &self,
        user_id: Uuid,
        skill: &str,
        level: &str,
    ) -> PortResult<Vec<EvaluationSession>> {
        let sessions = self.sessions.read().await;
        let mut matching: Vec<EvaluationSession> = sessions
            .values()
            .filter(|s| s.user_id == user_id && s.skill == skill && s.level == level)
            .cloned()
            .collect();
        matching.sort_by_key(|s| s.started_at);
        Ok(matching)
    }
}
