//! crates/evaluation_core/src/ports.rs
//!
//! Defines the storage contract for evaluation sessions.
//! The trait forms the boundary of the hexagonal architecture, allowing the
//! session logic to stay independent of the concrete database behind it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{EvaluationSession, InvalidationReason};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The record exists but is already completed or invalidated.
    #[error("Session is no longer active: {0}")]
    Inactive(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Point reads, point updates and a filtered scan over one table of session records.
///
/// Implementations must never flip `is_active` back to `true`, and must leave a
/// record untouched when a terminal write targets a session already in the
/// other terminal state.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: &EvaluationSession) -> PortResult<()>;

    /// Returns `PortError::NotFound` when no record exists.
    async fn get_session(&self, session_id: Uuid) -> PortResult<EvaluationSession>;

    /// Refreshes `last_activity` of an active session. Returns
    /// `PortError::Inactive` for a terminal one, leaving it untouched.
    async fn touch_session(&self, session_id: Uuid, at: DateTime<Utc>) -> PortResult<()>;

    /// Atomically increments `tab_switches`, refreshes `last_activity`, and
    /// returns the new count. The active check happens in the same write;
    /// a terminal session yields `PortError::Inactive` and is not counted.
    async fn increment_tab_switches(&self, session_id: Uuid, at: DateTime<Utc>)
        -> PortResult<i32>;

    /// Marks the session invalidated. Overwrites the reason and timestamp of an
    /// already-invalidated session; ignores a completed one.
    async fn mark_invalidated(
        &self,
        session_id: Uuid,
        reason: &InvalidationReason,
        at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Marks an active session completed. Terminal sessions are left as they are.
    async fn mark_completed(&self, session_id: Uuid, at: DateTime<Utc>) -> PortResult<()>;

    async fn find_sessions(
        &self,
        user_id: Uuid,
        skill: &str,
        level: &str,
    ) -> PortResult<Vec<EvaluationSession>>;
}
