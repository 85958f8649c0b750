//! services/api/src/adapters/db.rs
//!
//! This module contains the PostgreSQL adapter, which is the concrete
//! implementation of the `SessionStore` port from the `core` crate. It handles
//! all interactions with the `evaluation_sessions` table using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use evaluation_core::domain::{EvaluationSession, InvalidationReason};
use evaluation_core::ports::{PortError, PortResult, SessionStore};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const SESSION_COLUMNS: &str = "session_id, user_id, evaluation_id, skill, level, started_at, \
     last_activity, is_active, tab_switches, question_ids, invalidation_reason, \
     completed_at, invalidated_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `SessionStore` port.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Creates a new `PgSessionStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Struct
//=========================================================================================

#[derive(FromRow)]
struct SessionRecord {
    session_id: Uuid,
    user_id: Uuid,
    evaluation_id: Uuid,
    skill: String,
    level: String,
    started_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    is_active: bool,
    tab_switches: i32,
    question_ids: Vec<String>,
    invalidation_reason: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    invalidated_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    fn to_domain(self) -> EvaluationSession {
        EvaluationSession {
            session_id: self.session_id,
            user_id: self.user_id,
            evaluation_id: self.evaluation_id,
            skill: self.skill,
            level: self.level,
            started_at: self.started_at,
            last_activity: self.last_activity,
            is_active: self.is_active,
            tab_switches: self.tab_switches,
            question_ids: self.question_ids,
            invalidation_reason: self.invalidation_reason.map(InvalidationReason::from),
            completed_at: self.completed_at,
            invalidated_at: self.invalidated_at,
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found(session_id: Uuid) -> PortError {
    PortError::NotFound(format!("Session {} not found", session_id))
}

/// Maps an UPDATE that touched zero rows to `NotFound` when the row is missing.
async fn ensure_exists(pool: &PgPool, session_id: Uuid) -> PortResult<()> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM evaluation_sessions WHERE session_id = $1)")
            .bind(session_id)
            .fetch_one(pool)
            .await
            .map_err(unexpected)?;
    if exists {
        Ok(())
    } else {
        Err(not_found(session_id))
    }
}

/// Explains an `AND is_active` UPDATE that touched zero rows.
async fn missing_or_inactive(pool: &PgPool, session_id: Uuid) -> PortError {
    match ensure_exists(pool, session_id).await {
        Ok(()) => PortError::Inactive(session_id.to_string()),
        Err(e) => e,
    }
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert_session(&self, session: &EvaluationSession) -> PortResult<()> {
        sqlx::query(
            r#"
            INSERT INTO evaluation_sessions (
                session_id, user_id, evaluation_id, skill, level, started_at,
                last_activity, is_active, tab_switches, question_ids
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(session.session_id)
        .bind(session.user_id)
        .bind(session.evaluation_id)
        .bind(&session.skill)
        .bind(&session.level)
        .bind(session.started_at)
        .bind(session.last_activity)
        .bind(session.is_active)
        .bind(session.tab_switches)
        .bind(&session.question_ids)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<EvaluationSession> {
        let record = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {} FROM evaluation_sessions WHERE session_id = $1",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => not_found(session_id),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn touch_session(&self, session_id: Uuid, at: DateTime<Utc>) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE evaluation_sessions SET last_activity = $1 \
             WHERE session_id = $2 AND is_active",
        )
        .bind(at)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(missing_or_inactive(&self.pool, session_id).await);
        }
        Ok(())
    }

    async fn increment_tab_switches(
        &self,
        session_id: Uuid,
        at: DateTime<Utc>,
    ) -> PortResult<i32> {
        // Single statement, so concurrent events for one session are all counted
        // and a session that has just ended is never counted.
        let count: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE evaluation_sessions
            SET tab_switches = tab_switches + 1,
                last_activity = $1
            WHERE session_id = $2
              AND is_active
            RETURNING tab_switches
            "#,
        )
        .bind(at)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        match count {
            Some(count) => Ok(count),
            None => Err(missing_or_inactive(&self.pool, session_id).await),
        }
    }

    async fn mark_invalidated(
        &self,
        session_id: Uuid,
        reason: &InvalidationReason,
        at: DateTime<Utc>,
    ) -> PortResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE evaluation_sessions
            SET is_active = FALSE,
                invalidation_reason = $1,
                invalidated_at = $2
            WHERE session_id = $3
              AND completed_at IS NULL
            "#,
        )
        .bind(reason.as_str())
        .bind(at)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            ensure_exists(&self.pool, session_id).await?;
        }
        Ok(())
    }

    async fn mark_completed(&self, session_id: Uuid, at: DateTime<Utc>) -> PortResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE evaluation_sessions
            SET is_active = FALSE,
                completed_at = $1
            WHERE session_id = $2
              AND completed_at IS NULL
              AND invalidated_at IS NULL
            "#,
        )
        .bind(at)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            ensure_exists(&self.pool, session_id).await?;
        }
        Ok(())
    }

    async fn find_sessions(
        &self,
        user_id: Uuid,
        skill: &str,
        level: &str,
    ) -> PortResult<Vec<EvaluationSession>> {
        let records = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {} FROM evaluation_sessions \
             WHERE user_id = $1 AND skill = $2 AND level = $3 \
             ORDER BY started_at ASC",
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .bind(skill)
        .bind(level)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let sessions = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(sessions)
    }
}
