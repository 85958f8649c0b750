//! crates/evaluation_core/src/session.rs
//!
//! Lifecycle and anti-cheating rules for evaluation sessions.
//!
//! A session is `Active` from creation until it is either completed or
//! invalidated. The time limit is enforced lazily: nothing runs in the
//! background, `validate_session` compares the wall clock against
//! `started_at` each time it is called.

use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::{EvaluationSession, InvalidationReason, SessionPolicy};
use crate::ports::{PortError, PortResult, SessionStore};

/// Returned by `record_tab_switch` when the session must be abandoned.
pub const TAB_SWITCH_VIOLATION: i32 = -1;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session record could not be written.
    #[error("Failed to persist session: {0}")]
    Persistence(#[from] PortError),
}

/// Owns creation, validation, activity tracking, tab-switch counting,
/// invalidation and completion of evaluation sessions.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    policy: SessionPolicy,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self::with_policy(store, SessionPolicy::default())
    }

    pub fn with_policy(store: Arc<dyn SessionStore>, policy: SessionPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Starts a new attempt and returns its identifier.
    ///
    /// The session does not exist until this returns `Ok`.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        evaluation_id: Uuid,
        skill: &str,
        level: &str,
        question_ids: Vec<String>,
    ) -> Result<Uuid, SessionError> {
        let session =
            EvaluationSession::new(user_id, evaluation_id, skill, level, question_ids, Utc::now());
        self.store.insert_session(&session).await.map_err(|e| {
            error!("Failed to create session for user {}: {:?}", user_id, e);
            SessionError::Persistence(e)
        })?;
        info!(
            session_id = %session.session_id,
            %user_id,
            skill,
            level,
            questions = session.question_ids.len(),
            "Evaluation session created"
        );
        Ok(session.session_id)
    }

    /// The checkpoint to call before honoring any user action.
    ///
    /// Returns `false` for a missing session, a terminal session, an expired
    /// session (which is invalidated with `timeout` on the way out), or when
    /// the store cannot be reached.
    pub async fn validate_session(&self, session_id: Uuid) -> bool {
        match self.try_validate(session_id).await {
            Ok(valid) => valid,
            Err(PortError::NotFound(_)) => {
                debug!(%session_id, "Validation of unknown session");
                false
            }
            Err(e) => {
                error!("Failed to validate session {}: {:?}", session_id, e);
                false
            }
        }
    }

    async fn try_validate(&self, session_id: Uuid) -> PortResult<bool> {
        let session = self.store.get_session(session_id).await?;
        if !session.is_active {
            return Ok(false);
        }

        let now = Utc::now();
        if session.elapsed(now) > self.policy.time_limit {
            warn!(%session_id, "Session exceeded its time limit");
            self.invalidate_session(session_id, InvalidationReason::Timeout).await;
            return Ok(false);
        }

        // The store re-checks `is_active` while writing, so a session that
        // ended after the read above is still rejected.
        match self.store.touch_session(session_id, now).await {
            Ok(()) => Ok(true),
            Err(PortError::Inactive(_)) => {
                debug!(%session_id, "Session ended during validation");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Best-effort heartbeat. Unknown or terminal sessions and store failures
    /// are ignored.
    pub async fn update_activity(&self, session_id: Uuid) {
        match self.store.touch_session(session_id, Utc::now()).await {
            Ok(()) => {}
            Err(PortError::NotFound(_)) => {
                debug!(%session_id, "Heartbeat for unknown session");
            }
            Err(PortError::Inactive(_)) => {
                debug!(%session_id, "Heartbeat for terminal session");
            }
            Err(e) => error!("Failed to update activity for {}: {:?}", session_id, e),
        }
    }

    /// Counts one focus-loss event.
    ///
    /// Returns the new count while within limits, or `TAB_SWITCH_VIOLATION`
    /// once the count reaches the policy threshold (the session is invalidated
    /// with `too_many_tab_switches`). A missing or already terminal session
    /// also yields `TAB_SWITCH_VIOLATION`. If the store cannot be reached the
    /// event has no effect and `0` is returned.
    pub async fn record_tab_switch(&self, session_id: Uuid) -> i32 {
        match self.store.get_session(session_id).await {
            Ok(session) if !session.is_active => return TAB_SWITCH_VIOLATION,
            Ok(_) => {}
            Err(PortError::NotFound(_)) => return TAB_SWITCH_VIOLATION,
            Err(e) => {
                error!("Failed to load session {} for tab switch: {:?}", session_id, e);
                return 0;
            }
        }

        let count = match self.store.increment_tab_switches(session_id, Utc::now()).await {
            Ok(count) => count,
            Err(PortError::NotFound(_)) | Err(PortError::Inactive(_)) => {
                return TAB_SWITCH_VIOLATION
            }
            Err(e) => {
                error!("Failed to record tab switch for {}: {:?}", session_id, e);
                return 0;
            }
        };

        if count >= self.policy.max_tab_switches {
            warn!(%session_id, count, "Anti-cheat: tab switch limit reached");
            self.invalidate_session(session_id, InvalidationReason::TooManyTabSwitches)
                .await;
            return TAB_SWITCH_VIOLATION;
        }

        info!(%session_id, count, "Anti-cheat: tab switch recorded");
        count
    }

    /// Terminates the session for a policy violation or any caller-detected abort.
    /// Repeated calls overwrite the reason and timestamp.
    pub async fn invalidate_session(&self, session_id: Uuid, reason: InvalidationReason) {
        match self
            .store
            .mark_invalidated(session_id, &reason, Utc::now())
            .await
        {
            Ok(()) => info!(%session_id, %reason, "Evaluation session invalidated"),
            Err(e) => error!("Failed to invalidate session {}: {:?}", session_id, e),
        }
    }

    /// Returns the stored record, or `None` if it is missing or unreadable.
    pub async fn get_session(&self, session_id: Uuid) -> Option<EvaluationSession> {
        match self.store.get_session(session_id).await {
            Ok(session) => Some(session),
            Err(PortError::NotFound(_)) => None,
            Err(e) => {
                error!("Failed to load session {}: {:?}", session_id, e);
                None
            }
        }
    }

    /// The deduplicated union of question ids the user was shown across every
    /// past session for this skill and level.
    pub async fn get_user_seen_questions(
        &self,
        user_id: Uuid,
        skill: &str,
        level: &str,
    ) -> BTreeSet<String> {
        match self.store.find_sessions(user_id, skill, level).await {
            Ok(sessions) => sessions
                .into_iter()
                .flat_map(|s| s.question_ids)
                .collect(),
            Err(e) => {
                error!(
                    "Failed to load seen questions for user {} ({}/{}): {:?}",
                    user_id, skill, level, e
                );
                BTreeSet::new()
            }
        }
    }

    /// The normal terminal transition. The first completion timestamp wins and
    /// an invalidated session stays invalidated.
    pub async fn complete_session(&self, session_id: Uuid) {
        match self.store.mark_completed(session_id, Utc::now()).await {
            Ok(()) => info!(%session_id, "Evaluation session completed"),
            Err(e) => error!("Failed to complete session {}: {:?}", session_id, e),
        }
    }
}
