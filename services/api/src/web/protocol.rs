//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the evaluation UI and the API
//! server.

use chrono::{DateTime, Utc};
use evaluation_core::domain::{EvaluationSession, SessionStatus};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Payloads Sent FROM the Client TO the Server
//=========================================================================================

/// Starts an attempt. The user is taken from the `x-user-id` header.
#[derive(Deserialize, Debug, ToSchema)]
pub struct CreateSessionRequest {
    pub evaluation_id: Uuid,
    pub skill: String,
    pub level: String,
    /// Questions chosen for this attempt, in presentation order.
    #[serde(default)]
    pub question_ids: Vec<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct InvalidateSessionRequest {
    pub reason: String,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SeenQuestionsQuery {
    pub skill: String,
    pub level: String,
}

//=========================================================================================
// Payloads Sent FROM the Server TO the Client
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ValidateSessionResponse {
    /// `false` means the attempt must be abandoned and restarted.
    pub valid: bool,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct TabSwitchResponse {
    /// The new count, or -1 once the session has been terminated.
    pub tab_switches: i32,
    pub terminated: bool,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct SeenQuestionsResponse {
    pub question_ids: Vec<String>,
}

/// The stored session record as exposed over HTTP.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub evaluation_id: Uuid,
    pub skill: String,
    pub level: String,
    /// One of `active`, `completed`, `invalidated`.
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub is_active: bool,
    pub tab_switches: i32,
    pub question_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidated_at: Option<DateTime<Utc>>,
}

impl From<EvaluationSession> for SessionResponse {
    fn from(session: EvaluationSession) -> Self {
        let status = match session.status() {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Invalidated => "invalidated",
        };
        Self {
            session_id: session.session_id,
            user_id: session.user_id,
            evaluation_id: session.evaluation_id,
            skill: session.skill,
            level: session.level,
            status: status.to_string(),
            started_at: session.started_at,
            last_activity: session.last_activity,
            is_active: session.is_active,
            tab_switches: session.tab_switches,
            question_ids: session.question_ids,
            invalidation_reason: session.invalidation_reason.map(|r| r.to_string()),
            completed_at: session.completed_at,
            invalidated_at: session.invalidated_at,
        }
    }
}
