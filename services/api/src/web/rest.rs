//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the evaluation session endpoints and the
//! master definition for the OpenAPI specification.

use crate::web::middleware::UserId;
use crate::web::protocol::{
    CreateSessionRequest, CreateSessionResponse, InvalidateSessionRequest, SeenQuestionsQuery,
    SeenQuestionsResponse, SessionResponse, TabSwitchResponse, ValidateSessionResponse,
};
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use evaluation_core::domain::InvalidationReason;
use evaluation_core::session::TAB_SWITCH_VIOLATION;
use std::sync::Arc;
use tracing::error;
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_session_handler,
        get_session_handler,
        validate_session_handler,
        heartbeat_handler,
        tab_switch_handler,
        invalidate_session_handler,
        complete_session_handler,
        seen_questions_handler,
    ),
    components(
        schemas(
            CreateSessionRequest,
            CreateSessionResponse,
            InvalidateSessionRequest,
            SessionResponse,
            ValidateSessionResponse,
            TabSwitchResponse,
            SeenQuestionsResponse,
        )
    ),
    tags(
        (name = "Evaluation Sessions API", description = "Lifecycle and anti-cheating checks for evaluation attempts.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Start a new evaluation attempt.
#[utoipa::path(
    post,
    path = "/evaluation-sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created successfully", body = CreateSessionResponse),
        (status = 400, description = "Bad request (e.g., missing header or empty skill)"),
        (status = 500, description = "The session could not be persisted")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the test-taker.")
    )
)]
pub async fn create_session_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let skill = req.skill.trim();
    let level = req.level.trim();
    if skill.is_empty() || level.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "skill and level must not be empty".to_string(),
        ));
    }

    let session_id = app_state
        .sessions
        .create_session(user_id, req.evaluation_id, skill, level, req.question_ids)
        .await
        .map_err(|e| {
            error!("Failed to create session: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create session".to_string(),
            )
        })?;

    Ok((StatusCode::CREATED, Json(CreateSessionResponse { session_id })))
}

/// Fetch a stored session record.
#[utoipa::path(
    get,
    path = "/evaluation-sessions/{session_id}",
    responses(
        (status = 200, description = "The session record", body = SessionResponse),
        (status = 404, description = "No such session")
    ),
    params(("session_id" = Uuid, Path, description = "The session identifier."))
)]
pub async fn get_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, (StatusCode, String)> {
    app_state
        .sessions
        .get_session(session_id)
        .await
        .map(|session| Json(SessionResponse::from(session)))
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Session not found".to_string()))
}

/// Check that the session may still be used, enforcing the time limit.
#[utoipa::path(
    post,
    path = "/evaluation-sessions/{session_id}/validate",
    responses(
        (status = 200, description = "Whether the session is still usable", body = ValidateSessionResponse)
    ),
    params(("session_id" = Uuid, Path, description = "The session identifier."))
)]
pub async fn validate_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Json<ValidateSessionResponse> {
    let valid = app_state.sessions.validate_session(session_id).await;
    Json(ValidateSessionResponse { valid })
}

/// Refresh the session's last activity timestamp.
#[utoipa::path(
    post,
    path = "/evaluation-sessions/{session_id}/heartbeat",
    responses((status = 204, description = "Heartbeat accepted")),
    params(("session_id" = Uuid, Path, description = "The session identifier."))
)]
pub async fn heartbeat_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> StatusCode {
    app_state.sessions.update_activity(session_id).await;
    StatusCode::NO_CONTENT
}

/// Record a loss of focus on the evaluation page.
#[utoipa::path(
    post,
    path = "/evaluation-sessions/{session_id}/tab-switches",
    responses(
        (status = 200, description = "The new count, or -1 when the attempt was terminated", body = TabSwitchResponse)
    ),
    params(("session_id" = Uuid, Path, description = "The session identifier."))
)]
pub async fn tab_switch_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Json<TabSwitchResponse> {
    let tab_switches = app_state.sessions.record_tab_switch(session_id).await;
    Json(TabSwitchResponse {
        tab_switches,
        terminated: tab_switches == TAB_SWITCH_VIOLATION,
    })
}

/// Abort the attempt for a caller-detected reason.
#[utoipa::path(
    post,
    path = "/evaluation-sessions/{session_id}/invalidate",
    request_body = InvalidateSessionRequest,
    responses(
        (status = 204, description = "Session invalidated"),
        (status = 400, description = "Empty reason")
    ),
    params(("session_id" = Uuid, Path, description = "The session identifier."))
)]
pub async fn invalidate_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<InvalidateSessionRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let reason = req.reason.trim();
    if reason.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "reason must not be empty".to_string()));
    }
    app_state
        .sessions
        .invalidate_session(session_id, InvalidationReason::from(reason))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

/// Finish the attempt normally.
#[utoipa::path(
    post,
    path = "/evaluation-sessions/{session_id}/complete",
    responses((status = 204, description = "Session completed")),
    params(("session_id" = Uuid, Path, description = "The session identifier."))
)]
pub async fn complete_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> StatusCode {
    app_state.sessions.complete_session(session_id).await;
    StatusCode::NO_CONTENT
}

/// List every question the user has already been shown for a skill and level.
#[utoipa::path(
    get,
    path = "/users/{user_id}/seen-questions",
    responses(
        (status = 200, description = "Sorted, deduplicated question ids", body = SeenQuestionsResponse)
    ),
    params(
        ("user_id" = Uuid, Path, description = "The unique ID of the test-taker."),
        SeenQuestionsQuery
    )
)]
pub async fn seen_questions_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<SeenQuestionsQuery>,
) -> Json<SeenQuestionsResponse> {
    let seen = app_state
        .sessions
        .get_user_seen_questions(user_id, query.skill.trim(), query.level.trim())
        .await;
    Json(SeenQuestionsResponse {
        question_ids: seen.into_iter().collect(),
    })
}
