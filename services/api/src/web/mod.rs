pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use middleware::require_user_id;
pub use rest::{
    complete_session_handler, create_session_handler, get_session_handler, heartbeat_handler,
    invalidate_session_handler, seen_questions_handler, tab_switch_handler,
    validate_session_handler,
};
pub use state::AppState;

/// Builds the API router over the shared state.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Creating a session requires knowing who is taking the test.
    let create_routes = Router::new()
        .route("/evaluation-sessions", post(create_session_handler))
        .layer(axum_middleware::from_fn(require_user_id));

    let session_routes = Router::new()
        .route("/evaluation-sessions/{session_id}", get(get_session_handler))
        .route(
            "/evaluation-sessions/{session_id}/validate",
            post(validate_session_handler),
        )
        .route(
            "/evaluation-sessions/{session_id}/heartbeat",
            post(heartbeat_handler),
        )
        .route(
            "/evaluation-sessions/{session_id}/tab-switches",
            post(tab_switch_handler),
        )
        .route(
            "/evaluation-sessions/{session_id}/invalidate",
            post(invalidate_session_handler),
        )
        .route(
            "/evaluation-sessions/{session_id}/complete",
            post(complete_session_handler),
        )
        .route("/users/{user_id}/seen-questions", get(seen_questions_handler));

    Router::new()
        .merge(create_routes)
        .merge(session_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
