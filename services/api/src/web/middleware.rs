//! services/api/src/web/middleware.rs
//!
//! Request middleware for the evaluation routes.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The test-taker identified by the `x-user-id` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub Uuid);

/// Middleware that reads the `x-user-id` header and exposes it to handlers.
///
/// A missing or malformed header is rejected with 400 Bad Request.
pub async fn require_user_id(mut req: Request, next: Next) -> Result<Response, (StatusCode, String)> {
    let raw = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("{} header is required", USER_ID_HEADER),
            )
        })?;

    let user_id = Uuid::parse_str(raw.trim()).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid {} format", USER_ID_HEADER),
        )
    })?;

    req.extensions_mut().insert(UserId(user_id));
    Ok(next.run(req).await)
}
