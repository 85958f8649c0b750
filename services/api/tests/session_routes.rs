use std::sync::Arc;

use api_lib::config::Config;
use api_lib::web::{self, AppState};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use evaluation_core::{EvaluationSession, InMemorySessionStore, SessionStore};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

fn setup_app() -> (Router, Arc<InMemorySessionStore>) {
    let config = Config::from_lookup(|_| None).expect("default config");
    let store = Arc::new(InMemorySessionStore::new());
    let state = Arc::new(AppState::new(store.clone(), &config));
    (web::router(state), store)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, body)
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn create(app: &Router, user_id: Uuid, skill: &str, questions: &[&str]) -> Uuid {
    let mut req = post_json(
        "/evaluation-sessions",
        json!({
            "evaluation_id": Uuid::new_v4(),
            "skill": skill,
            "level": "intermediate",
            "question_ids": questions,
        }),
    );
    req.headers_mut()
        .insert("x-user-id", user_id.to_string().parse().unwrap());
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["session_id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn create_requires_a_valid_user_header() {
    let (app, store) = setup_app();
    let payload = json!({
        "evaluation_id": Uuid::new_v4(),
        "skill": "sql",
        "level": "basic",
        "question_ids": ["q1"],
    });

    let (status, _) = send(&app, post_json("/evaluation-sessions", payload.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut req = post_json("/evaluation-sessions", payload);
    req.headers_mut()
        .insert("x-user-id", "not-a-uuid".parse().unwrap());
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(store.is_empty().await);
}

#[tokio::test]
async fn create_rejects_blank_skill() {
    let (app, _) = setup_app();
    let mut req = post_json(
        "/evaluation-sessions",
        json!({ "evaluation_id": Uuid::new_v4(), "skill": "  ", "level": "basic" }),
    );
    req.headers_mut()
        .insert("x-user-id", Uuid::new_v4().to_string().parse().unwrap());
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_lifecycle_over_http() {
    let (app, _) = setup_app();
    let user = Uuid::new_v4();
    let id = create(&app, user, "sql", &["q1", "q2"]).await;

    let (status, body) = send(&app, get(&format!("/evaluation-sessions/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
    assert_eq!(body["tab_switches"], 0);
    assert_eq!(body["question_ids"], json!(["q1", "q2"]));
    assert!(body.get("invalidation_reason").is_none());

    let (_, body) = send(&app, post(&format!("/evaluation-sessions/{id}/validate"))).await;
    assert_eq!(body["valid"], true);

    let (status, _) = send(&app, post(&format!("/evaluation-sessions/{id}/heartbeat"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, post(&format!("/evaluation-sessions/{id}/complete"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, get(&format!("/evaluation-sessions/{id}"))).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["is_active"], false);
    assert!(body["completed_at"].is_string());
    assert!(body.get("invalidation_reason").is_none());

    let (_, body) = send(&app, post(&format!("/evaluation-sessions/{id}/validate"))).await;
    assert_eq!(body["valid"], false);
}

#[tokio::test]
async fn third_tab_switch_terminates_the_attempt() {
    let (app, _) = setup_app();
    let id = create(&app, Uuid::new_v4(), "css", &["q1"]).await;
    let uri = format!("/evaluation-sessions/{id}/tab-switches");

    let (_, body) = send(&app, post(&uri)).await;
    assert_eq!(body, json!({ "tab_switches": 1, "terminated": false }));
    let (_, body) = send(&app, post(&uri)).await;
    assert_eq!(body, json!({ "tab_switches": 2, "terminated": false }));
    let (_, body) = send(&app, post(&uri)).await;
    assert_eq!(body, json!({ "tab_switches": -1, "terminated": true }));

    let (_, body) = send(&app, get(&format!("/evaluation-sessions/{id}"))).await;
    assert_eq!(body["status"], "invalidated");
    assert_eq!(body["invalidation_reason"], "too_many_tab_switches");
}

#[tokio::test]
async fn expired_session_fails_validation_with_timeout() {
    let (app, store) = setup_app();
    let old = EvaluationSession::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        "go",
        "senior",
        vec![],
        Utc::now() - Duration::hours(3),
    );
    store.insert_session(&old).await.unwrap();

    let id = old.session_id;
    let (_, body) = send(&app, post(&format!("/evaluation-sessions/{id}/validate"))).await;
    assert_eq!(body["valid"], false);

    let (_, body) = send(&app, get(&format!("/evaluation-sessions/{id}"))).await;
    assert_eq!(body["invalidation_reason"], "timeout");
}

#[tokio::test]
async fn caller_invalidation_records_reason() {
    let (app, _) = setup_app();
    let id = create(&app, Uuid::new_v4(), "java", &[]).await;
    let uri = format!("/evaluation-sessions/{id}/invalidate");

    let (status, _) = send(&app, post_json(&uri, json!({ "reason": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post_json(&uri, json!({ "reason": "devtools_opened" }))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, get(&format!("/evaluation-sessions/{id}"))).await;
    assert_eq!(body["invalidation_reason"], "devtools_opened");
    assert!(body.get("completed_at").is_none());
}

#[tokio::test]
async fn unknown_session_reads_as_missing_or_invalid() {
    let (app, _) = setup_app();
    let id = Uuid::new_v4();

    let (status, _) = send(&app, get(&format!("/evaluation-sessions/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, post(&format!("/evaluation-sessions/{id}/validate"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);

    let (status, _) = send(&app, post(&format!("/evaluation-sessions/{id}/heartbeat"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn seen_questions_are_merged_per_skill_and_level() {
    let (app, _) = setup_app();
    let user = Uuid::new_v4();
    create(&app, user, "rust", &["a", "b", "c"]).await;
    create(&app, user, "rust", &["b", "c", "d"]).await;
    create(&app, user, "python", &["e"]).await;
    create(&app, Uuid::new_v4(), "rust", &["f"]).await;

    let (status, body) = send(
        &app,
        get(&format!(
            "/users/{user}/seen-questions?skill=rust&level=intermediate"
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["question_ids"], json!(["a", "b", "c", "d"]));

    let (_, body) = send(
        &app,
        get(&format!("/users/{user}/seen-questions?skill=rust&level=expert")),
    )
    .await;
    assert_eq!(body["question_ids"], json!([]));
}
