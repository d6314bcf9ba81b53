mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::Harness;
use pomodoro_timer::{api::create_router, state::AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn router(h: &Harness) -> Router {
    let state = AppState::new(Arc::clone(&h.engine), &h.collab, 20554, "127.0.0.1".to_string());
    create_router(Arc::new(state))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_version() {
    let h = Harness::new();
    let (status, body) = send(&router(&h), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn timer_commands_drive_the_engine() {
    let h = Harness::new();
    let app = router(&h);

    let (status, body) = send(&app, "POST", "/timer/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["remaining"], "25:00");
    assert_eq!(body["timer"]["currentType"], "focus");
    assert_eq!(body["timer"]["isRunning"], true);

    h.clock.advance_secs(90);
    let (_, body) = send(&app, "POST", "/timer/pause", None).await;
    assert_eq!(body["status"], "paused");
    assert_eq!(body["timer"]["timeLeft"], 1410);
    assert_eq!(body["remaining"], "23:30");

    let (_, body) = send(&app, "POST", "/timer/resume", None).await;
    assert_eq!(body["status"], "running");

    let (_, body) = send(&app, "POST", "/timer/reset", None).await;
    assert_eq!(body["status"], "idle");
    assert_eq!(body["timer"]["timeLeft"], 1500);
}

#[tokio::test]
async fn status_includes_selected_task_and_last_action() {
    let h = Harness::new();
    let app = router(&h);
    let task_id = h.add_task("Deep work").await;

    let (status, _) = send(&app, "POST", "/timer/task", Some(json!({ "taskId": task_id }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "idle");
    assert_eq!(body["currentTask"]["title"], "Deep work");
    assert_eq!(body["lastAction"], "select-task");
    assert_eq!(body["port"], 20554);
}

#[tokio::test]
async fn selecting_unknown_or_done_task_is_not_found() {
    let h = Harness::new();
    let app = router(&h);

    let (status, body) = send(&app, "POST", "/timer/task", Some(json!({ "taskId": "missing" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().starts_with("Task not found"));

    let task_id = h.add_task("Finished").await;
    let uri = format!("/tasks/{}", task_id);
    send(&app, "PATCH", &uri, Some(json!({ "done": true }))).await;
    let (status, _) = send(&app, "POST", "/timer/task", Some(json!({ "taskId": task_id }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Clearing the selection always works
    let (status, body) = send(&app, "POST", "/timer/task", Some(json!({ "taskId": null }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["currentTaskId"], Value::Null);
}

#[tokio::test]
async fn settings_patch_validates_and_persists() {
    let h = Harness::new();
    let app = router(&h);

    let (status, body) = send(&app, "GET", "/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["focusMin"], 25);
    assert_eq!(body["locale"], "pt-BR");

    let (status, body) = send(&app, "PATCH", "/settings", Some(json!({ "focusMin": 50, "theme": "dark" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["focusMin"], 50);
    assert_eq!(body["theme"], "dark");
    assert_eq!(body["shortBreakMin"], 5);

    let (status, body) = send(&app, "PATCH", "/settings", Some(json!({ "shortBreakMin": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("must be at least 1"));

    let (status, body) = send(&app, "PATCH", "/settings", Some(json!({ "focusMin": 1_000_000_000_000u64 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "focusMin must be at most 1440");
    let (_, body) = send(&app, "GET", "/settings", None).await;
    assert_eq!(body["focusMin"], 50);

    let (status, body) = send(&app, "POST", "/settings/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["focusMin"], 25);
}

#[tokio::test]
async fn task_crud_round() {
    let h = Harness::new();
    let app = router(&h);

    let (status, created) = send(
        &app,
        "POST",
        "/tasks",
        Some(json!({ "title": "  Review PR  ", "tags": ["work", "work", " code "] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "Review PR");
    assert_eq!(created["priority"], "medium");
    assert_eq!(created["pomodoros"], 0);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "POST", "/tasks", Some(json!({ "title": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/tasks/{}", id);
    let (status, updated) = send(&app, "PATCH", &uri, Some(json!({ "priority": "high" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["priority"], "high");

    let (_, found) = send(&app, "GET", "/tasks?q=review", None).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    let (_, found) = send(&app, "GET", "/tasks?q=nothing", None).await;
    assert!(found.as_array().unwrap().is_empty());

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn completed_sessions_show_in_history() {
    let h = Harness::new();
    let app = router(&h);

    h.finish_current().await;
    h.finish_current().await;

    let (status, sessions) = send(&app, "GET", "/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    let sessions = sessions.as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    // Newest first
    assert_eq!(sessions[0]["type"], "shortBreak");
    assert_eq!(sessions[1]["type"], "focus");

    let (_, focus_only) = send(&app, "GET", "/sessions?type=focus", None).await;
    assert_eq!(focus_only.as_array().unwrap().len(), 1);

    let (status, summary) = send(&app, "GET", "/sessions/summary?filter=all", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["sessions"], 2);
    assert_eq!(summary["focusSessions"], 1);
    assert_eq!(summary["totalFocusSec"], 1500);
}

#[tokio::test]
async fn app_resume_recovers_running_timer() {
    let h = Harness::new();
    let app = router(&h);

    send(&app, "POST", "/timer/start", None).await;
    h.clock.advance_secs(2000);

    let (status, body) = send(&app, "POST", "/app/resume", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "idle");
    assert_eq!(body["timer"]["currentType"], "shortBreak");
    assert_eq!(h.collab.sessions.all().await.len(), 1);
}
