//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::{
    services::{HistoryFilter, HistorySummary, TASK_NOT_FOUND},
    state::{AppState, NewTask, Session, SessionType, Settings, SettingsPatch, Task, TaskPatch},
};
use super::responses::{ErrorResponse, HealthResponse, StatusResponse, TimerResponse};

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

/// Map a task store error onto an HTTP status
fn task_error(e: String) -> ApiError {
    if e.starts_with(TASK_NOT_FOUND) {
        warn!("{}", e);
        api_error(StatusCode::NOT_FOUND, e)
    } else if e.contains("required") {
        warn!("Rejected task: {}", e);
        api_error(StatusCode::BAD_REQUEST, e)
    } else {
        error!("Task store failure: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e)
    }
}

/// Handle POST /timer/start - Start the current session
pub async fn timer_start_handler(State(state): State<Arc<AppState>>) -> Json<TimerResponse> {
    let timer = state.engine.start().await;
    state.record_action("start");
    info!("Start endpoint called");
    Json(TimerResponse::new("Timer started", timer))
}

/// Handle POST /timer/pause - Pause the running session
pub async fn timer_pause_handler(State(state): State<Arc<AppState>>) -> Json<TimerResponse> {
    let timer = state.engine.pause().await;
    state.record_action("pause");
    info!("Pause endpoint called");
    Json(TimerResponse::new("Timer paused", timer))
}

/// Handle POST /timer/resume - Resume a paused session
pub async fn timer_resume_handler(State(state): State<Arc<AppState>>) -> Json<TimerResponse> {
    let timer = state.engine.resume().await;
    state.record_action("resume");
    info!("Resume endpoint called");
    Json(TimerResponse::new("Timer resumed", timer))
}

/// Handle POST /timer/reset - Reset the current session
pub async fn timer_reset_handler(State(state): State<Arc<AppState>>) -> Json<TimerResponse> {
    let timer = state.engine.reset().await;
    state.record_action("reset");
    info!("Reset endpoint called");
    Json(TimerResponse::new("Timer reset", timer))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTaskRequest {
    #[serde(default)]
    pub task_id: Option<String>,
}

/// Handle POST /timer/task - Select the task focus time is credited to
pub async fn timer_task_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetTaskRequest>,
) -> ApiResult<TimerResponse> {
    // Only open tasks can be selected
    if let Some(task_id) = request.task_id.as_deref() {
        if state.tasks.get_active_task(task_id).await.is_none() {
            return Err(api_error(
                StatusCode::NOT_FOUND,
                format!("{}: {}", TASK_NOT_FOUND, task_id),
            ));
        }
    }

    let timer = state.engine.set_current_task(request.task_id).await;
    state.record_action("select-task");
    Ok(Json(TimerResponse::new("Current task updated", timer)))
}

/// Handle POST /app/resume - The host application returned to the foreground
pub async fn app_resume_handler(State(state): State<Arc<AppState>>) -> Json<TimerResponse> {
    let timer = state.engine.on_resume().await;
    state.record_action("app-resume");
    Json(TimerResponse::new("Timer state recovered", timer))
}

/// Handle GET /status - Return current timer and server status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let timer = state.engine.state();
    let current_task = match timer.current_task_id.as_deref() {
        Some(id) => state.tasks.get(id).await,
        None => None,
    };
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        status: timer.phase(),
        remaining: crate::utils::time::format_time(timer.time_left),
        timer,
        current_task,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Handle GET /settings
pub async fn get_settings_handler(State(state): State<Arc<AppState>>) -> Json<Settings> {
    Json(state.settings.get().await)
}

/// Handle PATCH /settings - Merge a partial settings update
pub async fn update_settings_handler(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<SettingsPatch>,
) -> ApiResult<Settings> {
    match state.settings.update(patch).await {
        Ok(settings) => {
            state.record_action("update-settings");
            Ok(Json(settings))
        }
        Err(e) if e.contains("must be") => {
            warn!("Rejected settings update: {}", e);
            Err(api_error(StatusCode::BAD_REQUEST, e))
        }
        Err(e) => {
            error!("Failed to update settings: {}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e))
        }
    }
}

/// Handle POST /settings/reset - Restore default settings
pub async fn reset_settings_handler(State(state): State<Arc<AppState>>) -> ApiResult<Settings> {
    match state.settings.reset().await {
        Ok(settings) => {
            state.record_action("reset-settings");
            Ok(Json(settings))
        }
        Err(e) => {
            error!("Failed to reset settings: {}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub q: Option<String>,
}

/// Handle GET /tasks - List tasks, optionally filtered by `q`
pub async fn list_tasks_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TaskQuery>,
) -> Json<Vec<Task>> {
    match query.q.as_deref() {
        Some(q) => Json(state.tasks.search(q).await),
        None => Json(state.tasks.list().await),
    }
}

/// Handle POST /tasks - Create a task
pub async fn create_task_handler(
    State(state): State<Arc<AppState>>,
    Json(new_task): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state.tasks.add(new_task).await.map_err(task_error)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Handle PATCH /tasks/:id - Update a task
pub async fn update_task_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> ApiResult<Task> {
    state.tasks.update(&id, patch).await.map(Json).map_err(task_error)
}

/// Handle DELETE /tasks/:id - Delete a task
pub async fn delete_task_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.tasks.delete(&id).await.map_err(task_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    #[serde(default)]
    pub filter: Option<HistoryFilter>,
    #[serde(default, rename = "type")]
    pub session_type: Option<SessionType>,
}

/// Handle GET /sessions - Session history, newest first
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Json<Vec<Session>> {
    let filter = query.filter.unwrap_or(HistoryFilter::All);
    let mut sessions: Vec<Session> = state
        .sessions
        .filter(filter, state.clock.now())
        .await
        .into_iter()
        .filter(|s| query.session_type.map_or(true, |t| s.session_type == t))
        .collect();
    sessions.reverse();
    Json(sessions)
}

/// Handle GET /sessions/summary - Focus totals for a history window
pub async fn sessions_summary_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Json<HistorySummary> {
    let filter = query.filter.unwrap_or_default();
    Json(state.sessions.summary(filter, state.clock.now()).await)
}
