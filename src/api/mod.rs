//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timer/start", post(timer_start_handler))
        .route("/timer/pause", post(timer_pause_handler))
        .route("/timer/resume", post(timer_resume_handler))
        .route("/timer/reset", post(timer_reset_handler))
        .route("/timer/task", post(timer_task_handler))
        .route("/app/resume", post(app_resume_handler))
        .route("/settings", get(get_settings_handler).patch(update_settings_handler))
        .route("/settings/reset", post(reset_settings_handler))
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route("/tasks/:id", patch(update_task_handler).delete(delete_task_handler))
        .route("/sessions", get(list_sessions_handler))
        .route("/sessions/summary", get(sessions_summary_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
