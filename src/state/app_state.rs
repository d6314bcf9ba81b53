//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
    engine::{Collaborators, TimerEngine},
    services::{SessionStore, SettingsStore, TaskStore},
    utils::{time::format_uptime, Clock},
};

/// Shared state handed to every HTTP handler and background task
pub struct AppState {
    /// The timer engine and the stores it writes to
    pub engine: Arc<TimerEngine>,
    pub settings: Arc<SettingsStore>,
    pub tasks: Arc<TaskStore>,
    pub sessions: Arc<SessionStore>,
    pub clock: Arc<dyn Clock>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppState {
    /// Build the application state around an engine and its collaborators
    pub fn new(engine: Arc<TimerEngine>, collab: &Collaborators, port: u16, host: String) -> Self {
        Self {
            engine,
            settings: Arc::clone(&collab.settings),
            tasks: Arc::clone(&collab.tasks),
            sessions: Arc::clone(&collab.sessions),
            clock: Arc::clone(&collab.clock),
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
        }
    }

    /// Load every store from storage, then restore the timer
    pub async fn load(&self) {
        let settings = self.settings.load().await;
        let tasks = self.tasks.load().await;
        let sessions = self.sessions.load().await;
        info!("Loaded settings (focus {}min), {} tasks, {} sessions",
              settings.focus_min, tasks, sessions);

        let timer = self.engine.restore_state().await;
        info!("Timer restored: {:?} {} with {}s left",
              timer.phase(), timer.current_type, timer.time_left);
    }

    /// Record the most recent command
    pub fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(self.clock.now());
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        format_uptime(self.start_time.elapsed().as_secs())
    }
}
