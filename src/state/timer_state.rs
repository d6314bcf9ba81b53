//! Timer state structure and its persisted snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of session the timer is running or about to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionType {
    Focus,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Focus => "focus",
            SessionType::ShortBreak => "shortBreak",
            SessionType::LongBreak => "longBreak",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, SessionType::Focus)
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live timer state owned by the timer engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// A session is active (running or paused)
    pub is_running: bool,
    /// Only meaningful while `is_running` is true
    pub is_paused: bool,
    pub current_type: SessionType,
    /// Remaining seconds; derived from `started_at` while running
    pub time_left: u64,
    /// Start of the current run segment, absent while idle or paused
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task_id: Option<String>,
    /// Completed focus sessions, compared modulo the long break threshold
    pub cycle_count: u32,
}

impl TimerState {
    /// Create an idle focus timer with the given duration
    pub fn new(focus_seconds: u64) -> Self {
        Self {
            is_running: false,
            is_paused: false,
            current_type: SessionType::Focus,
            time_left: focus_seconds,
            started_at: None,
            current_task_id: None,
            cycle_count: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.is_running
    }

    /// Running and not paused
    pub fn is_ticking(&self) -> bool {
        self.is_running && !self.is_paused
    }

    pub fn phase(&self) -> TimerPhase {
        match (self.is_running, self.is_paused) {
            (false, _) => TimerPhase::Idle,
            (true, false) => TimerPhase::Running,
            (true, true) => TimerPhase::Paused,
        }
    }
}

/// Coarse state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
}

/// Durable mirror of [`TimerState`] used to recover after a restart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTimerSnapshot {
    #[serde(flatten)]
    pub state: TimerState,
    /// Seconds in force when the current run segment began
    pub original_duration: u64,
    /// Seconds of this session consumed by earlier run segments
    #[serde(default)]
    pub elapsed_before: u64,
}

impl PersistedTimerSnapshot {
    pub fn new(state: TimerState, original_duration: u64, elapsed_before: u64) -> Self {
        Self {
            state,
            original_duration,
            elapsed_before,
        }
    }
}
