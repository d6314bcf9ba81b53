//! Completed session records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SessionType;

/// One finished focus or break session; immutable once recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    pub duration_sec: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

/// Session data before the store assigns an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    pub session_type: SessionType,
    pub duration_sec: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub task_id: Option<String>,
}
