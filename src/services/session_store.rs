//! Append-only session history store

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use super::storage::{keys, Storage};
use crate::{
    state::{NewSession, Session, SessionType},
    utils::time::{is_same_local_day, is_same_local_month, is_same_local_week},
};

/// Time window applied to a session's `endedAt`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryFilter {
    #[default]
    Today,
    ThisWeek,
    ThisMonth,
    All,
}

impl HistoryFilter {
    pub fn includes(&self, session: &Session, now: DateTime<Utc>) -> bool {
        match self {
            HistoryFilter::Today => is_same_local_day(session.ended_at, now),
            HistoryFilter::ThisWeek => is_same_local_week(session.ended_at, now),
            HistoryFilter::ThisMonth => is_same_local_month(session.ended_at, now),
            HistoryFilter::All => true,
        }
    }
}

/// Aggregate numbers over a filtered slice of history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub sessions: usize,
    pub focus_sessions: usize,
    pub total_focus_sec: u64,
}

impl HistorySummary {
    pub fn from_sessions(sessions: &[Session]) -> Self {
        let focus: Vec<&Session> = sessions
            .iter()
            .filter(|s| s.session_type == SessionType::Focus)
            .collect();
        Self {
            sessions: sessions.len(),
            focus_sessions: focus.len(),
            total_focus_sec: focus.iter().map(|s| s.duration_sec).sum(),
        }
    }
}

pub struct SessionStore {
    storage: Arc<dyn Storage>,
    sessions: RwLock<Vec<Session>>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            sessions: RwLock::new(Vec::new()),
        }
    }

    /// Load persisted history; an unreadable history loads as empty
    pub async fn load(&self) -> usize {
        let sessions = match self.storage.get(keys::SESSIONS).await {
            Ok(Some(value)) => serde_json::from_value::<Vec<Session>>(value).unwrap_or_else(|e| {
                warn!("Failed to parse persisted sessions: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to load sessions: {}", e);
                Vec::new()
            }
        };

        let count = sessions.len();
        *self.sessions.write().await = sessions;
        count
    }

    /// Record a finished session. The record is kept in memory even when
    /// the write-through fails; the error is still returned.
    pub async fn append(&self, new_session: NewSession) -> Result<Session, String> {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            session_type: new_session.session_type,
            duration_sec: new_session.duration_sec,
            started_at: new_session.started_at,
            ended_at: new_session.ended_at,
            task_id: new_session.task_id,
        };

        let mut sessions = self.sessions.write().await;
        sessions.push(session.clone());
        let value = serde_json::to_value(&*sessions)
            .map_err(|e| format!("Failed to serialize sessions: {}", e))?;
        self.storage.set(keys::SESSIONS, value).await?;

        info!("Session recorded: {} ({}s)", session.session_type, session.duration_sec);
        Ok(session)
    }

    pub async fn all(&self) -> Vec<Session> {
        self.sessions.read().await.clone()
    }

    pub async fn filter(&self, filter: HistoryFilter, now: DateTime<Utc>) -> Vec<Session> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|s| filter.includes(s, now))
            .cloned()
            .collect()
    }

    pub async fn by_type(&self, session_type: SessionType) -> Vec<Session> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|s| s.session_type == session_type)
            .cloned()
            .collect()
    }

    pub async fn focus_sessions_today(&self, now: DateTime<Utc>) -> usize {
        self.summary(HistoryFilter::Today, now).await.focus_sessions
    }

    pub async fn total_focus_time_today(&self, now: DateTime<Utc>) -> u64 {
        self.summary(HistoryFilter::Today, now).await.total_focus_sec
    }

    pub async fn summary(&self, filter: HistoryFilter, now: DateTime<Utc>) -> HistorySummary {
        HistorySummary::from_sessions(&self.filter(filter, now).await)
    }
}
