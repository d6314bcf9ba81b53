#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use pomodoro_timer::{
    engine::{Collaborators, TimerEngine},
    services::{
        keys, MemoryStorage, NotificationHandle, Notifier, SessionStore, SettingsStore, Storage,
        TaskStore,
    },
    state::{NewTask, PersistedTimerSnapshot, SessionType, TimerState},
    utils::{Clock, ManualClock},
};

#[derive(Debug, Clone, PartialEq)]
pub enum NotifierCall {
    Schedule(u64, SessionType),
    Cancel(NotificationHandle),
    Feedback,
}

/// Notifier that records every call; can be told to fail scheduling
#[derive(Default)]
pub struct RecordingNotifier {
    pub calls: Mutex<Vec<NotifierCall>>,
    pub fail: bool,
    next: Mutex<u64>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<NotifierCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn scheduled(&self) -> Vec<(u64, SessionType)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                NotifierCall::Schedule(secs, t) => Some((secs, t)),
                _ => None,
            })
            .collect()
    }

    pub fn cancelled(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, NotifierCall::Cancel(_)))
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn schedule(
        &self,
        after_secs: u64,
        session_type: SessionType,
    ) -> Result<Option<NotificationHandle>, String> {
        self.calls
            .lock()
            .unwrap()
            .push(NotifierCall::Schedule(after_secs, session_type));
        if self.fail {
            return Err("notification permission denied".to_string());
        }
        let mut next = self.next.lock().unwrap();
        *next += 1;
        Ok(Some(NotificationHandle(format!("n{}", next))))
    }

    async fn cancel(&self, handle: &NotificationHandle) -> Result<(), String> {
        self.calls
            .lock()
            .unwrap()
            .push(NotifierCall::Cancel(handle.clone()));
        Ok(())
    }

    async fn feedback(&self) {
        self.calls.lock().unwrap().push(NotifierCall::Feedback);
    }
}

/// Storage whose writes always fail; reads fail too unless `reads_ok`
#[derive(Default)]
pub struct FailingStorage {
    pub reads_ok: bool,
}

impl FailingStorage {
    /// Reads succeed and find nothing, as after a lost write
    pub fn empty() -> Self {
        Self { reads_ok: true }
    }
}

#[async_trait]
impl Storage for FailingStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, String> {
        if self.reads_ok {
            Ok(None)
        } else {
            Err(format!("disk unavailable reading {}", key))
        }
    }

    async fn set(&self, key: &str, _value: Value) -> Result<(), String> {
        Err(format!("disk unavailable writing {}", key))
    }

    async fn remove(&self, key: &str) -> Result<(), String> {
        Err(format!("disk unavailable removing {}", key))
    }
}

pub struct Harness {
    pub engine: Arc<TimerEngine>,
    pub collab: Collaborators,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub storage: Arc<dyn Storage>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(Arc::new(MemoryStorage::new()), RecordingNotifier::default())
    }

    pub fn with(storage: Arc<dyn Storage>, notifier: RecordingNotifier) -> Self {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let notifier = Arc::new(notifier);
        let collab = Collaborators {
            settings: Arc::new(SettingsStore::new(Arc::clone(&storage))),
            tasks: Arc::new(TaskStore::new(Arc::clone(&storage))),
            sessions: Arc::new(SessionStore::new(Arc::clone(&storage))),
            storage: Arc::clone(&storage),
            notifier: notifier.clone(),
            clock: clock.clone(),
        };
        let engine = TimerEngine::new(collab.clone());
        Self {
            engine,
            collab,
            clock,
            notifier,
            storage,
        }
    }

    /// Build a second engine over the same storage, as after a process restart
    pub async fn restarted(&self) -> Harness {
        let restarted = Harness::with(Arc::clone(&self.storage), RecordingNotifier::default());
        restarted.clock.set(self.clock.now());
        restarted.collab.settings.load().await;
        restarted.collab.tasks.load().await;
        restarted.collab.sessions.load().await;
        restarted
    }

    pub async fn add_task(&self, title: &str) -> String {
        self.collab
            .tasks
            .add(NewTask {
                title: title.to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }

    pub async fn snapshot(&self) -> Option<PersistedTimerSnapshot> {
        self.storage
            .get(keys::TIMER_STATE)
            .await
            .unwrap()
            .map(|v| serde_json::from_value(v).unwrap())
    }

    pub async fn write_snapshot(&self, state: TimerState, original_duration: u64) {
        let snapshot = PersistedTimerSnapshot::new(state, original_duration, 0);
        self.storage
            .set(keys::TIMER_STATE, serde_json::to_value(snapshot).unwrap())
            .await
            .unwrap();
    }

    /// Run the current session to its end through `tick`
    pub async fn finish_current(&self) -> TimerState {
        let state = self.engine.start().await;
        self.clock.advance_secs(state.time_left as i64);
        self.engine.tick().await
    }

    pub fn seconds_ago(&self, secs: i64) -> chrono::DateTime<Utc> {
        self.clock.now() - Duration::seconds(secs)
    }
}
