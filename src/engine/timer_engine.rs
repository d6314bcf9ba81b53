//! Pomodoro timer engine: focus/break state machine with persistence and recovery

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info, warn};

use super::ticker::Ticker;
use crate::{
    services::{
        keys, NotificationHandle, Notifier, SessionStore, SettingsStore, Storage, TaskStore,
    },
    state::{NewSession, PersistedTimerSnapshot, Session, SessionType, Settings, TimerState},
    utils::{time::elapsed_secs, Clock},
};

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

/// Services the engine reads from and writes to
#[derive(Clone)]
pub struct Collaborators {
    pub settings: Arc<SettingsStore>,
    pub tasks: Arc<TaskStore>,
    pub sessions: Arc<SessionStore>,
    pub storage: Arc<dyn Storage>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

struct EngineInner {
    state: TimerState,
    /// Seconds of the current session consumed before `started_at`
    elapsed_before: u64,
    /// Remaining seconds when the current run segment began
    original_duration: u64,
    notification: Option<NotificationHandle>,
    ticker: Option<Ticker>,
    next_ticker_id: u64,
}

/// Owns the timer state. Every command holds the engine lock until its
/// storage and notification work is done, so transitions never interleave.
pub struct TimerEngine {
    collab: Collaborators,
    tick_period: Duration,
    inner: Mutex<EngineInner>,
    state_tx: watch::Sender<TimerState>,
    completed_tx: broadcast::Sender<Session>,
    self_ref: Weak<TimerEngine>,
}

impl TimerEngine {
    pub fn new(collab: Collaborators) -> Arc<Self> {
        Self::with_tick_period(collab, DEFAULT_TICK_PERIOD)
    }

    pub fn with_tick_period(collab: Collaborators, tick_period: Duration) -> Arc<Self> {
        let initial = TimerState::new(Settings::default().total_duration_for(SessionType::Focus));
        let (state_tx, _) = watch::channel(initial.clone());
        let (completed_tx, _) = broadcast::channel(32);

        Arc::new_cyclic(|self_ref| Self {
            collab,
            tick_period,
            inner: Mutex::new(EngineInner {
                state: initial,
                elapsed_before: 0,
                original_duration: 0,
                notification: None,
                ticker: None,
                next_ticker_id: 1,
            }),
            state_tx,
            completed_tx,
            self_ref: self_ref.clone(),
        })
    }

    /// Latest published state; does not wait for an in-flight command
    pub fn state(&self) -> TimerState {
        self.state_tx.borrow().clone()
    }

    /// Watch every state change
    pub fn subscribe(&self) -> watch::Receiver<TimerState> {
        self.state_tx.subscribe()
    }

    /// Receive each session as it completes
    pub fn subscribe_completions(&self) -> broadcast::Receiver<Session> {
        self.completed_tx.subscribe()
    }

    pub async fn has_ticker(&self) -> bool {
        self.inner.lock().await.ticker.is_some()
    }

    pub async fn pending_notification(&self) -> Option<NotificationHandle> {
        self.inner.lock().await.notification.clone()
    }

    /// Begin the current session from idle
    pub async fn start(&self) -> TimerState {
        let mut inner = self.inner.lock().await;
        if !inner.state.is_idle() {
            debug!("Start ignored, timer already running");
            return inner.state.clone();
        }

        let total = self.collab.settings.total_duration_for(inner.state.current_type).await;
        if inner.state.time_left == 0 || inner.state.time_left > total {
            inner.state.time_left = total;
        }

        let time_left = inner.state.time_left;
        let session_type = inner.state.current_type;
        inner.state.is_running = true;
        inner.state.is_paused = false;
        inner.state.started_at = Some(self.collab.clock.now());
        inner.elapsed_before = total - time_left;
        inner.original_duration = time_left;

        self.replace_notification(&mut inner, time_left, session_type).await;
        self.install_ticker(&mut inner);
        self.persist_snapshot(&inner).await;
        self.publish(&inner);

        info!("Started {} session with {}s left", session_type, time_left);
        inner.state.clone()
    }

    /// Freeze the remaining time of a running session
    pub async fn pause(&self) -> TimerState {
        let mut inner = self.inner.lock().await;
        if !inner.state.is_ticking() {
            debug!("Pause ignored, timer not running");
            return inner.state.clone();
        }

        let settings = self.collab.settings.get().await;
        let remaining = self.remaining_secs(&inner, &settings);
        self.stop_ticker(&mut inner, false);
        self.cancel_notification(&mut inner).await;

        if remaining == 0 {
            self.complete_locked(&mut inner, false).await;
            return inner.state.clone();
        }

        inner.state.time_left = remaining;
        inner.state.is_paused = true;
        inner.state.started_at = None;
        inner.elapsed_before = settings
            .total_duration_for(inner.state.current_type)
            .saturating_sub(remaining);

        self.persist_snapshot(&inner).await;
        self.publish(&inner);

        info!("Paused {} session with {}s left", inner.state.current_type, remaining);
        inner.state.clone()
    }

    /// Continue a paused session from its frozen remaining time
    pub async fn resume(&self) -> TimerState {
        let mut inner = self.inner.lock().await;
        if !(inner.state.is_running && inner.state.is_paused) {
            debug!("Resume ignored, timer not paused");
            return inner.state.clone();
        }

        let total = self.collab.settings.total_duration_for(inner.state.current_type).await;
        inner.state.time_left = inner.state.time_left.min(total);

        let time_left = inner.state.time_left;
        let session_type = inner.state.current_type;
        inner.state.is_paused = false;
        inner.state.started_at = Some(self.collab.clock.now());
        inner.elapsed_before = total - time_left;
        inner.original_duration = time_left;

        self.replace_notification(&mut inner, time_left, session_type).await;
        self.install_ticker(&mut inner);
        self.persist_snapshot(&inner).await;
        self.publish(&inner);

        info!("Resumed {} session with {}s left", session_type, time_left);
        inner.state.clone()
    }

    /// Return to idle with a full duration for the current session type
    pub async fn reset(&self) -> TimerState {
        let mut inner = self.inner.lock().await;
        self.stop_ticker(&mut inner, false);
        self.cancel_notification(&mut inner).await;

        let total = self.collab.settings.total_duration_for(inner.state.current_type).await;
        inner.state.is_running = false;
        inner.state.is_paused = false;
        inner.state.started_at = None;
        inner.state.time_left = total;
        inner.elapsed_before = 0;
        inner.original_duration = 0;

        self.clear_snapshot().await;
        self.publish(&inner);

        info!("Timer reset to {} ({}s)", inner.state.current_type, total);
        inner.state.clone()
    }

    /// Recompute remaining time, completing the session when it reaches zero
    pub async fn tick(&self) -> TimerState {
        let mut inner = self.inner.lock().await;
        self.tick_locked(&mut inner, false).await;
        inner.state.clone()
    }

    /// Tick on behalf of ticker `id`; returns whether that ticker should keep going
    pub(crate) async fn tick_from_ticker(&self, id: u64) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.ticker.as_ref().map(Ticker::id) != Some(id) {
            return false;
        }
        self.tick_locked(&mut inner, true).await
    }

    /// Finish the current session now. No-op unless a run segment is active.
    pub async fn complete_session(&self) -> Option<Session> {
        let mut inner = self.inner.lock().await;
        self.complete_locked(&mut inner, false).await
    }

    /// Attribute focus time to a task, or to none
    pub async fn set_current_task(&self, task_id: Option<String>) -> TimerState {
        let mut inner = self.inner.lock().await;
        inner.state.current_task_id = task_id;
        self.persist_snapshot(&inner).await;
        self.publish(&inner);

        debug!("Current task set to {:?}", inner.state.current_task_id);
        inner.state.clone()
    }

    /// Rebuild state from the persisted snapshot. Called once at startup.
    pub async fn restore_state(&self) -> TimerState {
        let mut inner = self.inner.lock().await;
        let snapshot = self.load_snapshot().await;
        self.restore_locked(&mut inner, snapshot).await
    }

    /// Host signal that the application returned to the foreground. An
    /// active session with no readable snapshot is recomputed from memory.
    pub async fn on_resume(&self) -> TimerState {
        info!("Application resumed, recomputing timer state");
        let mut inner = self.inner.lock().await;
        let snapshot = self.load_snapshot().await;
        if snapshot.is_none() && !inner.state.is_idle() {
            warn!("Timer snapshot unavailable, keeping in-memory {} session",
                  inner.state.current_type);
            self.recover_in_memory(&mut inner).await;
            return inner.state.clone();
        }
        self.restore_locked(&mut inner, snapshot).await
    }

    async fn restore_locked(
        &self,
        inner: &mut EngineInner,
        snapshot: Option<PersistedTimerSnapshot>,
    ) -> TimerState {
        self.stop_ticker(inner, false);
        self.cancel_notification(inner).await;

        let settings = self.collab.settings.get().await;
        let Some(snapshot) = snapshot else {
            inner.state.is_running = false;
            inner.state.is_paused = false;
            inner.state.started_at = None;
            inner.state.time_left = settings.total_duration_for(inner.state.current_type);
            inner.elapsed_before = 0;
            inner.original_duration = 0;
            self.publish(inner);

            debug!("No timer snapshot, idle with {}s", inner.state.time_left);
            return inner.state.clone();
        };

        let mut state = snapshot.state;
        let total = settings.total_duration_for(state.current_type);

        if state.started_at.is_none() {
            // Paused, or idle with a task selected
            state.is_paused = state.is_running;
            if state.time_left == 0 || state.time_left > total {
                state.time_left = total;
            }
            inner.elapsed_before = total - state.time_left;
            inner.original_duration = snapshot.original_duration;
            inner.state = state;
            self.publish(inner);

            info!("Restored {:?} {} session with {}s left",
                  inner.state.phase(), inner.state.current_type, inner.state.time_left);
            return inner.state.clone();
        }

        state.is_running = true;
        state.is_paused = false;
        inner.state = state;
        inner.elapsed_before = snapshot.elapsed_before;
        inner.original_duration = snapshot.original_duration;

        let remaining = self.remaining_secs(inner, &settings);
        if remaining == 0 {
            info!("{} session finished while suspended", inner.state.current_type);
            self.complete_locked(inner, false).await;
            return inner.state.clone();
        }

        inner.state.time_left = remaining;
        let session_type = inner.state.current_type;
        self.replace_notification(inner, remaining, session_type).await;
        self.install_ticker(inner);
        self.publish(inner);

        info!("Recovered running {} session with {}s left", session_type, remaining);
        inner.state.clone()
    }

    /// Re-arm an active session from its in-memory segment
    async fn recover_in_memory(&self, inner: &mut EngineInner) {
        if !inner.state.is_ticking() {
            self.persist_snapshot(inner).await;
            return;
        }

        self.stop_ticker(inner, false);
        let settings = self.collab.settings.get().await;
        let remaining = self.remaining_secs(inner, &settings);
        if remaining == 0 {
            info!("{} session finished while suspended", inner.state.current_type);
            self.complete_locked(inner, false).await;
            return;
        }

        inner.state.time_left = remaining;
        let session_type = inner.state.current_type;
        self.replace_notification(inner, remaining, session_type).await;
        self.install_ticker(inner);
        self.persist_snapshot(inner).await;
        self.publish(inner);

        info!("Recovered running {} session with {}s left", session_type, remaining);
    }

    async fn tick_locked(&self, inner: &mut EngineInner, from_ticker: bool) -> bool {
        if !inner.state.is_ticking() {
            return false;
        }

        let settings = self.collab.settings.get().await;
        let remaining = self.remaining_secs(inner, &settings);
        if remaining == 0 {
            self.complete_locked(inner, from_ticker).await;
            return false;
        }

        if remaining != inner.state.time_left {
            inner.state.time_left = remaining;
            self.publish(inner);
        }
        true
    }

    async fn complete_locked(&self, inner: &mut EngineInner, from_ticker: bool) -> Option<Session> {
        let Some(started_at) = inner.state.started_at else {
            debug!("Completion ignored, no active run segment");
            return None;
        };

        self.stop_ticker(inner, from_ticker);
        self.cancel_notification(inner).await;

        let settings = self.collab.settings.get().await;
        let finished_type = inner.state.current_type;
        let task_id = inner.state.current_task_id.clone();

        let recorded = match self
            .collab
            .sessions
            .append(NewSession {
                session_type: finished_type,
                duration_sec: settings.total_duration_for(finished_type),
                started_at,
                ended_at: self.collab.clock.now(),
                task_id: task_id.clone(),
            })
            .await
        {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Failed to record {} session: {}", finished_type, e);
                None
            }
        };

        if finished_type == SessionType::Focus {
            if let Some(task_id) = task_id.as_deref() {
                if let Err(e) = self.collab.tasks.increment_pomodoros(task_id).await {
                    warn!("Failed to credit pomodoro to task {}: {}", task_id, e);
                }
            }
        }

        if settings.vibration {
            self.collab.notifier.feedback().await;
        }

        let next_type = if finished_type.is_break() {
            SessionType::Focus
        } else {
            inner.state.cycle_count += 1;
            if inner.state.cycle_count % settings.cycles_until_long_break.max(1) == 0 {
                SessionType::LongBreak
            } else {
                SessionType::ShortBreak
            }
        };

        inner.state.current_type = next_type;
        inner.state.time_left = settings.total_duration_for(next_type);
        inner.state.is_running = false;
        inner.state.is_paused = false;
        inner.state.started_at = None;
        inner.elapsed_before = 0;
        inner.original_duration = 0;

        self.clear_snapshot().await;
        self.publish(inner);

        info!("Completed {} session, next is {} (cycle {})",
              finished_type, next_type, inner.state.cycle_count);

        if let Some(session) = &recorded {
            // No subscribers is fine
            let _ = self.completed_tx.send(session.clone());
        }
        recorded
    }

    /// `max(0, total − elapsed_before − floor(now − started_at))`, with the
    /// total read from live settings
    fn remaining_secs(&self, inner: &EngineInner, settings: &Settings) -> u64 {
        match inner.state.started_at {
            Some(started_at) => settings
                .total_duration_for(inner.state.current_type)
                .saturating_sub(inner.elapsed_before)
                .saturating_sub(elapsed_secs(started_at, self.collab.clock.now())),
            None => inner.state.time_left,
        }
    }

    fn install_ticker(&self, inner: &mut EngineInner) {
        self.stop_ticker(inner, false);
        let id = inner.next_ticker_id;
        inner.next_ticker_id += 1;
        inner.ticker = Some(Ticker::spawn(self.self_ref.clone(), id, self.tick_period));
        debug!("Ticker {} installed", id);
    }

    /// Drop the live ticker. The ticker's own task detaches instead of
    /// aborting itself mid-completion.
    fn stop_ticker(&self, inner: &mut EngineInner, from_ticker: bool) {
        if let Some(ticker) = inner.ticker.take() {
            if from_ticker {
                ticker.detach();
            } else {
                ticker.cancel();
            }
        }
    }

    async fn replace_notification(
        &self,
        inner: &mut EngineInner,
        after_secs: u64,
        session_type: SessionType,
    ) {
        self.cancel_notification(inner).await;
        inner.notification = match self.collab.notifier.schedule(after_secs, session_type).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Failed to schedule {} alert: {}", session_type, e);
                None
            }
        };
    }

    async fn cancel_notification(&self, inner: &mut EngineInner) {
        if let Some(handle) = inner.notification.take() {
            if let Err(e) = self.collab.notifier.cancel(&handle).await {
                warn!("Failed to cancel alert {:?}: {}", handle, e);
            }
        }
    }

    async fn load_snapshot(&self) -> Option<PersistedTimerSnapshot> {
        match self.collab.storage.get(keys::TIMER_STATE).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!("Discarding unreadable timer snapshot: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to load timer snapshot: {}", e);
                None
            }
        }
    }

    async fn persist_snapshot(&self, inner: &EngineInner) {
        let original_duration = if inner.state.started_at.is_some() {
            inner.original_duration
        } else {
            inner.state.time_left
        };
        let snapshot =
            PersistedTimerSnapshot::new(inner.state.clone(), original_duration, inner.elapsed_before);

        let result = match serde_json::to_value(&snapshot) {
            Ok(value) => self.collab.storage.set(keys::TIMER_STATE, value).await,
            Err(e) => Err(format!("Failed to serialize timer snapshot: {}", e)),
        };
        if let Err(e) = result {
            warn!("Failed to persist timer snapshot: {}", e);
        }
    }

    async fn clear_snapshot(&self) {
        if let Err(e) = self.collab.storage.remove(keys::TIMER_STATE).await {
            warn!("Failed to clear timer snapshot: {}", e);
        }
    }

    fn publish(&self, inner: &EngineInner) {
        self.state_tx.send_replace(inner.state.clone());
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        if let Some(ticker) = self.inner.get_mut().ticker.take() {
            ticker.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::{MemoryStorage, NoopNotifier},
        utils::ManualClock,
    };
    use chrono::Utc;

    fn engine() -> (Arc<TimerEngine>, Arc<ManualClock>) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = TimerEngine::new(Collaborators {
            settings: Arc::new(SettingsStore::new(Arc::clone(&storage))),
            tasks: Arc::new(TaskStore::new(Arc::clone(&storage))),
            sessions: Arc::new(SessionStore::new(Arc::clone(&storage))),
            storage,
            notifier: Arc::new(NoopNotifier),
            clock: clock.clone(),
        });
        (engine, clock)
    }

    #[tokio::test]
    async fn start_installs_exactly_one_ticker() {
        let (engine, _clock) = engine();
        engine.start().await;
        assert!(engine.has_ticker().await);
        let id = engine.inner.lock().await.ticker.as_ref().map(Ticker::id);

        // A second start is a no-op and must not replace the ticker
        engine.start().await;
        assert_eq!(engine.inner.lock().await.ticker.as_ref().map(Ticker::id), id);
    }

    #[tokio::test]
    async fn stale_ticker_ids_are_told_to_stop() {
        let (engine, _clock) = engine();
        engine.start().await;
        engine.pause().await;
        engine.resume().await;

        let live = engine.inner.lock().await.ticker.as_ref().map(Ticker::id).unwrap();
        assert!(!engine.tick_from_ticker(live - 1).await);
        assert!(engine.tick_from_ticker(live).await);
    }

    #[tokio::test]
    async fn ticker_completion_detaches_its_handle() {
        let (engine, clock) = engine();
        engine.start().await;
        let live = engine.inner.lock().await.ticker.as_ref().map(Ticker::id).unwrap();

        clock.advance_secs(1500);
        assert!(!engine.tick_from_ticker(live).await);
        assert!(!engine.has_ticker().await);
        assert_eq!(engine.state().current_type, SessionType::ShortBreak);
    }

    #[tokio::test]
    async fn elapsed_before_carries_across_pause() {
        let (engine, clock) = engine();
        engine.start().await;
        clock.advance_secs(100);
        engine.pause().await;
        clock.advance_secs(600);
        engine.resume().await;
        clock.advance_secs(50);

        assert_eq!(engine.tick().await.time_left, 1350);
    }
}
