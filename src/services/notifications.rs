//! Local alerts fired when a session's time is up

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{sync::broadcast, task::JoinHandle, time::sleep};
use tracing::{debug, info, warn};

use crate::state::{Locale, SessionType};

/// Opaque identifier of a scheduled alert
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationHandle(pub String);

/// Schedules and cancels one-shot alerts
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Schedule an alert after `after_secs`. `Ok(None)` means the platform
    /// has no alert facility and nothing was scheduled.
    async fn schedule(
        &self,
        after_secs: u64,
        session_type: SessionType,
    ) -> Result<Option<NotificationHandle>, String>;

    async fn cancel(&self, handle: &NotificationHandle) -> Result<(), String>;

    /// Tactile feedback on session completion
    async fn feedback(&self) {}
}

/// Title and body shown for a finished session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertMessage {
    pub title: &'static str,
    pub body: &'static str,
}

pub fn alert_message(session_type: SessionType, locale: Locale) -> AlertMessage {
    let (title, body) = match (session_type, locale) {
        (SessionType::Focus, Locale::PtBr) => (
            "🍅 Foco Concluído!",
            "Hora de fazer uma pausa. Bom trabalho!",
        ),
        (SessionType::Focus, Locale::EnUs) => (
            "🍅 Focus Complete!",
            "Time for a break. Great work!",
        ),
        (SessionType::ShortBreak, Locale::PtBr) => (
            "⏱️ Pausa Curta Concluída!",
            "Vamos continuar focando!",
        ),
        (SessionType::ShortBreak, Locale::EnUs) => (
            "⏱️ Short Break Complete!",
            "Let's get back to focusing!",
        ),
        (SessionType::LongBreak, Locale::PtBr) => (
            "🎉 Pausa Longa Concluída!",
            "Descansou bem? Hora de retomar!",
        ),
        (SessionType::LongBreak, Locale::EnUs) => (
            "🎉 Long Break Complete!",
            "Feeling refreshed? Time to get back to work!",
        ),
    };
    AlertMessage { title, body }
}

/// An alert that reached its deadline
#[derive(Debug, Clone, Serialize)]
pub struct FiredAlert {
    pub handle: NotificationHandle,
    pub session_type: SessionType,
    pub message: AlertMessage,
    pub sound: bool,
}

/// In-process notifier: one sleeping tokio task per alert
pub struct LocalNotifier {
    locale: Locale,
    sound: bool,
    next_id: AtomicU64,
    pending: Mutex<HashMap<NotificationHandle, JoinHandle<()>>>,
    fired_tx: broadcast::Sender<FiredAlert>,
}

impl LocalNotifier {
    pub fn new(locale: Locale, sound: bool) -> Self {
        let (fired_tx, _) = broadcast::channel(16);
        Self {
            locale,
            sound,
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            fired_tx,
        }
    }

    /// Receive every alert as it fires
    pub fn subscribe(&self) -> broadcast::Receiver<FiredAlert> {
        self.fired_tx.subscribe()
    }

    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .map(|pending| pending.values().filter(|h| !h.is_finished()).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Notifier for LocalNotifier {
    async fn schedule(
        &self,
        after_secs: u64,
        session_type: SessionType,
    ) -> Result<Option<NotificationHandle>, String> {
        let handle = NotificationHandle(format!(
            "alert-{}",
            self.next_id.fetch_add(1, Ordering::Relaxed)
        ));

        let alert = FiredAlert {
            handle: handle.clone(),
            session_type,
            message: alert_message(session_type, self.locale),
            sound: self.sound,
        };
        let fired_tx = self.fired_tx.clone();
        let task = tokio::spawn(async move {
            sleep(Duration::from_secs(after_secs)).await;
            info!("{} {}", alert.message.title, alert.message.body);
            // No subscribers is fine
            let _ = fired_tx.send(alert);
        });

        let mut pending = self
            .pending
            .lock()
            .map_err(|e| format!("Failed to lock pending alerts: {}", e))?;
        pending.retain(|_, task| !task.is_finished());
        pending.insert(handle.clone(), task);

        debug!("Scheduled {} alert {:?} in {}s", session_type, handle, after_secs);
        Ok(Some(handle))
    }

    async fn cancel(&self, handle: &NotificationHandle) -> Result<(), String> {
        let task = self
            .pending
            .lock()
            .map_err(|e| format!("Failed to lock pending alerts: {}", e))?
            .remove(handle);

        match task {
            Some(task) => {
                task.abort();
                debug!("Cancelled alert {:?}", handle);
            }
            None => warn!("Cancel requested for unknown alert {:?}", handle),
        }
        Ok(())
    }

    async fn feedback(&self) {
        debug!("Completion feedback");
    }
}

/// Notifier for hosts without alerts; the timer keeps working on elapsed time
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn schedule(
        &self,
        _after_secs: u64,
        _session_type: SessionType,
    ) -> Result<Option<NotificationHandle>, String> {
        Ok(None)
    }

    async fn cancel(&self, _handle: &NotificationHandle) -> Result<(), String> {
        Ok(())
    }
}
