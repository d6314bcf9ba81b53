//! Collaborator services module
//!
//! Persistent storage, the settings/task/session stores built on it, and
//! the notification service used by the timer engine.

pub mod notifications;
pub mod session_store;
pub mod settings_store;
pub mod storage;
pub mod task_store;

// Re-export main types
pub use notifications::{LocalNotifier, NoopNotifier, NotificationHandle, Notifier};
pub use session_store::{HistoryFilter, HistorySummary, SessionStore};
pub use settings_store::SettingsStore;
pub use storage::{keys, JsonFileStorage, MemoryStorage, Storage};
pub use task_store::{TaskStore, TASK_NOT_FOUND};
