//! State management module
//!
//! Timer state, settings, tasks and sessions, plus the shared application
//! state handed to the HTTP layer.

pub mod app_state;
pub mod session;
pub mod settings;
pub mod task;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use session::{NewSession, Session};
pub use settings::{Locale, Settings, SettingsPatch, Theme};
pub use task::{NewTask, Priority, Task, TaskPatch};
pub use timer_state::{PersistedTimerSnapshot, SessionType, TimerPhase, TimerState};
