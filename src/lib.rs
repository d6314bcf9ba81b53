//! Pomodoro Timer - a focus timer service with tasks, history and settings
//!
//! The core is the [`TimerEngine`], a focus/short break/long break state
//! machine that persists its state, recovers it after a restart or a host
//! sleep, and records completed sessions.

pub mod api;
pub mod config;
pub mod engine;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use engine::{Collaborators, TimerEngine};
pub use state::AppState;
pub use utils::signals::shutdown_signal;
