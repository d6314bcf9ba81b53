//! Timer engine module
//!
//! The focus/break state machine and the ticker that drives it while running.

pub mod ticker;
pub mod timer_engine;

// Re-export main types
pub use ticker::Ticker;
pub use timer_engine::{Collaborators, TimerEngine, DEFAULT_TICK_PERIOD};
