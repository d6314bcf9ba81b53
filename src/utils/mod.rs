//! Utility functions module
//!
//! Clocks, time formatting and signal handling shared across the application.

pub mod clock;
pub mod signals;
pub mod time;

// Re-export main items
pub use clock::{Clock, ManualClock, SystemClock};
pub use signals::shutdown_signal;
