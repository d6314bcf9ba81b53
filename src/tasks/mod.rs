//! Background tasks module
//!
//! This module contains background tasks that run alongside the HTTP server.

pub mod wake_up_recovery;

// Re-export main functions
pub use wake_up_recovery::{detect_sleep, wake_up_recovery_task};
