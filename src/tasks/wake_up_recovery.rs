//! Wake-up recovery background task

use std::{sync::Arc, time::Duration};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::state::AppState;

/// Wall-clock drift beyond monotonic time that counts as a host sleep
pub const SLEEP_TOLERANCE: Duration = Duration::from_secs(5);

/// Seconds the host slept between two checks, if it slept at all.
///
/// The monotonic clock stops while the host is suspended; the wall clock
/// does not, so the difference is the time spent asleep.
pub fn detect_sleep(wall_elapsed: chrono::Duration, monotonic_elapsed: Duration) -> Option<u64> {
    let wall = wall_elapsed.to_std().ok()?;
    let gap = wall.checked_sub(monotonic_elapsed)?;
    (gap > SLEEP_TOLERANCE).then(|| gap.as_secs())
}

/// Background task that detects host wake-ups and delivers the resume
/// event to the timer engine
pub async fn wake_up_recovery_task(state: Arc<AppState>, check_every: Duration) {
    info!("Starting wake-up recovery task (every {}s)", check_every.as_secs());

    let mut interval = interval(check_every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_wall = state.clock.now();
    let mut last_mono = Instant::now();

    loop {
        interval.tick().await;

        let now_wall = state.clock.now();
        let now_mono = Instant::now();

        match detect_sleep(now_wall - last_wall, now_mono - last_mono) {
            Some(slept) => {
                info!("System wake-up detected after ~{}s asleep, recovering timer", slept);
                state.engine.on_resume().await;
                state.record_action("wake-up");
            }
            None => debug!("No wake-up detected"),
        }

        last_wall = now_wall;
        last_mono = now_mono;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_clocks_are_not_a_sleep() {
        assert_eq!(
            detect_sleep(chrono::Duration::seconds(15), Duration::from_secs(15)),
            None
        );
        assert_eq!(
            detect_sleep(chrono::Duration::seconds(18), Duration::from_secs(15)),
            None
        );
    }

    #[test]
    fn wall_clock_jump_is_a_sleep() {
        assert_eq!(
            detect_sleep(chrono::Duration::seconds(615), Duration::from_secs(15)),
            Some(600)
        );
    }

    #[test]
    fn wall_clock_moving_backwards_is_ignored() {
        assert_eq!(
            detect_sleep(chrono::Duration::seconds(-30), Duration::from_secs(15)),
            None
        );
    }
}
