//! Cancellable one-second cadence driving a running timer

use std::{sync::Weak, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::debug;

use super::TimerEngine;

/// Handle to the background task that ticks the engine while it runs
#[derive(Debug)]
pub struct Ticker {
    id: u64,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Spawn a ticker; the first tick fires one `period` from now
    pub(crate) fn spawn(engine: Weak<TimerEngine>, id: u64, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let Some(engine) = engine.upgrade() else {
                    break;
                };
                if !engine.tick_from_ticker(id).await {
                    break;
                }
            }
            debug!("Ticker {} stopped", id);
        });

        Self { id, handle }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop the ticker task
    pub fn cancel(self) {
        self.handle.abort();
    }

    /// Release the handle without aborting; used by the ticker's own task
    /// when it is about to exit its loop
    pub fn detach(self) {
        drop(self.handle);
    }
}
