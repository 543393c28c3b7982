//! Telemetry ticker
//!
//! A background task that wakes on a fixed interval and asks the engine to run
//! one telemetry step. The task only carries the generation it was started
//! under; the engine applies the step on its own coordination loop and ignores
//! ticks from a stale generation. Stopping (or dropping) the ticker aborts the
//! task outright.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Handle to a running telemetry ticker
#[derive(Debug)]
pub struct TelemetryTicker {
    generation: u64,
    handle: JoinHandle<()>,
}

impl TelemetryTicker {
    /// Spawn a ticker; the first tick fires one full period from now
    pub fn spawn(generation: u64, period: Duration, ticks: mpsc::UnboundedSender<u64>) -> Self {
        let handle = tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                if ticks.send(generation).is_err() {
                    tracing::debug!("Telemetry tick receiver gone, ticker exiting");
                    break;
                }
            }
        });
        tracing::debug!("Telemetry ticker started (generation {}, every {:?})", generation, period);
        Self { generation, handle }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Abort the ticker task
    pub fn stop(self) {
        // Drop does the abort
        tracing::debug!("Telemetry ticker stopped (generation {})", self.generation);
    }
}

impl Drop for TelemetryTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
