//! Heartbeat daemon — the second thread of control.
//!
//! Cadence is the configured base interval stretched by the capacity
//! multipliers, so a mother of three with a triggered clock beats slower
//! than a newborn. Ticks never kill the process except for a corrupted
//! death clock, which nothing downstream can compute safely from.

use crate::LifecycleCore;
use automaton_core::Error;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub struct Heartbeat {
    core: Arc<LifecycleCore>,
}

impl Heartbeat {
    pub fn new(core: Arc<LifecycleCore>) -> Self {
        Self { core }
    }

    /// Run until shutdown is signaled. Returns `Err` only on the fatal
    /// corrupted-clock path so the caller can log-and-exit.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> automaton_core::Result<()> {
        info!("Heartbeat daemon started");
        loop {
            if *shutdown.borrow() {
                info!("Heartbeat daemon stopping");
                return Ok(());
            }

            let now = Utc::now();
            match self.core.heartbeat_tick(now) {
                Ok(()) => {}
                Err(Error::DeathClockCorrupted) => {
                    error!("Death clock corrupted; refusing to continue");
                    return Err(Error::DeathClockCorrupted);
                }
                Err(e) => warn!("Heartbeat tick failed (continuing): {e}"),
            }

            let interval = self
                .core
                .heartbeat_interval(now)
                .unwrap_or(Duration::from_secs(600));
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => {}
            }
        }
    }
}
