//! Background refresh loop
//!
//! At most one loop runs per [`Scheduler`]. Each tick runs on its own task
//! and is awaited before the loop waits for the next interval or a stop
//! signal, so ticks never overlap and a stop never cuts a tick short.

pub mod refresh;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::models::JobRunOutcome;

pub use refresh::Refresher;

/// One unit of scheduled work.
#[async_trait]
pub trait RefreshJob: Send + Sync + 'static {
    async fn run_once(&self) -> Result<JobRunOutcome>;
}

struct ActiveLoop {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns the refresh loop task.
pub struct Scheduler {
    job: Arc<dyn RefreshJob>,
    interval: Duration,
    enabled: bool,
    active: Mutex<Option<ActiveLoop>>,
}

impl Scheduler {
    pub fn new(job: Arc<dyn RefreshJob>, interval: Duration, enabled: bool) -> Self {
        Self {
            job,
            interval,
            enabled,
            active: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn active(&self) -> std::sync::MutexGuard<'_, Option<ActiveLoop>> {
        self.active.lock().unwrap_or_else(|poisoned| {
            warn!("Scheduler state lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Start the loop. Returns false when disabled or already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        if !self.enabled {
            info!("scheduler.loop.disabled");
            return false;
        }

        let mut active = self.active();
        if active.as_ref().is_some_and(|a| !a.handle.is_finished()) {
            debug!("Scheduler already running, ignoring start");
            return false;
        }

        let (shutdown, receiver) = watch::channel(false);
        let handle = tokio::spawn(run_loop(self.job.clone(), self.interval, receiver));
        *active = Some(ActiveLoop { shutdown, handle });
        true
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.active()
            .as_ref()
            .is_some_and(|a| !a.handle.is_finished())
    }

    /// Signal the loop and wait for it, including any tick in flight.
    ///
    /// The scheduler can be started again afterwards.
    pub async fn stop(&self) {
        let Some(active) = self.active().take() else {
            return;
        };

        // Err only if the loop already exited
        let _ = active.shutdown.send(true);
        if let Err(err) = active.handle.await {
            error!("scheduler.loop.join_failed error={}", err);
        }
    }
}

async fn run_loop(
    job: Arc<dyn RefreshJob>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(
        "scheduler.loop.started interval_seconds={}",
        interval.as_secs_f64()
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        let tick = job.clone();
        match tokio::spawn(async move { tick.run_once().await }).await {
            Ok(Ok(outcome)) => debug!(
                "scheduler.refresh.tick_done status={} duration_ms={}",
                outcome.status, outcome.duration_ms
            ),
            Ok(Err(err)) => error!("scheduler.refresh.loop_failed error={}", err),
            Err(err) => error!("scheduler.refresh.loop_failed error={}", err),
        }

        tokio::select! {
            // A send or a dropped sender both mean stop
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("scheduler.loop.stopped");
}
