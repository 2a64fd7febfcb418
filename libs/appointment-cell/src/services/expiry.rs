// libs/appointment-cell/src/services/expiry.rs
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::models::ExpirySummary;
use crate::services::lifecycle::AppointmentLifecycleService;

const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

/// Runs the reservation expiry sweep on a fixed period.
///
/// Sweeps are awaited inside the tick loop and late ticks are skipped, so at
/// most one sweep is ever in flight.
pub struct ExpiryScheduler {
    lifecycle: Arc<AppointmentLifecycleService>,
    period: Duration,
}

pub struct ExpirySchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    join_handle: JoinHandle<()>,
}

impl ExpiryScheduler {
    pub fn new(lifecycle: Arc<AppointmentLifecycleService>, period: Duration) -> Self {
        let period = if period.is_zero() {
            warn!("Expiry sweep period of zero requested, using {:?}", DEFAULT_PERIOD);
            DEFAULT_PERIOD
        } else {
            period
        };

        Self { lifecycle, period }
    }

    pub fn every_minute(lifecycle: Arc<AppointmentLifecycleService>) -> Self {
        Self::new(lifecycle, DEFAULT_PERIOD)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// One sweep, outside the timer.
    pub async fn sweep(&self) -> ExpirySummary {
        self.lifecycle.expire().await
    }

    pub fn start(self) -> ExpirySchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!("Starting reservation expiry scheduler every {:?}", self.period);
        let join_handle = tokio::spawn(async move { self.run(shutdown_rx).await });

        ExpirySchedulerHandle {
            shutdown_tx,
            join_handle,
        }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let summary = self.sweep().await;
                    debug!(
                        "Expiry tick: scanned={}, released={}, failed={}",
                        summary.scanned, summary.released, summary.failed
                    );
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Reservation expiry scheduler stopped");
    }
}

impl ExpirySchedulerHandle {
    pub fn is_running(&self) -> bool {
        !self.join_handle.is_finished()
    }

    /// Stop the ticker, letting an in-flight sweep finish first.
    pub async fn shutdown(self) {
        if self.shutdown_tx.send(true).is_err() {
            debug!("Expiry scheduler already stopped");
        }

        if let Err(e) = self.join_handle.await {
            error!("Expiry scheduler task failed: {}", e);
        }
    }
}
