//! Background task that expires abandoned holds.

use crate::coordinator::ReservationCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handle to a running expiry sweeper.
///
/// Dropping the handle aborts the task; [`SweeperHandle::shutdown`] stops
/// it after the current sweep.
pub struct SweeperHandle {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stops the sweeper and waits for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                tracing::warn!(%error, "Expiry sweeper ended abnormally");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Spawns a task calling [`ReservationCoordinator::sweep_expired`] every `interval`.
#[must_use]
pub fn spawn_expiry_sweeper(
    coordinator: Arc<ReservationCoordinator>,
    interval: Duration,
) -> SweeperHandle {
    let (stop_tx, mut stop_rx) = oneshot::channel();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX), "Expiry sweeper started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    coordinator.sweep_expired().await;
                }
                _ = &mut stop_rx => {
                    tracing::info!("Expiry sweeper stopped");
                    break;
                }
            }
        }
    });
    SweeperHandle {
        stop: Some(stop_tx),
        task: Some(task),
    }
}
