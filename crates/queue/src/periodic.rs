//! Cancellable fixed-interval task.

use std::future::Future;
use std::time::Duration;

use eventpoll_common::{AppError, AppResult};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// A spawned loop that runs a job on every interval tick until cancelled.
///
/// The job is awaited inside the loop, so two runs never overlap; ticks that
/// come due while a run is still in progress are skipped. Cancelling stops
/// further runs but lets a run in progress finish.
pub(crate) struct PeriodicTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn the loop on the current runtime. The first run starts immediately.
    pub(crate) fn spawn<F, Fut>(name: &'static str, period: Duration, mut job: F) -> AppResult<Self>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if period.is_zero() {
            return Err(AppError::Config(format!(
                "{name}: interval must be greater than zero"
            )));
        }
        let runtime = Handle::try_current()
            .map_err(|e| AppError::Config(format!("{name}: no Tokio runtime available: {e}")))?;

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => job().await,
                }
            }

            tracing::debug!(task = name, "Periodic task exited");
        });

        Ok(Self { shutdown, handle })
    }

    /// Whether the loop has exited.
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the loop to exit and hand back its join handle.
    pub(crate) fn cancel(self) -> JoinHandle<()> {
        self.shutdown.send_replace(true);
        self.handle
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_then_on_interval() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let task = PeriodicTask::spawn("test", Duration::from_secs(10), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        task.cancel().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_lets_running_job_finish() {
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();
        let task = PeriodicTask::spawn("slow", Duration::from_secs(10), move || {
            let counter = counter.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        task.cancel().await.unwrap();

        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let result = PeriodicTask::spawn("zero", Duration::ZERO, || async {});
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_requires_runtime() {
        let result = PeriodicTask::spawn("no-runtime", Duration::from_secs(1), || async {});
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
