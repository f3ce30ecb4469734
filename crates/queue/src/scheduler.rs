//! Poll lifecycle scheduler.
//!
//! Keeps each poll's administrative `is_active` flag in line with its window.
//! Every tick lists the polls that could be out of line, derives the needed
//! correction from [`required_correction`], and writes all corrections
//! concurrently. A failed write is logged and left for the next tick, where
//! the same rule fires again because the stored state has not changed.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use eventpoll_common::{AppResult, SharedClock, config::SchedulerSettings};
use eventpoll_core::{
    Correction, LoggingListener, PollFilter, PollLifecycleListener, PollPatch, SharedPollStore,
    required_correction,
};
use eventpoll_db::entities::poll;
use futures::future::join_all;
use serde::Serialize;

use crate::periodic::PeriodicTask;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between reconciliation ticks (default: 1 minute).
    pub check_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(60),
        }
    }
}

impl From<&SchedulerSettings> for SchedulerConfig {
    fn from(settings: &SchedulerSettings) -> Self {
        Self {
            check_interval: Duration::from_secs(settings.check_interval_secs),
        }
    }
}

/// Outcome of one reconciliation tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Polls returned by the store query.
    pub evaluated: usize,
    /// Corrective updates issued.
    pub attempted: usize,
    /// Polls switched on.
    pub activated: usize,
    /// Polls switched off.
    pub deactivated: usize,
    /// Corrective updates that failed.
    pub failed: usize,
}

/// Scheduler state for tracking tick runs.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    /// Clock time of the most recent tick, successful or not.
    pub last_tick_at: Option<DateTime<Utc>>,
    /// Report of the most recent tick that could list polls.
    pub last_report: Option<TickReport>,
    /// Ticks that listed polls and applied their corrections.
    pub ticks: u64,
    /// Ticks abandoned because the poll list could not be read.
    pub failed_ticks: u64,
}

struct SchedulerInner {
    store: SharedPollStore,
    clock: SharedClock,
    listener: Arc<dyn PollLifecycleListener>,
    tick_lock: tokio::sync::Mutex<()>,
    state: Mutex<SchedulerState>,
}

impl SchedulerInner {
    async fn tick(&self, now: DateTime<Utc>) -> AppResult<TickReport> {
        // Ticks against one scheduler never interleave
        let _running = self.tick_lock.lock().await;

        let polls = match self
            .store
            .list_polls(PollFilter::ActiveOrStartedBy(now))
            .await
        {
            Ok(polls) => polls,
            Err(e) => {
                let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                state.failed_ticks += 1;
                state.last_tick_at = Some(now);
                return Err(e);
            }
        };

        let corrections: Vec<(&poll::Model, Correction)> = polls
            .iter()
            .filter_map(|poll| required_correction(poll, now).map(|c| (poll, c)))
            .collect();

        let mut report = TickReport {
            evaluated: polls.len(),
            attempted: corrections.len(),
            ..TickReport::default()
        };

        let outcomes = join_all(
            corrections
                .into_iter()
                .map(|(poll, correction)| self.apply(poll, correction)),
        )
        .await;

        for outcome in outcomes {
            match outcome {
                Some(Correction::Activate) => report.activated += 1,
                Some(Correction::Deactivate) => report.deactivated += 1,
                None => report.failed += 1,
            }
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.ticks += 1;
        state.last_tick_at = Some(now);
        state.last_report = Some(report);

        Ok(report)
    }

    /// Write one correction. Returns `None` when the store rejected it.
    async fn apply(&self, poll: &poll::Model, correction: Correction) -> Option<Correction> {
        let target = correction.target_flag();

        let updated = match self
            .store
            .update_poll(poll.id, PollPatch::active(target))
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                tracing::error!(
                    poll_id = poll.id,
                    title = %poll.title,
                    is_active = target,
                    transient = e.is_transient(),
                    error = %e,
                    "Failed to update poll flag"
                );
                return None;
            }
        };

        let notified = match correction {
            Correction::Activate => {
                tracing::info!(poll_id = poll.id, title = %poll.title, "Activated poll");
                self.listener.on_poll_activated(&updated).await
            }
            Correction::Deactivate => {
                tracing::info!(poll_id = poll.id, title = %poll.title, "Deactivated poll");
                self.listener.on_poll_deactivated(&updated).await
            }
        };
        if let Err(e) = notified {
            tracing::warn!(poll_id = poll.id, error = %e, "Poll lifecycle listener failed");
        }

        Some(correction)
    }

    async fn run_scheduled_tick(&self) {
        let now = self.clock.now();
        match self.tick(now).await {
            Ok(report) if report.attempted > 0 => {
                tracing::info!(
                    evaluated = report.evaluated,
                    attempted = report.attempted,
                    failed = report.failed,
                    "Processed poll updates"
                );
            }
            Ok(report) => {
                tracing::debug!(evaluated = report.evaluated, "No poll updates needed");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to list polls for reconciliation");
            }
        }
    }
}

/// Periodic reconciliation of poll flags against poll windows.
pub struct PollScheduler {
    inner: Arc<SchedulerInner>,
    config: SchedulerConfig,
    task: Mutex<Option<PeriodicTask>>,
}

impl PollScheduler {
    /// Create a scheduler that logs lifecycle changes.
    #[must_use]
    pub fn new(config: SchedulerConfig, store: SharedPollStore, clock: SharedClock) -> Self {
        Self::with_listener(config, store, clock, Arc::new(LoggingListener))
    }

    /// Create a scheduler that reports lifecycle changes to `listener`.
    #[must_use]
    pub fn with_listener(
        config: SchedulerConfig,
        store: SharedPollStore,
        clock: SharedClock,
        listener: Arc<dyn PollLifecycleListener>,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                clock,
                listener,
                tick_lock: tokio::sync::Mutex::new(()),
                state: Mutex::new(SchedulerState::default()),
            }),
            config,
            task: Mutex::new(None),
        }
    }

    /// Run one reconciliation tick as of `now`.
    ///
    /// Waits for any tick already in progress. Fails only when the poll list
    /// cannot be read; individual update failures are counted in the report.
    pub async fn tick(&self, now: DateTime<Utc>) -> AppResult<TickReport> {
        self.inner.tick(now).await
    }

    /// Start ticking every `check_interval`, beginning immediately.
    ///
    /// Does nothing if already running. Fails when the interval is zero or
    /// there is no Tokio runtime to run on.
    pub fn start(&self) -> AppResult<()> {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            tracing::debug!("Poll scheduler is already running");
            return Ok(());
        }

        let inner = self.inner.clone();
        *task = Some(PeriodicTask::spawn(
            "poll-scheduler",
            self.config.check_interval,
            move || {
                let inner = inner.clone();
                async move { inner.run_scheduled_tick().await }
            },
        )?);

        tracing::info!(
            interval_secs = self.config.check_interval.as_secs(),
            "Starting poll scheduler"
        );
        Ok(())
    }

    /// Stop the timer. A tick in progress still completes.
    ///
    /// Safe to call repeatedly or when never started.
    pub fn stop(&self) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            drop(task.cancel());
            tracing::info!("Poll scheduler stopped");
        }
    }

    /// Stop the timer and wait for a tick in progress to finish.
    pub async fn shutdown(&self) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.cancel().await {
                tracing::error!(error = %e, "Poll scheduler task failed");
            }
            tracing::info!("Poll scheduler stopped");
        }
    }

    /// Whether the timer is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Snapshot of the tick bookkeeping.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
