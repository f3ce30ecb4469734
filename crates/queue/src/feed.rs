//! Timer-driven live results for one viewer session.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use eventpoll_common::{AppError, AppResult, SharedClock, config::ResultsSettings};
use eventpoll_core::{OptionFilter, PollFilter, ResultsSnapshot, SharedPollStore, VoteAggregator};
use eventpoll_db::entities::{poll, poll_option};
use tokio::sync::watch;

use crate::periodic::PeriodicTask;

/// Results feed configuration.
#[derive(Debug, Clone)]
pub struct ResultsFeedConfig {
    /// Interval between automatic refreshes (default: 5 seconds).
    pub refresh_interval: Duration,
}

impl Default for ResultsFeedConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_millis(5000),
        }
    }
}

impl From<&ResultsSettings> for ResultsFeedConfig {
    fn from(settings: &ResultsSettings) -> Self {
        Self {
            refresh_interval: Duration::from_millis(settings.refresh_interval_ms),
        }
    }
}

struct FeedInner {
    aggregator: VoteAggregator,
    poll: poll::Model,
    options: Vec<poll_option::Model>,
    snapshots: watch::Sender<Option<ResultsSnapshot>>,
}

impl FeedInner {
    async fn refresh(&self) -> AppResult<ResultsSnapshot> {
        let snapshot = self.aggregator.refresh(&self.poll, &self.options).await?;
        self.snapshots.send_replace(Some(snapshot.clone()));
        Ok(snapshot)
    }
}

/// Live results of one poll for one viewer.
///
/// Owns a single [`VoteAggregator`] session, so trends are relative to what
/// this viewer saw last. Every successful refresh is published to
/// subscribers; a failed one publishes nothing and the previous snapshot
/// stays current.
pub struct ResultsFeed {
    inner: Arc<FeedInner>,
    config: ResultsFeedConfig,
    task: Mutex<Option<PeriodicTask>>,
}

impl ResultsFeed {
    /// Create a feed over an already loaded poll and its options.
    #[must_use]
    pub fn new(
        store: SharedPollStore,
        clock: SharedClock,
        poll: poll::Model,
        options: Vec<poll_option::Model>,
        config: ResultsFeedConfig,
    ) -> Self {
        let (snapshots, _) = watch::channel(None);
        Self {
            inner: Arc::new(FeedInner {
                aggregator: VoteAggregator::new(store, clock),
                poll,
                options,
                snapshots,
            }),
            config,
            task: Mutex::new(None),
        }
    }

    /// Load a poll and its enabled options, then create a feed over them.
    pub async fn load(
        store: SharedPollStore,
        clock: SharedClock,
        poll_id: i64,
        config: ResultsFeedConfig,
    ) -> AppResult<Self> {
        let poll = store
            .list_polls(PollFilter::Id(poll_id))
            .await?
            .into_iter()
            .next()
            .ok_or(AppError::PollNotFound(poll_id))?;
        let options = store
            .list_options(OptionFilter::active_for_poll(poll_id))
            .await?;

        Ok(Self::new(store, clock, poll, options, config))
    }

    /// The poll this feed reports on.
    #[must_use]
    pub fn poll(&self) -> &poll::Model {
        &self.inner.poll
    }

    /// Receive every published snapshot. Starts at the latest one.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<ResultsSnapshot>> {
        self.inner.snapshots.subscribe()
    }

    /// The most recently published snapshot.
    #[must_use]
    pub fn latest(&self) -> Option<ResultsSnapshot> {
        self.inner.snapshots.borrow().clone()
    }

    /// Refresh right away, waiting for a refresh already in progress.
    pub async fn refresh_now(&self) -> AppResult<ResultsSnapshot> {
        self.inner.refresh().await
    }

    /// Start refreshing every `refresh_interval`, beginning immediately.
    ///
    /// Does nothing if auto-refresh is already on.
    pub fn start(&self) -> AppResult<()> {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return Ok(());
        }

        let inner = self.inner.clone();
        *task = Some(PeriodicTask::spawn(
            "results-feed",
            self.config.refresh_interval,
            move || {
                let inner = inner.clone();
                async move {
                    // The aggregator already logged the failure
                    let _ = inner.refresh().await;
                }
            },
        )?);

        tracing::debug!(
            poll_id = self.inner.poll.id,
            interval_ms = self.config.refresh_interval.as_millis() as u64,
            "Results auto-refresh enabled"
        );
        Ok(())
    }

    /// Stop automatic refreshes. Safe to call repeatedly.
    pub fn stop(&self) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            drop(task.cancel());
            tracing::debug!(poll_id = self.inner.poll.id, "Results auto-refresh disabled");
        }
    }

    /// Turn automatic refreshes on or off.
    pub fn set_auto_refresh(&self, enabled: bool) -> AppResult<()> {
        if enabled {
            self.start()
        } else {
            self.stop();
            Ok(())
        }
    }

    /// Whether automatic refreshes are on.
    #[must_use]
    pub fn is_auto_refresh(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }
}

impl Drop for ResultsFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use eventpoll_common::ManualClock;
    use eventpoll_core::Trend;
    use eventpoll_core::test_utils::{
        InMemoryPollStore, option_fixture, poll_fixture, response_fixture,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 4, 10, 0, 0).unwrap()
    }

    fn seeded_store() -> Arc<InMemoryPollStore> {
        let store = Arc::new(InMemoryPollStore::new());
        store.insert_poll(poll_fixture(1, true, now() - ChronoDuration::hours(1), None));
        store.insert_option(option_fixture(10, 1, "Yes", 0));
        store.insert_option(option_fixture(11, 1, "No", 1));
        store
    }

    async fn feed(store: &Arc<InMemoryPollStore>) -> ResultsFeed {
        ResultsFeed::load(
            store.clone(),
            Arc::new(ManualClock::new(now())),
            1,
            ResultsFeedConfig::default(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_load_unknown_poll() {
        let store = seeded_store();

        let result = ResultsFeed::load(
            store,
            Arc::new(ManualClock::new(now())),
            99,
            ResultsFeedConfig::default(),
        )
        .await;

        assert!(matches!(result, Err(AppError::PollNotFound(99))));
    }

    #[tokio::test]
    async fn test_refresh_now_publishes_snapshot() {
        let store = seeded_store();
        store.insert_response(response_fixture(100, 1, 11, Some("u1"), now()));
        let feed = feed(&store).await;
        let mut rx = feed.subscribe();
        assert!(feed.latest().is_none());

        let snapshot = feed.refresh_now().await.unwrap();

        assert!(rx.has_changed().unwrap());
        let published = rx.borrow_and_update().clone().unwrap();
        assert_eq!(published, snapshot);
        assert_eq!(published.total_responses, 1);
        assert_eq!(published.stats[0].option.id, 11);
        assert_eq!(published.stats[0].trend, Trend::Up);
    }

    #[tokio::test]
    async fn test_disabled_option_votes_left_out() {
        let store = Arc::new(InMemoryPollStore::new());
        store.insert_poll(poll_fixture(1, true, now() - ChronoDuration::hours(1), None));
        store.insert_option(option_fixture(10, 1, "Kept", 0));
        let mut retired = option_fixture(11, 1, "Retired", 1);
        retired.is_active = false;
        store.insert_option(retired);
        for id in 0..3 {
            store.insert_response(response_fixture(100 + id, 1, 10, None, now()));
        }
        for id in 0..7 {
            store.insert_response(response_fixture(200 + id, 1, 11, None, now()));
        }
        let feed = feed(&store).await;

        let snapshot = feed.refresh_now().await.unwrap();
        let sum: f64 = snapshot.stats.iter().map(|s| s.percentage).sum();

        assert_eq!(snapshot.stats.len(), 1);
        assert_eq!(snapshot.total_responses, 3);
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_snapshot() {
        let store = seeded_store();
        store.insert_response(response_fixture(100, 1, 10, Some("u1"), now()));
        let feed = feed(&store).await;
        let first = feed.refresh_now().await.unwrap();
        let mut rx = feed.subscribe();

        store.set_fail_reads(true);
        assert!(feed.refresh_now().await.is_err());

        assert!(!rx.has_changed().unwrap());
        assert_eq!(feed.latest(), Some(first));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_refresh_follows_new_votes() {
        let store = seeded_store();
        let feed = feed(&store).await;

        feed.set_auto_refresh(true).unwrap();
        assert!(feed.is_auto_refresh());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(feed.latest().unwrap().total_responses, 0);

        store.insert_response(response_fixture(100, 1, 10, Some("u1"), now()));
        store.insert_response(response_fixture(101, 1, 10, Some("u2"), now()));
        tokio::time::sleep(Duration::from_millis(5000)).await;

        let snapshot = feed.latest().unwrap();
        assert_eq!(snapshot.total_responses, 2);
        assert_eq!(snapshot.stats[0].option.id, 10);
        assert_eq!(snapshot.stats[0].count, 2);
        assert_eq!(snapshot.stats[0].trend, Trend::Up);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabling_auto_refresh_stops_updates() {
        let store = seeded_store();
        let feed = feed(&store).await;
        feed.set_auto_refresh(true).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        feed.set_auto_refresh(false).unwrap();
        feed.stop();
        assert!(!feed.is_auto_refresh());

        store.insert_response(response_fixture(100, 1, 10, Some("u1"), now()));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(feed.latest().unwrap().total_responses, 0);

        // Manual refresh still works with auto-refresh off
        assert_eq!(feed.refresh_now().await.unwrap().total_responses, 1);
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let store = seeded_store();
        let feed = ResultsFeed::load(
            store,
            Arc::new(ManualClock::new(now())),
            1,
            ResultsFeedConfig {
                refresh_interval: Duration::ZERO,
            },
        )
        .await
        .unwrap();

        assert!(matches!(feed.start(), Err(AppError::Config(_))));
        assert!(!feed.is_auto_refresh());
    }

    #[test]
    fn test_config_from_settings() {
        let settings = ResultsSettings {
            refresh_interval_ms: 250,
        };
        assert_eq!(
            ResultsFeedConfig::from(&settings).refresh_interval,
            Duration::from_millis(250)
        );
    }
}
