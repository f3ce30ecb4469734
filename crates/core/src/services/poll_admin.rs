//! Administrative poll operations.
//!
//! Manual overrides write the flag directly and bypass the window check; the
//! query helpers report what the scheduler is about to do.

use chrono::Duration;
use eventpoll_common::{AppError, AppResult, SharedClock};
use eventpoll_db::entities::poll;
use serde::Serialize;

use super::poll_analytics::PollAnalytics;
use super::poll_status::{self, PollWindow, StatusReport};
use crate::store::{OptionFilter, PollFilter, PollPatch, ResponseFilter, SharedPollStore};

/// Polls whose flag is expected to change within a look-ahead window.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpcomingChanges {
    pub activating: Vec<poll::Model>,
    pub deactivating: Vec<poll::Model>,
}

/// Service for administrator-driven poll operations.
#[derive(Clone)]
pub struct PollAdminService {
    store: SharedPollStore,
    clock: SharedClock,
}

impl PollAdminService {
    /// Create a new poll admin service.
    #[must_use]
    pub fn new(store: SharedPollStore, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Force a poll open regardless of its window.
    pub async fn activate(&self, poll_id: i64) -> AppResult<poll::Model> {
        self.set_flag(poll_id, true).await
    }

    /// Force a poll closed regardless of its window.
    pub async fn deactivate(&self, poll_id: i64) -> AppResult<poll::Model> {
        self.set_flag(poll_id, false).await
    }

    async fn set_flag(&self, poll_id: i64, is_active: bool) -> AppResult<poll::Model> {
        match self
            .store
            .update_poll(poll_id, PollPatch::active(is_active))
            .await
        {
            Ok(poll) => {
                tracing::info!(poll_id, is_active, "Manually updated poll flag");
                Ok(poll)
            }
            Err(e) => {
                if e.is_server_error() {
                    tracing::error!(poll_id, is_active, error = %e, "Manual poll override failed");
                } else {
                    tracing::warn!(poll_id, is_active, error = %e, "Manual poll override rejected");
                }
                Err(e)
            }
        }
    }

    /// Get a poll by ID.
    pub async fn get_poll(&self, poll_id: i64) -> AppResult<poll::Model> {
        self.store
            .list_polls(PollFilter::Id(poll_id))
            .await?
            .into_iter()
            .next()
            .ok_or(AppError::PollNotFound(poll_id))
    }

    /// Derived status of a poll right now.
    pub async fn status(&self, poll_id: i64) -> AppResult<StatusReport> {
        let poll = self.get_poll(poll_id).await?;
        Ok(poll_status::evaluate(&poll, self.clock.now()))
    }

    /// Whether a poll is accepting votes right now; `false` for unknown ids.
    pub async fn check_poll_status(&self, poll_id: i64) -> AppResult<bool> {
        let polls = self.store.list_polls(PollFilter::Id(poll_id)).await?;
        Ok(polls
            .first()
            .is_some_and(|poll| poll_status::is_live(poll, self.clock.now())))
    }

    /// Polls that will open or close within `window` from now.
    ///
    /// Only polls whose flag already matches the transition are reported: an
    /// unflagged poll about to start, or a flagged poll about to end.
    pub async fn upcoming_changes(&self, window: Duration) -> AppResult<UpcomingChanges> {
        let polls = self.store.list_polls(PollFilter::All).await?;
        let now = self.clock.now();
        let horizon = now + window;

        let mut changes = UpcomingChanges::default();
        for poll in polls {
            let poll_window = PollWindow::of(&poll);

            if !poll.is_active && poll_window.start > now && poll_window.start <= horizon {
                changes.activating.push(poll);
            } else if poll.is_active
                && poll_window
                    .end
                    .is_some_and(|end| end > now && end <= horizon)
            {
                changes.deactivating.push(poll);
            }
        }

        Ok(changes)
    }

    /// Full analytics over every response of a poll.
    pub async fn analytics(&self, poll_id: i64) -> AppResult<PollAnalytics> {
        let options = self
            .store
            .list_options(OptionFilter::for_poll(poll_id))
            .await?;
        let responses = self
            .store
            .list_responses(ResponseFilter::PollId(poll_id))
            .await?;
        Ok(PollAnalytics::compute(&options, &responses))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::poll_status::PollStatus;
    use crate::test_utils::{InMemoryPollStore, option_fixture, poll_fixture, response_fixture};
    use chrono::{TimeZone, Utc};
    use eventpoll_common::{Clock, ManualClock};
    use std::sync::Arc;

    fn setup() -> (Arc<InMemoryPollStore>, ManualClock, PollAdminService) {
        let store = Arc::new(InMemoryPollStore::new());
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap());
        let service = PollAdminService::new(store.clone(), Arc::new(clock.clone()));
        (store, clock, service)
    }

    #[tokio::test]
    async fn test_manual_activate_ignores_window() {
        let (store, clock, service) = setup();
        let now = clock.now();
        store.insert_poll(poll_fixture(1, false, now + Duration::days(2), None));

        let poll = service.activate(1).await.unwrap();

        assert!(poll.is_active);
        assert!(store.poll(1).unwrap().is_active);
        assert_eq!(service.status(1).await.unwrap().status, PollStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_manual_deactivate_live_poll() {
        let (store, clock, service) = setup();
        let now = clock.now();
        store.insert_poll(poll_fixture(2, true, now - Duration::hours(1), None));
        assert!(service.check_poll_status(2).await.unwrap());

        service.deactivate(2).await.unwrap();

        assert!(!service.check_poll_status(2).await.unwrap());
        assert_eq!(service.status(2).await.unwrap().status, PollStatus::Inactive);
    }

    #[tokio::test]
    async fn test_override_unknown_poll_is_error() {
        let (_store, _clock, service) = setup();

        let result = service.activate(404).await;

        assert!(matches!(result, Err(AppError::PollNotFound(404))));
    }

    #[tokio::test]
    async fn test_override_surfaces_store_failure() {
        let (store, clock, service) = setup();
        store.insert_poll(poll_fixture(3, false, clock.now(), None));
        store.fail_updates_for(3);

        let result = service.activate(3).await;

        assert!(matches!(result, Err(AppError::Store(_))));
        assert!(!store.poll(3).unwrap().is_active);
    }

    #[tokio::test]
    async fn test_check_status_unknown_poll_is_false() {
        let (_store, _clock, service) = setup();
        assert!(!service.check_poll_status(9).await.unwrap());
        assert!(matches!(
            service.status(9).await,
            Err(AppError::PollNotFound(9))
        ));
    }

    #[tokio::test]
    async fn test_upcoming_changes() {
        let (store, clock, service) = setup();
        let now = clock.now();
        // Opens in 30 minutes, not yet flagged
        store.insert_poll(poll_fixture(1, false, now + Duration::minutes(30), None));
        // Opens in 3 hours, outside the window
        store.insert_poll(poll_fixture(2, false, now + Duration::hours(3), None));
        // Closes in 45 minutes
        store.insert_poll(poll_fixture(
            3,
            true,
            now - Duration::hours(1),
            Some(now + Duration::minutes(45)),
        ));
        // Already closed
        store.insert_poll(poll_fixture(
            4,
            true,
            now - Duration::hours(2),
            Some(now - Duration::minutes(1)),
        ));
        // Flagged and starting soon: nothing will change
        store.insert_poll(poll_fixture(5, true, now + Duration::minutes(10), None));

        let changes = service.upcoming_changes(Duration::minutes(60)).await.unwrap();

        let activating: Vec<i64> = changes.activating.iter().map(|p| p.id).collect();
        let deactivating: Vec<i64> = changes.deactivating.iter().map(|p| p.id).collect();
        assert_eq!(activating, vec![1]);
        assert_eq!(deactivating, vec![3]);
    }

    #[tokio::test]
    async fn test_upcoming_changes_propagates_errors() {
        let (store, _clock, service) = setup();
        store.set_fail_reads(true);

        assert!(service.upcoming_changes(Duration::minutes(60)).await.is_err());
    }

    #[tokio::test]
    async fn test_analytics_reads_store() {
        let (store, clock, service) = setup();
        let now = clock.now();
        store.insert_poll(poll_fixture(1, true, now, None));
        store.insert_option(option_fixture(10, 1, "Yes", 0));
        store.insert_option(option_fixture(11, 1, "No", 1));
        store.insert_response(response_fixture(1, 1, 10, Some("a"), now));
        store.insert_response(response_fixture(2, 1, 11, Some("b"), now));
        store.insert_response(response_fixture(3, 1, 10, Some("b"), now));

        let analytics = service.analytics(1).await.unwrap();

        assert_eq!(analytics.total_responses, 3);
        assert_eq!(analytics.unique_voters, 2);
        assert_eq!(analytics.option_stats[0].option.id, 10);
    }
}
