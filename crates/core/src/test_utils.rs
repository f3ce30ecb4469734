//! Test utilities for services built on [`PollStore`].
//!
//! [`InMemoryPollStore`] keeps polls, options and responses in memory and can
//! be told to fail or stall individual calls.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventpoll_common::{AppError, AppResult};
use eventpoll_db::entities::{poll, poll_option, poll_response};

use crate::store::{OptionFilter, PollFilter, PollPatch, PollStore, ResponseFilter};

/// In-memory [`PollStore`].
#[derive(Default)]
pub struct InMemoryPollStore {
    polls: Mutex<BTreeMap<i64, poll::Model>>,
    options: Mutex<Vec<poll_option::Model>>,
    responses: Mutex<Vec<poll_response::Model>>,
    failing_updates: Mutex<HashSet<i64>>,
    fail_reads: AtomicBool,
    update_delay: Mutex<Option<StdDuration>>,
    read_delay: Mutex<Option<StdDuration>>,
    update_calls: AtomicUsize,
    list_calls: AtomicUsize,
    reads_in_flight: AtomicUsize,
    max_reads_in_flight: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryPollStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a poll.
    pub fn insert_poll(&self, poll: poll::Model) {
        lock(&self.polls).insert(poll.id, poll);
    }

    /// Insert an option.
    pub fn insert_option(&self, option: poll_option::Model) {
        lock(&self.options).push(option);
    }

    /// Insert a response.
    pub fn insert_response(&self, response: poll_response::Model) {
        lock(&self.responses).push(response);
    }

    /// Remove every response.
    pub fn clear_responses(&self) {
        lock(&self.responses).clear();
    }

    /// Get a poll as currently stored.
    #[must_use]
    pub fn poll(&self, id: i64) -> Option<poll::Model> {
        lock(&self.polls).get(&id).cloned()
    }

    /// Make every update of `id` fail with a transient error.
    pub fn fail_updates_for(&self, id: i64) {
        lock(&self.failing_updates).insert(id);
    }

    /// Let updates of `id` succeed again.
    pub fn heal_updates_for(&self, id: i64) {
        lock(&self.failing_updates).remove(&id);
    }

    /// Make every list call fail with a transient error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Delay every update by `delay`.
    pub fn set_update_delay(&self, delay: Option<StdDuration>) {
        *lock(&self.update_delay) = delay;
    }

    /// Delay every list call by `delay`.
    pub fn set_read_delay(&self, delay: Option<StdDuration>) {
        *lock(&self.read_delay) = delay;
    }

    /// Number of `update_poll` calls so far.
    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Number of `list_polls` calls so far.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Highest number of list calls that were in flight at once.
    #[must_use]
    pub fn max_reads_in_flight(&self) -> usize {
        self.max_reads_in_flight.load(Ordering::SeqCst)
    }

    async fn begin_read(&self) -> AppResult<ReadGuard<'_>> {
        let in_flight = self.reads_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_reads_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);
        let guard = ReadGuard { store: self };

        let delay = *lock(&self.read_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Store("store unavailable".to_string()));
        }
        Ok(guard)
    }
}

struct ReadGuard<'a> {
    store: &'a InMemoryPollStore,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.store.reads_in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PollStore for InMemoryPollStore {
    async fn list_polls(&self, filter: PollFilter) -> AppResult<Vec<poll::Model>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let _guard = self.begin_read().await?;

        let polls = lock(&self.polls);
        Ok(polls
            .values()
            .filter(|p| match filter {
                PollFilter::All => true,
                PollFilter::Id(id) => p.id == id,
                PollFilter::IsActive(is_active) => p.is_active == is_active,
                PollFilter::ActiveOrStartedBy(now) => {
                    p.is_active || p.start_date.with_timezone(&Utc) <= now
                }
            })
            .cloned()
            .collect())
    }

    async fn update_poll(&self, id: i64, patch: PollPatch) -> AppResult<poll::Model> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *lock(&self.update_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if lock(&self.failing_updates).contains(&id) {
            return Err(AppError::Store(format!("update of poll {id} timed out")));
        }

        let mut polls = lock(&self.polls);
        let poll = polls.get_mut(&id).ok_or(AppError::PollNotFound(id))?;
        if let Some(is_active) = patch.is_active {
            poll.is_active = is_active;
            poll.updated_at = Some(Utc::now().into());
        }
        Ok(poll.clone())
    }

    async fn list_responses(&self, filter: ResponseFilter) -> AppResult<Vec<poll_response::Model>> {
        let _guard = self.begin_read().await?;

        let ResponseFilter::PollId(poll_id) = filter;
        Ok(lock(&self.responses)
            .iter()
            .filter(|r| r.poll_id == poll_id)
            .cloned()
            .collect())
    }

    async fn list_options(&self, filter: OptionFilter) -> AppResult<Vec<poll_option::Model>> {
        let _guard = self.begin_read().await?;

        let mut options: Vec<_> = lock(&self.options)
            .iter()
            .filter(|o| o.poll_id == filter.poll_id)
            .filter(|o| filter.is_active.is_none_or(|active| o.is_active == active))
            .cloned()
            .collect();
        options.sort_by_key(|o| (o.display_order, o.id));
        Ok(options)
    }
}

/// Build a poll row for tests.
#[must_use]
pub fn poll_fixture(
    id: i64,
    is_active: bool,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> poll::Model {
    poll::Model {
        id,
        title: format!("Poll {id}"),
        description: None,
        start_date: start.into(),
        end_date: end.map(Into::into),
        is_active,
        max_responses_per_user: 1,
        allow_multiple_choices: false,
        is_anonymous: false,
        results_visible_to: poll::ResultsVisibility::All,
        created_at: start.into(),
        updated_at: None,
    }
}

/// Build an option row for tests.
#[must_use]
pub fn option_fixture(id: i64, poll_id: i64, text: &str, display_order: i32) -> poll_option::Model {
    poll_option::Model {
        id,
        poll_id,
        option_text: text.to_string(),
        display_order,
        is_active: true,
        created_at: Utc::now().into(),
    }
}

/// Build a response row for tests.
#[must_use]
pub fn response_fixture(
    id: i64,
    poll_id: i64,
    poll_option_id: i64,
    user_id: Option<&str>,
    created_at: DateTime<Utc>,
) -> poll_response::Model {
    poll_response::Model {
        id,
        poll_id,
        poll_option_id,
        user_id: user_id.map(str::to_string),
        comment: None,
        response_value: None,
        is_anonymous: user_id.is_none(),
        created_at: created_at.into(),
    }
}
