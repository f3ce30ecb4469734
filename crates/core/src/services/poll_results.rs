//! Live poll results.
//!
//! A [`VoteAggregator`] is one viewer session over one poll. Each refresh
//! re-reads every response, recounts per option and compares the counts with
//! the session's previous refresh to derive a trend.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use eventpoll_common::{AppResult, SharedClock};
use eventpoll_db::entities::{poll, poll_option, poll_response};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::store::{ResponseFilter, SharedPollStore};

/// Direction of an option's count since the previous refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    /// Compare a count against the previous refresh.
    #[must_use]
    pub fn between(previous: u64, current: u64) -> Self {
        match current.cmp(&previous) {
            std::cmp::Ordering::Greater => Self::Up,
            std::cmp::Ordering::Less => Self::Down,
            std::cmp::Ordering::Equal => Self::Stable,
        }
    }
}

/// Per-option result line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionStat {
    pub option: poll_option::Model,
    pub count: u64,
    pub percentage: f64,
    pub trend: Trend,
    pub previous_count: u64,
}

/// Outcome of one successful refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSnapshot {
    pub poll_id: i64,
    pub stats: Vec<OptionStat>,
    pub total_responses: u64,
    pub last_updated: DateTime<Utc>,
}

/// Count responses per option id.
#[must_use]
pub fn count_by_option(responses: &[poll_response::Model]) -> HashMap<i64, u64> {
    let mut counts = HashMap::new();
    for response in responses {
        *counts.entry(response.poll_option_id).or_insert(0) += 1;
    }
    counts
}

/// Build the sorted result lines for `options`.
///
/// Every option appears, including those without votes. Percentages are
/// relative to `total_responses` and are all zero when there are none. The
/// list is ordered by count, highest first; equal counts keep option order.
#[must_use]
pub fn compute_option_stats(
    options: &[poll_option::Model],
    counts: &HashMap<i64, u64>,
    previous_counts: &HashMap<i64, u64>,
    total_responses: u64,
) -> Vec<OptionStat> {
    let mut stats: Vec<OptionStat> = options
        .iter()
        .map(|option| {
            let count = counts.get(&option.id).copied().unwrap_or(0);
            let previous_count = previous_counts.get(&option.id).copied().unwrap_or(0);
            let percentage = if total_responses == 0 {
                0.0
            } else {
                count as f64 / total_responses as f64 * 100.0
            };

            OptionStat {
                option: option.clone(),
                count,
                percentage,
                trend: Trend::between(previous_count, count),
                previous_count,
            }
        })
        .collect();

    stats.sort_by(|a, b| b.count.cmp(&a.count));
    stats
}

#[derive(Default)]
struct SessionState {
    poll_id: Option<i64>,
    previous_counts: HashMap<i64, u64>,
    last_snapshot: Option<ResultsSnapshot>,
}

/// One viewer's live results session.
///
/// Refreshes are serialized: a refresh holds the session for the whole
/// fetch, recount and snapshot swap, so a manual refresh issued during a
/// timer-driven one waits for it. Separate sessions share nothing.
pub struct VoteAggregator {
    store: SharedPollStore,
    clock: SharedClock,
    state: Mutex<SessionState>,
}

impl VoteAggregator {
    /// Create a new session with empty history.
    #[must_use]
    pub fn new(store: SharedPollStore, clock: SharedClock) -> Self {
        Self {
            store,
            clock,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Re-read the responses of `poll` and recompute its results.
    ///
    /// Only responses for `options` make up the total, so the percentages of
    /// a non-empty result always add up to 100.
    ///
    /// On a store error the session is left exactly as it was, so
    /// [`Self::last_snapshot`] keeps returning the last good results.
    pub async fn refresh(
        &self,
        poll: &poll::Model,
        options: &[poll_option::Model],
    ) -> AppResult<ResultsSnapshot> {
        let mut state = self.state.lock().await;

        let responses = match self
            .store
            .list_responses(ResponseFilter::PollId(poll.id))
            .await
        {
            Ok(responses) => responses,
            Err(e) => {
                tracing::warn!(poll_id = poll.id, error = %e, "Failed to load poll responses");
                return Err(e);
            }
        };

        // History from another poll would only produce bogus trends
        if state.poll_id != Some(poll.id) {
            state.previous_counts.clear();
            state.poll_id = Some(poll.id);
        }

        let counts = count_by_option(&responses);
        // Votes on options outside the displayed set do not count
        let total_responses: u64 = options
            .iter()
            .filter_map(|option| counts.get(&option.id))
            .sum();
        let stats = compute_option_stats(options, &counts, &state.previous_counts, total_responses);

        let snapshot = ResultsSnapshot {
            poll_id: poll.id,
            stats,
            total_responses,
            last_updated: self.clock.now(),
        };

        state.previous_counts = counts;
        state.last_snapshot = Some(snapshot.clone());

        tracing::debug!(poll_id = poll.id, total_responses, "Refreshed poll results");
        Ok(snapshot)
    }

    /// Results of the last successful refresh.
    pub async fn last_snapshot(&self) -> Option<ResultsSnapshot> {
        self.state.lock().await.last_snapshot.clone()
    }

    /// Forget the trend history and the last snapshot.
    pub async fn reset(&self) {
        *self.state.lock().await = SessionState::default();
    }
}
