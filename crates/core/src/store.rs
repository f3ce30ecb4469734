//! Poll store contract.
//!
//! The lifecycle scheduler, manual overrides and the results aggregator only
//! ever talk to persistence through [`PollStore`]. [`DbPollStore`] is the
//! sea-orm backed implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventpoll_common::AppResult;
use eventpoll_db::{
    entities::{poll, poll_option, poll_response},
    repositories::{PollOptionRepository, PollRepository, PollResponseRepository},
};
use sea_orm::DatabaseConnection;

/// Filter for [`PollStore::list_polls`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollFilter {
    /// Every poll.
    All,
    /// `id.equals`
    Id(i64),
    /// `isActive.equals`
    IsActive(bool),
    /// Polls flagged active, or whose start date is at or before the instant.
    ActiveOrStartedBy(DateTime<Utc>),
}

/// Filter for [`PollStore::list_responses`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFilter {
    /// `pollId.equals`
    PollId(i64),
}

/// Filter for [`PollStore::list_options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionFilter {
    /// `pollId.equals`
    pub poll_id: i64,
    /// `isActive.equals`, when set.
    pub is_active: Option<bool>,
}

impl OptionFilter {
    /// All options of a poll.
    #[must_use]
    pub const fn for_poll(poll_id: i64) -> Self {
        Self {
            poll_id,
            is_active: None,
        }
    }

    /// Only enabled options of a poll.
    #[must_use]
    pub const fn active_for_poll(poll_id: i64) -> Self {
        Self {
            poll_id,
            is_active: Some(true),
        }
    }
}

/// Fields of a partial poll update. Unset fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollPatch {
    /// New administrative flag.
    pub is_active: Option<bool>,
}

impl PollPatch {
    /// A patch that only sets `is_active`.
    #[must_use]
    pub const fn active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
        }
    }
}

/// Narrow query/update contract over poll persistence.
///
/// Implementations must make [`PollStore::update_poll`] safe to call
/// concurrently for different ids.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// List polls matching `filter`. Order is not significant.
    async fn list_polls(&self, filter: PollFilter) -> AppResult<Vec<poll::Model>>;

    /// Apply a partial update to one poll and return the stored result.
    async fn update_poll(&self, id: i64, patch: PollPatch) -> AppResult<poll::Model>;

    /// List responses matching `filter`.
    async fn list_responses(&self, filter: ResponseFilter) -> AppResult<Vec<poll_response::Model>>;

    /// List options matching `filter`, in display order.
    async fn list_options(&self, filter: OptionFilter) -> AppResult<Vec<poll_option::Model>>;
}

/// Shared store handle.
pub type SharedPollStore = Arc<dyn PollStore>;

/// [`PollStore`] backed by the database repositories.
#[derive(Clone)]
pub struct DbPollStore {
    poll_repo: PollRepository,
    option_repo: PollOptionRepository,
    response_repo: PollResponseRepository,
}

impl DbPollStore {
    /// Create a store from existing repositories.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        option_repo: PollOptionRepository,
        response_repo: PollResponseRepository,
    ) -> Self {
        Self {
            poll_repo,
            option_repo,
            response_repo,
        }
    }

    /// Create a store and its repositories over one connection.
    #[must_use]
    pub fn from_connection(db: Arc<DatabaseConnection>) -> Self {
        Self::new(
            PollRepository::new(db.clone()),
            PollOptionRepository::new(db.clone()),
            PollResponseRepository::new(db),
        )
    }
}

#[async_trait]
impl PollStore for DbPollStore {
    async fn list_polls(&self, filter: PollFilter) -> AppResult<Vec<poll::Model>> {
        match filter {
            PollFilter::All => self.poll_repo.find_all().await,
            PollFilter::Id(id) => Ok(self.poll_repo.find_by_id(id).await?.into_iter().collect()),
            PollFilter::IsActive(is_active) => self.poll_repo.find_by_active(is_active).await,
            PollFilter::ActiveOrStartedBy(now) => self.poll_repo.find_reconcilable(now).await,
        }
    }

    async fn update_poll(&self, id: i64, patch: PollPatch) -> AppResult<poll::Model> {
        match patch.is_active {
            Some(is_active) => self.poll_repo.set_active(id, is_active).await,
            None => self.poll_repo.get_by_id(id).await,
        }
    }

    async fn list_responses(&self, filter: ResponseFilter) -> AppResult<Vec<poll_response::Model>> {
        match filter {
            ResponseFilter::PollId(poll_id) => self.response_repo.find_by_poll(poll_id).await,
        }
    }

    async fn list_options(&self, filter: OptionFilter) -> AppResult<Vec<poll_option::Model>> {
        match filter.is_active {
            Some(is_active) => {
                self.option_repo
                    .find_by_poll_and_active(filter.poll_id, is_active)
                    .await
            }
            None => self.option_repo.find_by_poll(filter.poll_id).await,
        }
    }
}
