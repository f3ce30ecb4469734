//! Poll repository.

use std::sync::Arc;

use crate::entities::{Poll, poll};
use chrono::{DateTime, Utc};
use eventpoll_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, Condition, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set,
};

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a poll by ID.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a poll by ID, returning error if not found.
    pub async fn get_by_id(&self, id: i64) -> AppResult<poll::Model> {
        self.find_by_id(id)
            .await?
            .ok_or(AppError::PollNotFound(id))
    }

    /// List every poll, earliest start first.
    pub async fn find_all(&self) -> AppResult<Vec<poll::Model>> {
        Poll::find()
            .order_by_asc(poll::Column::StartDate)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List polls by their administrative flag.
    pub async fn find_by_active(&self, is_active: bool) -> AppResult<Vec<poll::Model>> {
        Poll::find()
            .filter(poll::Column::IsActive.eq(is_active))
            .order_by_asc(poll::Column::StartDate)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List polls that are flagged active or whose window has opened by `now`.
    ///
    /// Every poll that may need a corrective flag change is in this set.
    pub async fn find_reconcilable(&self, now: DateTime<Utc>) -> AppResult<Vec<poll::Model>> {
        Poll::find()
            .filter(
                Condition::any()
                    .add(poll::Column::IsActive.eq(true))
                    .add(poll::Column::StartDate.lte(now)),
            )
            .order_by_asc(poll::Column::StartDate)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Write only the `is_active` flag (and `updated_at`) of one poll.
    pub async fn set_active(&self, id: i64, is_active: bool) -> AppResult<poll::Model> {
        let model = poll::ActiveModel {
            id: Unchanged(id),
            is_active: Set(is_active),
            updated_at: Set(Some(Utc::now().into())),
            ..Default::default()
        };

        model.update(self.db.as_ref()).await.map_err(|e| match e {
            DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => AppError::PollNotFound(id),
            other => AppError::Database(other.to_string()),
        })
    }
}
