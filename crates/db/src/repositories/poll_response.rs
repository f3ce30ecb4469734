//! Poll response repository.

use std::sync::Arc;

use crate::entities::{PollResponse, poll_response};
use eventpoll_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Poll response repository for database operations.
#[derive(Clone)]
pub struct PollResponseRepository {
    db: Arc<DatabaseConnection>,
}

impl PollResponseRepository {
    /// Create a new poll response repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// List every response of a poll, oldest first.
    pub async fn find_by_poll(&self, poll_id: i64) -> AppResult<Vec<poll_response::Model>> {
        PollResponse::find()
            .filter(poll_response::Column::PollId.eq(poll_id))
            .order_by_asc(poll_response::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
