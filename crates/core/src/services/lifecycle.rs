//! Poll lifecycle notifications.
//!
//! The scheduler reports every flag change it manages to apply through a
//! [`PollLifecycleListener`], so notification delivery can live elsewhere.

use async_trait::async_trait;
use eventpoll_common::AppResult;
use eventpoll_db::entities::poll;

/// Receives automatic lifecycle transitions.
///
/// Called only after the corresponding store update succeeded. A listener
/// error is logged by the caller and never undoes the update.
#[async_trait]
pub trait PollLifecycleListener: Send + Sync {
    /// A poll's window opened and its flag was switched on.
    async fn on_poll_activated(&self, poll: &poll::Model) -> AppResult<()>;

    /// A poll's window closed and its flag was switched off.
    async fn on_poll_deactivated(&self, poll: &poll::Model) -> AppResult<()>;
}

/// Listener that only writes a log line.
#[derive(Clone, Default)]
pub struct LoggingListener;

#[async_trait]
impl PollLifecycleListener for LoggingListener {
    async fn on_poll_activated(&self, poll: &poll::Model) -> AppResult<()> {
        tracing::info!(poll_id = poll.id, title = %poll.title, "Poll is now active");
        Ok(())
    }

    async fn on_poll_deactivated(&self, poll: &poll::Model) -> AppResult<()> {
        tracing::info!(poll_id = poll.id, title = %poll.title, "Poll has ended");
        Ok(())
    }
}
