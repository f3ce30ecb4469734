//! Background tasks for eventpoll-rs.
//!
//! - **Scheduler**: periodic reconciliation of poll flags with poll windows
//! - **Results feed**: timer-driven live results for one viewer session

mod periodic;
pub mod feed;
pub mod scheduler;

pub use feed::{ResultsFeed, ResultsFeedConfig};
pub use scheduler::{PollScheduler, SchedulerConfig, SchedulerState, TickReport};
