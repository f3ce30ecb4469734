//! Business logic services.

#![allow(missing_docs)]

pub mod lifecycle;
pub mod poll_admin;
pub mod poll_analytics;
pub mod poll_results;
pub mod poll_status;

pub use lifecycle::{LoggingListener, PollLifecycleListener};
pub use poll_admin::{PollAdminService, UpcomingChanges};
pub use poll_analytics::{HourBucket, OptionAnalytics, PollAnalytics};
pub use poll_results::{OptionStat, ResultsSnapshot, Trend, VoteAggregator};
pub use poll_status::{
    ChangeKind, Correction, PollStatus, PollWindow, StatusReport, TimeUntilChange, evaluate,
    is_live, required_correction,
};
