//! Core business logic for eventpoll-rs.
//!
//! - [`store`]: the narrow persistence contract every service goes through
//! - [`services::poll_status`]: derived status of a poll at an instant
//! - [`services::poll_admin`]: manual overrides and lifecycle queries
//! - [`services::poll_results`]: per-session live results with trends
//! - [`services::poll_analytics`]: full-response analytics

pub mod services;
pub mod store;
pub mod test_utils;

pub use services::*;
pub use store::{
    DbPollStore, OptionFilter, PollFilter, PollPatch, PollStore, ResponseFilter, SharedPollStore,
};
