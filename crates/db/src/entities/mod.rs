//! Database entities.

#![allow(missing_docs)]

pub mod poll;
pub mod poll_option;
pub mod poll_response;

pub use poll::Entity as Poll;
pub use poll_option::Entity as PollOption;
pub use poll_response::Entity as PollResponse;
