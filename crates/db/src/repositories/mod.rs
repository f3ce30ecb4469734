//! Database repositories.

pub mod poll;
pub mod poll_option;
pub mod poll_response;

pub use poll::PollRepository;
pub use poll_option::PollOptionRepository;
pub use poll_response::PollResponseRepository;
