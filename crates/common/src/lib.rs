//! Common utilities and shared types for eventpoll-rs.
//!
//! This crate provides foundational components used across all eventpoll-rs crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Clock**: Injectable time source via [`Clock`], with [`SystemClock`] for
//!   production and [`ManualClock`] for deterministic tests
//!
//! # Example
//!
//! ```no_run
//! use eventpoll_common::{AppResult, Clock, Config, SystemClock};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let now = SystemClock.now();
//!     println!("Scheduler runs every {}s (now: {now})", config.scheduler.check_interval_secs);
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::Config;
pub use error::{AppError, AppResult};
