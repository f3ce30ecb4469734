//! Derived poll status.
//!
//! A poll's presented state is computed from its administrative flag and its
//! window on every read; nothing here is persisted. The scheduler and every
//! status display share these functions so they can never disagree.

use chrono::{DateTime, Duration, Utc};
use eventpoll_db::entities::poll;
use serde::Serialize;

/// Presented state of a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    /// The administrative flag is off.
    Inactive,
    /// Flagged on, window not yet open.
    Scheduled,
    /// Flagged on and inside the window.
    Active,
    /// Flagged on, window already closed.
    Ended,
}

impl PollStatus {
    /// Short display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Inactive => "Inactive",
            Self::Scheduled => "Scheduled",
            Self::Active => "Active",
            Self::Ended => "Ended",
        }
    }

    /// One-sentence description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Inactive => "This poll is not active",
            Self::Scheduled => "This poll has not started yet",
            Self::Active => "This poll is currently accepting votes",
            Self::Ended => "This poll has ended",
        }
    }
}

/// Direction of the next automatic flag change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// The window opens.
    Activate,
    /// The window closes.
    Deactivate,
}

/// Time remaining until the next automatic transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUntilChange {
    pub kind: ChangeKind,
    pub duration: Duration,
}

impl TimeUntilChange {
    /// Countdown text, e.g. `Starts in 1d 2h 5m` or `Ends in 4m`.
    #[must_use]
    pub fn message(&self) -> String {
        let prefix = match self.kind {
            ChangeKind::Activate => "Starts in",
            ChangeKind::Deactivate => "Ends in",
        };
        format!("{prefix} {}", format_remaining(self.duration))
    }
}

/// Result of [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub status: PollStatus,
    pub time_until_change: Option<TimeUntilChange>,
}

/// Flag change needed to bring a poll in line with its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Correction {
    /// Set `is_active = true`.
    Activate,
    /// Set `is_active = false`.
    Deactivate,
}

impl Correction {
    /// The flag value this correction writes.
    #[must_use]
    pub const fn target_flag(self) -> bool {
        matches!(self, Self::Activate)
    }
}

/// A poll's window in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollWindow {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl PollWindow {
    /// Extract the window of a stored poll.
    #[must_use]
    pub fn of(poll: &poll::Model) -> Self {
        Self {
            start: poll.start_date.with_timezone(&Utc),
            end: poll.end_date.map(|end| end.with_timezone(&Utc)),
        }
    }

    /// Whether `now` lies in `[start, end]` (open-ended when `end` is absent).
    #[must_use]
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        now >= self.start && self.end.is_none_or(|end| now <= end)
    }

    /// Whether the window closed strictly before `now`.
    #[must_use]
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end.is_some_and(|end| now > end)
    }
}

/// Derive the presented status of `poll` at `now`.
///
/// The administrative flag wins: an unflagged poll is `Inactive` whatever its
/// dates say.
#[must_use]
pub fn evaluate(poll: &poll::Model, now: DateTime<Utc>) -> StatusReport {
    let window = PollWindow::of(poll);

    if !poll.is_active {
        return StatusReport {
            status: PollStatus::Inactive,
            time_until_change: None,
        };
    }

    if now < window.start {
        return StatusReport {
            status: PollStatus::Scheduled,
            time_until_change: Some(TimeUntilChange {
                kind: ChangeKind::Activate,
                duration: window.start - now,
            }),
        };
    }

    if window.has_ended(now) {
        return StatusReport {
            status: PollStatus::Ended,
            time_until_change: None,
        };
    }

    StatusReport {
        status: PollStatus::Active,
        time_until_change: window.end.map(|end| TimeUntilChange {
            kind: ChangeKind::Deactivate,
            duration: end - now,
        }),
    }
}

/// Whether `poll` is accepting votes at `now`.
#[must_use]
pub fn is_live(poll: &poll::Model, now: DateTime<Utc>) -> bool {
    evaluate(poll, now).status == PollStatus::Active
}

/// The flag change the scheduler should apply to `poll` at `now`, if any.
///
/// Activation: flag off, window open. Deactivation: flag on, window closed.
/// The two rules key off opposite flag values so at most one applies.
#[must_use]
pub fn required_correction(poll: &poll::Model, now: DateTime<Utc>) -> Option<Correction> {
    let window = PollWindow::of(poll);

    if !poll.is_active && window.contains(now) {
        Some(Correction::Activate)
    } else if poll.is_active && window.has_ended(now) {
        Some(Correction::Deactivate)
    } else {
        None
    }
}

/// Render a duration as `1d 2h 5m`, `3h 0m` or `4m` (minutes rounded down).
#[must_use]
pub fn format_remaining(duration: Duration) -> String {
    let total_minutes = duration.num_minutes().max(0);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    let days = hours / 24;
    let remaining_hours = hours % 24;

    if days > 0 {
        format!("{days}d {remaining_hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
