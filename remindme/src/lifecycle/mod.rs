//! Reminder status lifecycle
//!
//! Pure rules deciding which status a reminder should have at a given
//! instant. Nothing here touches the store; callers persist the result
//! when it differs from the stored value.
//!
//! Automatic transitions only ever move `Active → Pending`. `Finished`
//! is terminal and is set by the user, never by this module.

pub mod progress;

pub use progress::{format_time_remaining, progress, time_remaining, ProgressBand};

use crate::database::{Reminder, ReminderStatus};
use chrono::{DateTime, Utc};

/// Start of the pending window: `due_at - lead duration`
pub fn notify_threshold(reminder: &Reminder) -> DateTime<Utc> {
    reminder.due_at - reminder.notify_before.duration()
}

/// Whether `now` falls inside `[threshold, due_at]`, both ends inclusive
pub fn is_in_notify_window(reminder: &Reminder, now: DateTime<Utc>) -> bool {
    notify_threshold(reminder) <= now && now <= reminder.due_at
}

/// Status the reminder should have at `now` under the automatic rules.
///
/// A reminder whose due time precedes its creation time gets the same
/// literal rule; it may compute as `Pending` immediately or stay `Active`.
pub fn compute_status(reminder: &Reminder, now: DateTime<Utc>) -> ReminderStatus {
    match reminder.status {
        ReminderStatus::Active if is_in_notify_window(reminder, now) => ReminderStatus::Pending,
        status => status,
    }
}

/// `Some(new_status)` when the stored status is stale at `now`
pub fn status_change(reminder: &Reminder, now: DateTime<Utc>) -> Option<ReminderStatus> {
    let computed = compute_status(reminder, now);
    (computed != reminder.status).then_some(computed)
}
