//! Progress and time-remaining derivation for display

use crate::config::{PROGRESS_EARLY_LIMIT, PROGRESS_MIDWAY_LIMIT};
use crate::database::Reminder;
use chrono::{DateTime, Duration, Utc};

const SECS_PER_DAY: i64 = 86_400;
const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_MINUTE: i64 = 60;

/// Fraction of the creation-to-due span that has elapsed, in `[0, 1]`.
///
/// A zero or negative span counts as fully elapsed.
pub fn progress(reminder: &Reminder, now: DateTime<Utc>) -> f64 {
    let total = (reminder.due_at - reminder.created_at).num_milliseconds();
    if total <= 0 {
        return 1.0;
    }

    let elapsed = (now - reminder.created_at).num_milliseconds();
    (elapsed as f64 / total as f64).clamp(0.0, 1.0)
}

/// Coarse progress bucket used to color progress bars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressBand {
    Early,
    Midway,
    Late,
}

impl ProgressBand {
    pub fn from_progress(progress: f64) -> Self {
        if progress < PROGRESS_EARLY_LIMIT {
            ProgressBand::Early
        } else if progress < PROGRESS_MIDWAY_LIMIT {
            ProgressBand::Midway
        } else {
            ProgressBand::Late
        }
    }
}

/// Time left until due, never negative
pub fn time_remaining(reminder: &Reminder, now: DateTime<Utc>) -> Duration {
    (reminder.due_at - now).max(Duration::zero())
}

/// Render a remaining duration as "2d 3h left", "5h 12m left" or "0m left"
pub fn format_time_remaining(remaining: Duration) -> String {
    let secs = remaining.num_seconds().max(0);

    let days = secs / SECS_PER_DAY;
    let hours = (secs % SECS_PER_DAY) / SECS_PER_HOUR;
    let minutes = (secs % SECS_PER_HOUR) / SECS_PER_MINUTE;

    if days > 0 {
        format!("{}d {}h left", days, hours)
    } else if hours > 0 {
        format!("{}h {}m left", hours, minutes)
    } else {
        format!("{}m left", minutes)
    }
}
