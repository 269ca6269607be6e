//! Database models
//!
//! Rust structs representing database entities.
//! All models use serde for serialization to the front end.

use crate::error::AppError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Reminder lifecycle: Active → Pending (automatic) → Finished (manual)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReminderStatus {
    /// Default state when a reminder is created
    Active,
    /// The notification window has opened
    Pending,
    /// Set by the user; never changed automatically
    Finished,
}

impl ReminderStatus {
    pub const ALL: [ReminderStatus; 3] = [
        ReminderStatus::Active,
        ReminderStatus::Pending,
        ReminderStatus::Finished,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReminderStatus::Active => "Active",
            ReminderStatus::Pending => "Pending",
            ReminderStatus::Finished => "Finished",
        }
    }

    pub fn is_finished(self) -> bool {
        self == ReminderStatus::Finished
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(ReminderStatus::Active),
            "pending" => Ok(ReminderStatus::Pending),
            "finished" => Ok(ReminderStatus::Finished),
            _ => Err(AppError::InvalidData(format!("Unknown reminder status '{}'", s))),
        }
    }
}

/// How long before the due time the notification fires
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadTime {
    #[default]
    Hour,
    Day,
    Week,
}

impl LeadTime {
    pub const ALL: [LeadTime; 3] = [LeadTime::Hour, LeadTime::Day, LeadTime::Week];

    /// Fixed lead duration in seconds
    pub fn seconds(self) -> i64 {
        match self {
            LeadTime::Hour => 3_600,
            LeadTime::Day => 86_400,
            LeadTime::Week => 604_800,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::seconds(self.seconds())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LeadTime::Hour => "Hour",
            LeadTime::Day => "Day",
            LeadTime::Week => "Week",
        }
    }
}

impl fmt::Display for LeadTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadTime {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept the display names as well as the short "1h"/"1d"/"1w" forms
        match s.trim().to_lowercase().as_str() {
            "hour" | "1h" => Ok(LeadTime::Hour),
            "day" | "1d" => Ok(LeadTime::Day),
            "week" | "1w" => Ok(LeadTime::Week),
            _ => Err(AppError::InvalidData(format!(
                "Unknown lead time '{}'. Use hour, day or week",
                s
            ))),
        }
    }
}

/// A timed reminder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub title: String,
    pub notes: String,
    pub due_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: ReminderStatus,
    pub notify_before: LeadTime,
}

/// Raw row as stored in SQLite; enums are kept as text
#[derive(Debug, Clone, FromRow)]
pub struct ReminderRow {
    pub id: String,
    pub title: String,
    pub notes: String,
    pub due_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: String,
    pub notify_before: String,
}

impl TryFrom<ReminderRow> for Reminder {
    type Error = AppError;

    fn try_from(row: ReminderRow) -> Result<Self, Self::Error> {
        Ok(Reminder {
            status: row.status.parse()?,
            notify_before: row.notify_before.parse()?,
            id: row.id,
            title: row.title,
            notes: row.notes,
            due_at: row.due_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Create reminder request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReminderRequest {
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub due_at: DateTime<Utc>,
    #[serde(default)]
    pub notify_before: LeadTime,
    /// Initial status; the add form defaults to Active
    #[serde(default)]
    pub status: Option<ReminderStatus>,
}

/// Update reminder request; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReminderRequest {
    pub id: String,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub status: Option<ReminderStatus>,
    pub notify_before: Option<LeadTime>,
}
