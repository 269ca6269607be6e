use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Identity of an armed alert, derived only from the reminder id so a
/// re-schedule after an edit replaces the previous alert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AlertId(String);

impl AlertId {
    pub fn for_reminder(reminder_id: &str) -> Self {
        AlertId(format!("reminder-{}", reminder_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A future local notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub id: AlertId,
    pub reminder_id: String,
    pub fire_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
}

/// Callbacks from the platform back into the application
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertEvent {
    /// The alert was presented to the user
    Delivered {
        reminder_id: String,
        fired_at: DateTime<Utc>,
    },
    /// The user tapped a presented alert
    Activated { reminder_id: String },
}

/// Operating-system alert facility
#[async_trait]
pub trait AlertPlatform: Send + Sync {
    /// Ask for permission to present alerts; `false` means denied
    async fn request_permission(&self) -> Result<bool>;

    /// Arm an alert. An alert already armed under the same id is replaced.
    async fn arm(&self, alert: Alert) -> Result<()>;

    /// Cancel an alert; unknown ids are ignored
    async fn cancel(&self, id: &AlertId) -> Result<()>;

    /// Alerts currently armed and not yet delivered
    async fn armed(&self) -> Vec<Alert>;
}
