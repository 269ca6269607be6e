//! Notification scheduling policy
//!
//! Decides whether and when a reminder's alert is armed, keeps at most one
//! live alert per reminder, and turns alert delivery into an explicit
//! status recomputation.

use super::platform::{Alert, AlertId, AlertPlatform};
use crate::clock::Clock;
use crate::database::{Reminder, ReminderStatus, Repository};
use crate::error::Result;
use crate::lifecycle;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Why no alert was armed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InPast,
    NoPermission,
    Finished,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::InPast => "in the past",
            SkipReason::NoPermission => "no permission",
            SkipReason::Finished => "already finished",
        };
        f.write_str(text)
    }
}

/// Result of a scheduling request. Skipping is never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScheduleOutcome {
    Armed { at: DateTime<Utc> },
    Skipped { reason: SkipReason },
}

impl ScheduleOutcome {
    pub fn is_armed(&self) -> bool {
        matches!(self, ScheduleOutcome::Armed { .. })
    }
}

/// Changes made by `sync_alerts`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertSyncReport {
    pub rescheduled: usize,
    pub cancelled: usize,
}

/// Owns the scheduling policy; one instance per process, passed explicitly
#[derive(Clone)]
pub struct NotificationScheduler {
    platform: Arc<dyn AlertPlatform>,
    repo: Repository,
    clock: Arc<dyn Clock>,
    permission: Arc<RwLock<Option<bool>>>,
    /// `updated_at` of each reminder as of its last scheduling decision
    versions: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
}

impl NotificationScheduler {
    pub fn new(platform: Arc<dyn AlertPlatform>, repo: Repository, clock: Arc<dyn Clock>) -> Self {
        Self {
            platform,
            repo,
            clock,
            permission: Arc::new(RwLock::new(None)),
            versions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn platform(&self) -> &Arc<dyn AlertPlatform> {
        &self.platform
    }

    /// Ask the platform for alert permission and remember the answer.
    ///
    /// A failed request counts as denied; status still advances through
    /// reconciliation.
    pub async fn request_permission(&self) -> bool {
        let granted = match self.platform.request_permission().await {
            Ok(granted) => granted,
            Err(e) => {
                tracing::warn!("Error requesting notifications permission: {}", e);
                false
            }
        };

        *self.permission.write().await = Some(granted);
        granted
    }

    async fn has_permission(&self) -> bool {
        let cached = *self.permission.read().await;
        match cached {
            Some(granted) => granted,
            None => self.request_permission().await,
        }
    }

    /// Arm (or re-arm) the alert for `reminder`.
    ///
    /// Any alert previously armed for the same reminder is cancelled first,
    /// whatever the outcome.
    pub async fn schedule(&self, reminder: &Reminder) -> Result<ScheduleOutcome> {
        let alert_id = AlertId::for_reminder(&reminder.id);
        self.platform.cancel(&alert_id).await?;

        let outcome = self.arm_or_skip(reminder, alert_id).await?;
        self.versions
            .write()
            .await
            .insert(reminder.id.clone(), reminder.updated_at);
        Ok(outcome)
    }

    async fn arm_or_skip(&self, reminder: &Reminder, alert_id: AlertId) -> Result<ScheduleOutcome> {
        if !self.has_permission().await {
            tracing::info!(
                "Notifications not permitted, skipping alert for '{}'",
                reminder.title
            );
            return Ok(ScheduleOutcome::Skipped {
                reason: SkipReason::NoPermission,
            });
        }

        if reminder.status.is_finished() {
            tracing::debug!("Reminder {} is finished, no alert armed", reminder.id);
            return Ok(ScheduleOutcome::Skipped {
                reason: SkipReason::Finished,
            });
        }

        let notify_at = lifecycle::notify_threshold(reminder);
        if notify_at < self.clock.now() {
            tracing::info!(
                "Notification time for '{}' is in the past. Skipping scheduling",
                reminder.title
            );
            return Ok(ScheduleOutcome::Skipped {
                reason: SkipReason::InPast,
            });
        }

        self.platform
            .arm(Alert {
                id: alert_id,
                reminder_id: reminder.id.clone(),
                fire_at: notify_at,
                title: reminder.title.clone(),
                body: reminder.notes.clone(),
            })
            .await?;

        tracing::info!("Scheduled notification for '{}' at {}", reminder.title, notify_at);
        Ok(ScheduleOutcome::Armed { at: notify_at })
    }

    /// Cancel the alert for a reminder (on delete)
    pub async fn cancel(&self, reminder_id: &str) -> Result<()> {
        self.platform.cancel(&AlertId::for_reminder(reminder_id)).await?;
        self.versions.write().await.remove(reminder_id);
        Ok(())
    }

    /// Bring this process's armed alerts in line with the store.
    ///
    /// Other processes edit the store without reaching this platform, so a
    /// long-running process calls this on every reconciliation pass:
    /// alerts of deleted or finished reminders are cancelled, and reminders
    /// whose `updated_at` differs from the last scheduled version (or that
    /// were never scheduled here) are scheduled again.
    pub async fn sync_alerts(&self, reminders: &[Reminder]) -> AlertSyncReport {
        let mut report = AlertSyncReport::default();
        let live: HashMap<&str, &Reminder> = reminders
            .iter()
            .filter(|r| !r.status.is_finished())
            .map(|r| (r.id.as_str(), r))
            .collect();

        for alert in self.platform.armed().await {
            if live.contains_key(alert.reminder_id.as_str()) {
                continue;
            }
            match self.platform.cancel(&alert.id).await {
                Ok(()) => {
                    tracing::info!("Cancelled alert for removed reminder {}", alert.reminder_id);
                    report.cancelled += 1;
                }
                Err(e) => tracing::error!("Failed to cancel alert {}: {}", alert.id, e),
            }
        }

        self.versions
            .write()
            .await
            .retain(|id, _| live.contains_key(id.as_str()));

        for reminder in live.values() {
            let known = self.versions.read().await.get(&reminder.id).copied();
            if known == Some(reminder.updated_at) {
                continue;
            }
            match self.schedule(reminder).await {
                Ok(_) => report.rescheduled += 1,
                // Version stays unrecorded, so the next pass retries
                Err(e) => tracing::error!("Failed to schedule reminder {}: {}", reminder.id, e),
            }
        }

        report
    }

    /// Re-arm alerts for every unfinished reminder, e.g. after a restart.
    /// Failures are logged per reminder.
    pub async fn reschedule_all(&self, reminders: &[Reminder]) -> usize {
        let mut armed = 0;

        for reminder in reminders.iter().filter(|r| !r.status.is_finished()) {
            match self.schedule(reminder).await {
                Ok(outcome) if outcome.is_armed() => armed += 1,
                Ok(_) => {}
                Err(e) => tracing::error!("Failed to schedule reminder {}: {}", reminder.id, e),
            }
        }

        tracing::info!("Re-armed {} alert(s)", armed);
        armed
    }

    /// Delivery callback: recompute the reminder's status now and persist
    /// it if it changed. Returns the new status when a write happened.
    pub async fn handle_delivery(&self, reminder_id: &str) -> Result<Option<ReminderStatus>> {
        let Some(reminder) = self.repo.find_reminder(reminder_id).await? else {
            tracing::debug!("Delivered alert for deleted reminder {}", reminder_id);
            return Ok(None);
        };

        let now = self.clock.now();
        let Some(status) = lifecycle::status_change(&reminder, now) else {
            return Ok(None);
        };

        if self
            .repo
            .update_status(&reminder.id, reminder.status, status, now)
            .await?
        {
            tracing::info!("Reminder '{}' status changed to {}", reminder.title, status);
            Ok(Some(status))
        } else {
            Ok(None)
        }
    }
}
