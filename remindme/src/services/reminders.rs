//! Reminders service
//!
//! The create / edit / finish / delete workflows. Every save persists the
//! reminder, applies the lifecycle rules at the current time, and
//! re-arms (or cancels) its alert.

use crate::clock::Clock;
use crate::config::{MAX_NOTES_LENGTH, MAX_TITLE_LENGTH};
use crate::database::{
    CreateReminderRequest, Reminder, ReminderStatus, Repository, UpdateReminderRequest,
};
use crate::error::{AppError, Result};
use crate::lifecycle;
use crate::notifications::{NotificationScheduler, ScheduleOutcome};
use serde::Serialize;
use std::sync::Arc;

/// A saved reminder and what happened to its alert.
/// `alert` is `None` when the alert platform failed; the reminder is saved
/// regardless.
#[derive(Debug, Clone, Serialize)]
pub struct SavedReminder {
    pub reminder: Reminder,
    pub alert: Option<ScheduleOutcome>,
}

/// Reminders split by status, each list soonest due first
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReminderGroups {
    pub active: Vec<Reminder>,
    pub pending: Vec<Reminder>,
    pub finished: Vec<Reminder>,
}

#[derive(Clone)]
pub struct RemindersService {
    repo: Repository,
    scheduler: NotificationScheduler,
    clock: Arc<dyn Clock>,
}

impl RemindersService {
    pub fn new(repo: Repository, scheduler: NotificationScheduler, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            scheduler,
            clock,
        }
    }

    /// Create a new reminder
    pub async fn create_reminder(&self, mut req: CreateReminderRequest) -> Result<SavedReminder> {
        req.title = validate_title(&req.title)?;
        if let Some(notes) = &req.notes {
            validate_notes(notes)?;
        }

        tracing::info!("Creating reminder '{}' due {}", req.title, req.due_at);

        let reminder = self.repo.create_reminder(&req, self.clock.now()).await?;
        self.after_save(reminder).await
    }

    pub async fn get_reminder(&self, id: &str) -> Result<Reminder> {
        self.repo.get_reminder(id).await
    }

    /// List all reminders, soonest due first
    pub async fn list_reminders(&self) -> Result<Vec<Reminder>> {
        self.repo.list_reminders().await
    }

    /// List reminders grouped into Active, Pending and Finished sections
    pub async fn list_grouped(&self) -> Result<ReminderGroups> {
        let mut groups = ReminderGroups::default();

        for reminder in self.repo.list_reminders().await? {
            match reminder.status {
                ReminderStatus::Active => groups.active.push(reminder),
                ReminderStatus::Pending => groups.pending.push(reminder),
                ReminderStatus::Finished => groups.finished.push(reminder),
            }
        }

        Ok(groups)
    }

    /// Apply a user edit, including a manual status override
    pub async fn update_reminder(&self, mut req: UpdateReminderRequest) -> Result<SavedReminder> {
        if let Some(title) = req.title.take() {
            req.title = Some(validate_title(&title)?);
        }
        if let Some(notes) = &req.notes {
            validate_notes(notes)?;
        }

        tracing::debug!("Updating reminder: {}", req.id);

        let reminder = self.repo.update_reminder(&req, self.clock.now()).await?;
        self.after_save(reminder).await
    }

    /// Mark a reminder as finished. Finishing twice is a no-op.
    pub async fn finish_reminder(&self, id: &str) -> Result<Reminder> {
        let reminder = self.repo.get_reminder(id).await?;

        if !reminder.status.is_finished() {
            let now = self.clock.now();
            let written = self
                .repo
                .update_status(id, reminder.status, ReminderStatus::Finished, now)
                .await?;

            let written = if written {
                true
            } else {
                // Status moved underneath us (reconciliation); finish from the new value
                let current = self.repo.get_reminder(id).await?;
                !current.status.is_finished()
                    && self
                        .repo
                        .update_status(id, current.status, ReminderStatus::Finished, now)
                        .await?
            };

            if written {
                tracing::info!("Reminder '{}' marked as finished", reminder.title);
            }
        }

        if let Err(e) = self.scheduler.cancel(id).await {
            tracing::error!("Failed to cancel alert for reminder {}: {}", id, e);
        }

        self.repo.get_reminder(id).await
    }

    /// Delete a reminder and its alert
    pub async fn delete_reminder(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting reminder: {}", id);

        self.repo.delete_reminder(id).await?;

        if let Err(e) = self.scheduler.cancel(id).await {
            tracing::error!("Failed to cancel alert for reminder {}: {}", id, e);
        }

        Ok(())
    }

    /// The row is already committed here, so nothing below fails the save.
    async fn after_save(&self, reminder: Reminder) -> Result<SavedReminder> {
        let reminder = self.apply_lifecycle(reminder).await;

        let alert = match self.scheduler.schedule(&reminder).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!("Failed to schedule alert for reminder {}: {}", reminder.id, e);
                None
            }
        };

        Ok(SavedReminder { reminder, alert })
    }

    /// Recompute the status right away. A failed write is logged and left
    /// for the next reconciliation pass.
    async fn apply_lifecycle(&self, reminder: Reminder) -> Reminder {
        let now = self.clock.now();

        let Some(status) = lifecycle::status_change(&reminder, now) else {
            return reminder;
        };

        match self
            .repo
            .update_status(&reminder.id, reminder.status, status, now)
            .await
        {
            Ok(true) => {
                tracing::info!("Reminder '{}' status changed to {}", reminder.title, status);
                Reminder {
                    status,
                    updated_at: now,
                    ..reminder
                }
            }
            Ok(false) => match self.repo.get_reminder(&reminder.id).await {
                Ok(current) => current,
                Err(e) => {
                    tracing::warn!("Failed to reload reminder {}: {}", reminder.id, e);
                    reminder
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to update status of reminder {}, retrying next pass: {}",
                    reminder.id,
                    e
                );
                reminder
            }
        }
    }
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();

    if title.is_empty() {
        return Err(AppError::Validation("Title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(AppError::Validation(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LENGTH
        )));
    }

    Ok(title.to_string())
}

fn validate_notes(notes: &str) -> Result<()> {
    if notes.chars().count() > MAX_NOTES_LENGTH {
        return Err(AppError::Validation(format!(
            "Notes must be at most {} characters",
            MAX_NOTES_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::database::{create_pool, LeadTime};
    use crate::notifications::{AlertPlatform, MemoryAlertPlatform, SkipReason};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::TempDir;

    struct Fixture {
        service: RemindersService,
        repo: Repository,
        platform: MemoryAlertPlatform,
        clock: ManualClock,
        _temp: TempDir,
    }

    fn d0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 17, 9, 0, 0).unwrap()
    }

    async fn create_test_service() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let pool = create_pool(&temp_dir.path().join("db.sqlite")).await.unwrap();
        let repo = Repository::new(pool);

        let clock = ManualClock::new(d0());
        let platform = MemoryAlertPlatform::new(true);
        let clock_arc: Arc<dyn Clock> = Arc::new(clock.clone());
        let scheduler =
            NotificationScheduler::new(Arc::new(platform.clone()), repo.clone(), clock_arc.clone());

        Fixture {
            service: RemindersService::new(repo.clone(), scheduler, clock_arc),
            repo,
            platform,
            clock,
            _temp: temp_dir,
        }
    }

    fn request(title: &str, due_at: DateTime<Utc>, lead: LeadTime) -> CreateReminderRequest {
        CreateReminderRequest {
            title: title.to_string(),
            notes: None,
            due_at,
            notify_before: lead,
            status: None,
        }
    }

    #[tokio::test]
    async fn test_create_reminder_arms_alert() {
        let f = create_test_service().await;

        let saved = f
            .service
            .create_reminder(request("  Book flights  ", d0() + Duration::days(10), LeadTime::Week))
            .await
            .unwrap();

        assert_eq!(saved.reminder.title, "Book flights");
        assert_eq!(saved.reminder.status, ReminderStatus::Active);
        assert_eq!(saved.reminder.created_at, d0());
        assert_eq!(
            saved.alert,
            Some(ScheduleOutcome::Armed {
                at: d0() + Duration::days(3)
            })
        );
        assert_eq!(f.platform.armed().await.len(), 1);
    }

    #[tokio::test]
    async fn test_create_inside_window_is_pending_immediately() {
        let f = create_test_service().await;

        let saved = f
            .service
            .create_reminder(request("Standup", d0() + Duration::minutes(30), LeadTime::Hour))
            .await
            .unwrap();

        assert_eq!(saved.reminder.status, ReminderStatus::Pending);
        assert_eq!(
            saved.alert,
            Some(ScheduleOutcome::Skipped {
                reason: SkipReason::InPast
            })
        );
    }

    #[tokio::test]
    async fn test_create_rejects_empty_title() {
        let f = create_test_service().await;

        let result = f
            .service
            .create_reminder(request("   ", d0() + Duration::days(1), LeadTime::Hour))
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(f.service.list_reminders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_replaces_alert() {
        let f = create_test_service().await;
        let saved = f
            .service
            .create_reminder(request("Gym", d0() + Duration::days(2), LeadTime::Hour))
            .await
            .unwrap();

        let edited = f
            .service
            .update_reminder(UpdateReminderRequest {
                id: saved.reminder.id.clone(),
                due_at: Some(d0() + Duration::days(5)),
                notify_before: Some(LeadTime::Day),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(
            edited.alert,
            Some(ScheduleOutcome::Armed {
                at: d0() + Duration::days(4)
            })
        );

        let armed = f.platform.armed().await;
        assert_eq!(armed.len(), 1);
        assert_eq!(armed[0].fire_at, d0() + Duration::days(4));
    }

    #[tokio::test]
    async fn test_manual_status_override() {
        let f = create_test_service().await;
        let saved = f
            .service
            .create_reminder(request("Taxes", d0() + Duration::days(2), LeadTime::Hour))
            .await
            .unwrap();

        let edited = f
            .service
            .update_reminder(UpdateReminderRequest {
                id: saved.reminder.id.clone(),
                status: Some(ReminderStatus::Pending),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(edited.reminder.status, ReminderStatus::Pending);
    }

    #[tokio::test]
    async fn test_finish_cancels_alert_and_is_idempotent() {
        let f = create_test_service().await;
        let saved = f
            .service
            .create_reminder(request("Vet", d0() + Duration::days(2), LeadTime::Hour))
            .await
            .unwrap();
        assert_eq!(f.platform.armed().await.len(), 1);

        let finished = f.service.finish_reminder(&saved.reminder.id).await.unwrap();
        assert_eq!(finished.status, ReminderStatus::Finished);
        assert!(f.platform.armed().await.is_empty());

        let again = f.service.finish_reminder(&saved.reminder.id).await.unwrap();
        assert_eq!(again.status, ReminderStatus::Finished);
    }

    #[tokio::test]
    async fn test_delete_cancels_alert() {
        let f = create_test_service().await;
        let saved = f
            .service
            .create_reminder(request("Library", d0() + Duration::days(2), LeadTime::Hour))
            .await
            .unwrap();

        f.service.delete_reminder(&saved.reminder.id).await.unwrap();

        assert!(f.platform.armed().await.is_empty());
        assert!(matches!(
            f.service.get_reminder(&saved.reminder.id).await,
            Err(AppError::ReminderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_grouped() {
        let f = create_test_service().await;

        let a = f
            .service
            .create_reminder(request("A", d0() + Duration::days(3), LeadTime::Hour))
            .await
            .unwrap();
        f.service
            .create_reminder(request("B", d0() + Duration::minutes(10), LeadTime::Hour))
            .await
            .unwrap();
        f.service
            .create_reminder(request("C", d0() + Duration::days(1), LeadTime::Hour))
            .await
            .unwrap();
        f.service.finish_reminder(&a.reminder.id).await.unwrap();

        f.clock.advance(Duration::minutes(1));
        let groups = f.service.list_grouped().await.unwrap();

        assert_eq!(groups.active.len(), 1);
        assert_eq!(groups.active[0].title, "C");
        assert_eq!(groups.pending.len(), 1);
        assert_eq!(groups.pending[0].title, "B");
        assert_eq!(groups.finished.len(), 1);
        assert_eq!(groups.finished[0].title, "A");
    }

    #[tokio::test]
    async fn test_failed_status_write_keeps_saved_reminder() {
        let f = create_test_service().await;
        sqlx::query(
            "CREATE TRIGGER block_status BEFORE UPDATE OF status ON reminders
             BEGIN SELECT RAISE(ABORT, 'status writes blocked'); END",
        )
        .execute(f.repo.pool())
        .await
        .unwrap();

        // Inside its window at creation, so the immediate status write runs
        let saved = f
            .service
            .create_reminder(request("Standup", d0() + Duration::minutes(30), LeadTime::Hour))
            .await
            .unwrap();

        assert_eq!(saved.reminder.status, ReminderStatus::Active);
        assert_eq!(
            saved.alert,
            Some(ScheduleOutcome::Skipped {
                reason: SkipReason::InPast
            })
        );

        let stored = f.service.list_reminders().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, saved.reminder.id);
        assert_eq!(stored[0].status, ReminderStatus::Active);
    }

    #[tokio::test]
    async fn test_finish_reports_unwritten_status() {
        let f = create_test_service().await;
        let saved = f
            .service
            .create_reminder(request("Post office", d0() + Duration::days(1), LeadTime::Hour))
            .await
            .unwrap();

        // Every status write silently affects no rows
        sqlx::query(
            "CREATE TRIGGER ignore_status BEFORE UPDATE OF status ON reminders
             BEGIN SELECT RAISE(IGNORE); END",
        )
        .execute(f.repo.pool())
        .await
        .unwrap();

        let result = f.service.finish_reminder(&saved.reminder.id).await.unwrap();
        assert_eq!(result.status, ReminderStatus::Active);
    }
}
