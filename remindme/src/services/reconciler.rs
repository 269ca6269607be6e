//! Reconciliation loop
//!
//! Recomputes every reminder's status against the clock, independent of
//! whether any alert was delivered. Runs on a fixed cadence and on demand
//! (resume, manual refresh, tapped notification).

use crate::clock::Clock;
use crate::config::RECONCILE_REQUEST_CAPACITY;
use crate::database::Repository;
use crate::error::{AppError, Result};
use crate::lifecycle;
use crate::notifications::NotificationScheduler;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// What asked for a reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileTrigger {
    Tick,
    Resume,
    Refresh,
    NotificationActivated,
}

/// Summary of one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub examined: usize,
    pub updated: usize,
    /// Reminders whose write failed; retried on the next pass
    pub failed: usize,
}

#[derive(Clone)]
pub struct Reconciler {
    repo: Repository,
    clock: Arc<dyn Clock>,
    alerts: Option<NotificationScheduler>,
}

impl Reconciler {
    pub fn new(repo: Repository, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            clock,
            alerts: None,
        }
    }

    /// Also re-sync `scheduler`'s armed alerts with the store after every
    /// pass. Used by the long-running process, whose alerts would otherwise
    /// miss edits made by one-shot commands.
    pub fn with_alert_sync(mut self, scheduler: NotificationScheduler) -> Self {
        self.alerts = Some(scheduler);
        self
    }

    /// One pass over every stored reminder.
    ///
    /// Only a failure to list reminders is returned as an error; a failed
    /// write is logged and counted.
    pub async fn reconcile_once(&self) -> Result<ReconcileReport> {
        let mut reminders = self.repo.list_reminders().await?;
        let now = self.clock.now();
        let mut report = ReconcileReport {
            examined: reminders.len(),
            ..Default::default()
        };

        for reminder in reminders.iter_mut() {
            let Some(status) = lifecycle::status_change(reminder, now) else {
                continue;
            };

            match self
                .repo
                .update_status(&reminder.id, reminder.status, status, now)
                .await
            {
                Ok(true) => {
                    tracing::info!("Reminder '{}' status changed to {}", reminder.title, status);
                    reminder.status = status;
                    reminder.updated_at = now;
                    report.updated += 1;
                }
                Ok(false) => {
                    tracing::debug!("Reminder {} changed concurrently, skipped", reminder.id);
                }
                Err(e) if e.is_persistence() => {
                    tracing::warn!(
                        "Failed to update reminder {}, retrying next pass: {}",
                        reminder.id,
                        e
                    );
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to update reminder {}: {}", reminder.id, e);
                    report.failed += 1;
                }
            }
        }

        if let Some(scheduler) = &self.alerts {
            let sync = scheduler.sync_alerts(&reminders).await;
            if sync.rescheduled > 0 || sync.cancelled > 0 {
                tracing::info!(
                    "Alerts synced: {} rescheduled, {} cancelled",
                    sync.rescheduled,
                    sync.cancelled
                );
            }
        }

        Ok(report)
    }

    /// Start the periodic loop. The first pass runs immediately.
    pub fn spawn(self, period: Duration) -> ReconcileHandle {
        let (tx, mut rx) = mpsc::channel::<ReconcileRequest>(RECONCILE_REQUEST_CAPACITY);

        let task = tokio::spawn(async move {
            tracing::info!("Starting reconciliation loop every {:?}", period);

            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.run_pass(ReconcileTrigger::Tick).await.ok();
                    }
                    request = rx.recv() => {
                        let Some(request) = request else {
                            break;
                        };
                        let result = self.run_pass(request.trigger).await;
                        // The requester may have given up waiting
                        let _ = request.reply.send(result);
                    }
                }
            }

            tracing::info!("Reconciliation loop stopped");
        });

        ReconcileHandle {
            requester: Reconcile { requests: tx },
            task,
        }
    }

    async fn run_pass(&self, trigger: ReconcileTrigger) -> Result<ReconcileReport> {
        match self.reconcile_once().await {
            Ok(report) => {
                if report.updated > 0 || report.failed > 0 {
                    tracing::info!(
                        "Reconciled ({:?}): {} updated, {} failed of {}",
                        trigger,
                        report.updated,
                        report.failed,
                        report.examined
                    );
                }
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Error reconciling reminders: {}", e);
                Err(e)
            }
        }
    }
}

struct ReconcileRequest {
    trigger: ReconcileTrigger,
    reply: oneshot::Sender<Result<ReconcileReport>>,
}

/// Cloneable way to ask a running loop for an immediate pass
#[derive(Clone)]
pub struct Reconcile {
    requests: mpsc::Sender<ReconcileRequest>,
}

impl Reconcile {
    /// Run a pass now and wait for its report
    pub async fn now(&self, trigger: ReconcileTrigger) -> Result<ReconcileReport> {
        let (reply, response) = oneshot::channel();

        self.requests
            .send(ReconcileRequest { trigger, reply })
            .await
            .map_err(|_| loop_stopped())?;

        response.await.map_err(|_| loop_stopped())?
    }
}

fn loop_stopped() -> AppError {
    AppError::Generic("Reconciliation loop is not running".to_string())
}

/// Owner of a running reconciliation loop
pub struct ReconcileHandle {
    requester: Reconcile,
    task: JoinHandle<()>,
}

impl ReconcileHandle {
    pub fn requester(&self) -> Reconcile {
        self.requester.clone()
    }

    pub async fn reconcile_now(&self, trigger: ReconcileTrigger) -> Result<ReconcileReport> {
        self.requester.now(trigger).await
    }

    /// Stop the loop; an in-flight pass is abandoned
    pub async fn shutdown(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::database::{
        initialize_database, CreateReminderRequest, LeadTime, Reminder, ReminderStatus,
    };
    use chrono::{DateTime, TimeZone, Utc};
    use sqlx::sqlite::SqlitePoolOptions;

    fn d0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 17, 9, 0, 0).unwrap()
    }

    async fn setup() -> (Reconciler, Repository, ManualClock) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        initialize_database(&pool).await.unwrap();

        let repo = Repository::new(pool);
        let clock = ManualClock::new(d0());
        let reconciler = Reconciler::new(repo.clone(), Arc::new(clock.clone()));
        (reconciler, repo, clock)
    }

    async fn create(repo: &Repository, title: &str, due_in: chrono::Duration) -> Reminder {
        repo.create_reminder(
            &CreateReminderRequest {
                title: title.to_string(),
                notes: None,
                due_at: d0() + due_in,
                notify_before: LeadTime::Hour,
                status: None,
            },
            d0(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_reconcile_moves_due_reminders_to_pending() {
        let (reconciler, repo, clock) = setup().await;
        let soon = create(&repo, "Soon", chrono::Duration::hours(2)).await;
        let later = create(&repo, "Later", chrono::Duration::days(2)).await;

        let report = reconciler.reconcile_once().await.unwrap();
        assert_eq!(report, ReconcileReport { examined: 2, updated: 0, failed: 0 });

        clock.advance(chrono::Duration::minutes(90));
        let report = reconciler.reconcile_once().await.unwrap();
        assert_eq!(report.updated, 1);

        assert_eq!(repo.get_reminder(&soon.id).await.unwrap().status, ReminderStatus::Pending);
        assert_eq!(repo.get_reminder(&later.id).await.unwrap().status, ReminderStatus::Active);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let (reconciler, repo, clock) = setup().await;
        create(&repo, "A", chrono::Duration::minutes(30)).await;
        create(&repo, "B", chrono::Duration::minutes(45)).await;
        clock.advance(chrono::Duration::minutes(1));

        let first = reconciler.reconcile_once().await.unwrap();
        assert_eq!(first.updated, 2);
        let snapshot = repo.list_reminders().await.unwrap();

        for _ in 0..3 {
            let again = reconciler.reconcile_once().await.unwrap();
            assert_eq!(again.updated, 0);
        }
        assert_eq!(repo.list_reminders().await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn test_reconcile_never_touches_finished() {
        let (reconciler, repo, clock) = setup().await;
        let r = create(&repo, "Done already", chrono::Duration::minutes(30)).await;
        repo.update_status(&r.id, ReminderStatus::Active, ReminderStatus::Finished, d0())
            .await
            .unwrap();

        clock.advance(chrono::Duration::minutes(10));
        reconciler.reconcile_once().await.unwrap();
        clock.advance(chrono::Duration::days(30));
        reconciler.reconcile_once().await.unwrap();

        assert_eq!(repo.get_reminder(&r.id).await.unwrap().status, ReminderStatus::Finished);
    }

    #[tokio::test]
    async fn test_pending_stays_pending_after_due() {
        let (reconciler, repo, clock) = setup().await;
        let r = create(&repo, "Overdue", chrono::Duration::minutes(30)).await;

        reconciler.reconcile_once().await.unwrap();
        clock.advance(chrono::Duration::days(7));
        let report = reconciler.reconcile_once().await.unwrap();

        assert_eq!(report.updated, 0);
        assert_eq!(repo.get_reminder(&r.id).await.unwrap().status, ReminderStatus::Pending);
    }

    #[tokio::test]
    async fn test_on_demand_request() {
        let (reconciler, repo, clock) = setup().await;
        let r = create(&repo, "Tapped", chrono::Duration::hours(3)).await;

        let handle = reconciler.spawn(Duration::from_secs(3600));
        clock.advance(chrono::Duration::hours(2) + chrono::Duration::minutes(30));

        let report = handle
            .reconcile_now(ReconcileTrigger::NotificationActivated)
            .await
            .unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(repo.get_reminder(&r.id).await.unwrap().status, ReminderStatus::Pending);

        let requester = handle.requester();
        handle.shutdown().await;
        assert!(requester.now(ReconcileTrigger::Refresh).await.is_err());
    }

    #[tokio::test]
    async fn test_periodic_tick_corrects_status() {
        let (reconciler, repo, clock) = setup().await;
        let r = create(&repo, "Ticked", chrono::Duration::hours(3)).await;
        clock.advance(chrono::Duration::hours(2) + chrono::Duration::minutes(1));

        let handle = reconciler.spawn(Duration::from_millis(20));

        let mut status = ReminderStatus::Active;
        for _ in 0..250 {
            status = repo.get_reminder(&r.id).await.unwrap().status;
            if status == ReminderStatus::Pending {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(status, ReminderStatus::Pending);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_write_is_counted_and_retried() {
        let (reconciler, repo, clock) = setup().await;
        let r = create(&repo, "Blocked", chrono::Duration::hours(2)).await;
        clock.advance(chrono::Duration::minutes(70));

        sqlx::query(
            "CREATE TRIGGER block_status BEFORE UPDATE OF status ON reminders
             BEGIN SELECT RAISE(ABORT, 'status writes blocked'); END",
        )
        .execute(repo.pool())
        .await
        .unwrap();

        let report = reconciler.reconcile_once().await.unwrap();
        assert_eq!(report, ReconcileReport { examined: 1, updated: 0, failed: 1 });
        assert_eq!(repo.get_reminder(&r.id).await.unwrap().status, ReminderStatus::Active);

        sqlx::query("DROP TRIGGER block_status")
            .execute(repo.pool())
            .await
            .unwrap();

        let report = reconciler.reconcile_once().await.unwrap();
        assert_eq!(report, ReconcileReport { examined: 1, updated: 1, failed: 0 });
        assert_eq!(repo.get_reminder(&r.id).await.unwrap().status, ReminderStatus::Pending);
    }
}
