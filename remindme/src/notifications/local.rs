//! In-process alert platform
//!
//! Each armed alert is a tokio-cron-scheduler one-shot job. When the job
//! runs, the alert is presented (logged) and an `AlertEvent::Delivered`
//! is sent back to the application. Alerts live only as long as the
//! process; the application re-arms them on start.

use super::platform::{Alert, AlertEvent, AlertId, AlertPlatform};
use crate::clock::Clock;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

struct ArmedJob {
    job_id: Uuid,
    alert: Alert,
}

pub struct LocalAlertPlatform {
    scheduler: Arc<RwLock<JobScheduler>>,
    jobs: Arc<RwLock<HashMap<AlertId, ArmedJob>>>,
    events: mpsc::Sender<AlertEvent>,
    clock: Arc<dyn Clock>,
    permission_granted: bool,
}

impl LocalAlertPlatform {
    /// Create and start the job scheduler
    pub async fn new(
        clock: Arc<dyn Clock>,
        events: mpsc::Sender<AlertEvent>,
        permission_granted: bool,
    ) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::Alert(format!("Failed to create scheduler: {}", e)))?;

        scheduler
            .start()
            .await
            .map_err(|e| AppError::Alert(format!("Failed to start scheduler: {}", e)))?;
        tracing::info!("Alert scheduler started");

        Ok(Self {
            scheduler: Arc::new(RwLock::new(scheduler)),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            events,
            clock,
            permission_granted,
        })
    }

    /// Shutdown scheduler gracefully; pending alerts are dropped
    pub async fn shutdown(&self) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let mut scheduler = self.scheduler.write().await;
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::Alert(format!("Failed to shutdown scheduler: {}", e)))?;
        jobs.clear();
        tracing::info!("Alert scheduler shutdown");
        Ok(())
    }

    async fn remove_job(&self, id: &AlertId) -> Result<()> {
        let mut jobs = self.jobs.write().await;

        if let Some(armed) = jobs.remove(id) {
            let scheduler = self.scheduler.write().await;
            scheduler
                .remove(&armed.job_id)
                .await
                .map_err(|e| AppError::Alert(format!("Failed to remove alert job: {}", e)))?;
            tracing::debug!("Alert {} cancelled", id);
        }

        Ok(())
    }
}

#[async_trait]
impl AlertPlatform for LocalAlertPlatform {
    async fn request_permission(&self) -> Result<bool> {
        tracing::info!("Notifications permission granted: {}", self.permission_granted);
        Ok(self.permission_granted)
    }

    async fn arm(&self, alert: Alert) -> Result<()> {
        self.remove_job(&alert.id).await?;

        // A fire time that slipped into the past while arming fires at once
        let delay = (alert.fire_at - self.clock.now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        let jobs = Arc::clone(&self.jobs);
        let events = self.events.clone();
        let job_alert = alert.clone();
        let clock = Arc::clone(&self.clock);

        let job = Job::new_one_shot_async(delay, move |job_id, _l| {
            let jobs = Arc::clone(&jobs);
            let events = events.clone();
            let alert = job_alert.clone();
            let fired_at = clock.now();
            Box::pin(async move {
                {
                    let mut jobs = jobs.write().await;
                    if jobs.get(&alert.id).map(|armed| armed.job_id) == Some(job_id) {
                        jobs.remove(&alert.id);
                    }
                }

                tracing::info!("Notification: {} - {}", alert.title, alert.body);

                if let Err(e) = events
                    .send(AlertEvent::Delivered {
                        reminder_id: alert.reminder_id.clone(),
                        fired_at,
                    })
                    .await
                {
                    tracing::error!("Failed to report delivered alert {}: {}", alert.id, e);
                }
            })
        })
        .map_err(|e| AppError::Alert(format!("Failed to create alert job: {}", e)))?;

        let job_id = job.guid();

        // Hold the map lock across `add` so a zero-delay job cannot run
        // before it is registered.
        let mut jobs = self.jobs.write().await;
        {
            let scheduler = self.scheduler.write().await;
            scheduler
                .add(job)
                .await
                .map_err(|e| AppError::Alert(format!("Failed to schedule alert: {}", e)))?;
        }

        tracing::info!("Alert {} armed for {}", alert.id, alert.fire_at);
        jobs.insert(alert.id.clone(), ArmedJob { job_id, alert });

        Ok(())
    }

    async fn cancel(&self, id: &AlertId) -> Result<()> {
        self.remove_job(id).await
    }

    async fn armed(&self) -> Vec<Alert> {
        let jobs = self.jobs.read().await;
        let mut armed: Vec<Alert> = jobs.values().map(|j| j.alert.clone()).collect();
        armed.sort_by_key(|a| a.fire_at);
        armed
    }
}
