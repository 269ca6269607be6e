//! Application state and initialization
//!
//! This module builds the process context. All services are created here
//! and handed out explicitly through `AppState`; nothing is global.

use crate::clock::{Clock, SystemClock};
use crate::config::{ALERT_EVENT_CAPACITY, DATABASE_FILE_NAME};
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::notifications::{
    AlertEvent, AlertPlatform, LocalAlertPlatform, MemoryAlertPlatform, NotificationScheduler,
};
use crate::services::{
    Reconcile, ReconcileTrigger, Reconciler, RemindersService, SettingsService,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Which alert platform backs the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertBackend {
    /// Timers that live in this process (long-running mode)
    Local,
    /// Alerts are recorded but never fire (one-shot commands, tests)
    Memory,
}

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub app_data_dir: PathBuf,
    pub clock: Arc<dyn Clock>,
    pub repo: Repository,
    pub settings_service: SettingsService,
    pub scheduler: NotificationScheduler,
    pub reminders_service: RemindersService,
    pub reconciler: Reconciler,
    local_platform: Option<Arc<LocalAlertPlatform>>,
}

/// Application setup with the system clock
pub async fn setup(
    app_data_dir: &Path,
    backend: AlertBackend,
) -> Result<(AppState, mpsc::Receiver<AlertEvent>)> {
    setup_with_clock(app_data_dir, backend, Arc::new(SystemClock)).await
}

/// Application setup with an injected clock
pub async fn setup_with_clock(
    app_data_dir: &Path,
    backend: AlertBackend,
    clock: Arc<dyn Clock>,
) -> Result<(AppState, mpsc::Receiver<AlertEvent>)> {
    tracing::info!("Initializing application");
    tracing::info!("App data directory: {:?}", app_data_dir);

    std::fs::create_dir_all(app_data_dir)?;

    let settings_service = SettingsService::new(app_data_dir.to_path_buf());
    let settings = settings_service.load().await?;

    let pool = create_pool(&app_data_dir.join(DATABASE_FILE_NAME)).await?;
    let repo = Repository::new(pool);

    let (events_tx, events_rx) = mpsc::channel(ALERT_EVENT_CAPACITY);
    let permission = settings.reminders.notifications_enabled;

    let mut local_platform = None;
    let platform: Arc<dyn AlertPlatform> = match backend {
        AlertBackend::Local => {
            let local =
                Arc::new(LocalAlertPlatform::new(Arc::clone(&clock), events_tx, permission).await?);
            local_platform = Some(Arc::clone(&local));
            local
        }
        AlertBackend::Memory => Arc::new(MemoryAlertPlatform::new(permission).with_events(events_tx)),
    };

    let scheduler = NotificationScheduler::new(platform, repo.clone(), Arc::clone(&clock));
    let reminders_service =
        RemindersService::new(repo.clone(), scheduler.clone(), Arc::clone(&clock));
    let reconciler = Reconciler::new(repo.clone(), Arc::clone(&clock));

    let state = AppState {
        app_data_dir: app_data_dir.to_path_buf(),
        clock,
        repo,
        settings_service,
        scheduler,
        reminders_service,
        reconciler,
        local_platform,
    };

    tracing::info!("Application initialized successfully");

    Ok((state, events_rx))
}

/// Route platform callbacks: a delivery recomputes that reminder's status,
/// a tap triggers a full reconciliation pass.
pub fn spawn_alert_dispatch(
    mut events: mpsc::Receiver<AlertEvent>,
    scheduler: NotificationScheduler,
    reconcile: Reconcile,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                AlertEvent::Delivered { reminder_id, .. } => {
                    if let Err(e) = scheduler.handle_delivery(&reminder_id).await {
                        // Reconciliation will pick it up on the next tick
                        tracing::warn!("Failed to apply delivery for {}: {}", reminder_id, e);
                    }
                }
                AlertEvent::Activated { reminder_id } => {
                    tracing::debug!("Notification for {} activated", reminder_id);
                    if let Err(e) = reconcile.now(ReconcileTrigger::NotificationActivated).await {
                        tracing::warn!("On-demand reconciliation failed: {}", e);
                    }
                }
            }
        }
    })
}

impl AppState {
    /// Long-running mode: re-arm alerts, start the reconciliation loop and
    /// dispatch alert events until `shutdown` resolves.
    pub async fn run_until<F>(self, events: mpsc::Receiver<AlertEvent>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.scheduler.request_permission().await;

        let reminders = self.repo.list_reminders().await?;
        self.scheduler.reschedule_all(&reminders).await;

        let settings = self.settings_service.get_reminders().await?;
        // One-shot commands edit the store without touching our alerts
        let handle = self
            .reconciler
            .clone()
            .with_alert_sync(self.scheduler.clone())
            .spawn(settings.reconcile_interval());
        let dispatch = spawn_alert_dispatch(events, self.scheduler.clone(), handle.requester());

        // Catch up on anything that changed while we were not running
        if let Err(e) = handle.reconcile_now(ReconcileTrigger::Resume).await {
            tracing::warn!("Startup reconciliation failed: {}", e);
        }

        shutdown.await;
        tracing::info!("Shutting down");

        dispatch.abort();
        handle.shutdown().await;
        if let Some(local) = &self.local_platform {
            local.shutdown().await?;
        }

        Ok(())
    }
}
