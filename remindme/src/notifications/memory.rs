//! Recording alert platform
//!
//! Keeps armed alerts in memory and only delivers them when asked to via
//! `fire_due`. Used by the one-shot CLI commands and by tests that drive
//! time by hand.

use super::platform::{Alert, AlertEvent, AlertId, AlertPlatform};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

#[derive(Clone)]
pub struct MemoryAlertPlatform {
    alerts: Arc<RwLock<HashMap<AlertId, Alert>>>,
    permission_granted: Arc<AtomicBool>,
    events: Option<mpsc::Sender<AlertEvent>>,
}

impl MemoryAlertPlatform {
    pub fn new(permission_granted: bool) -> Self {
        Self {
            alerts: Arc::new(RwLock::new(HashMap::new())),
            permission_granted: Arc::new(AtomicBool::new(permission_granted)),
            events: None,
        }
    }

    /// Report deliveries and activations on `events`
    pub fn with_events(mut self, events: mpsc::Sender<AlertEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission_granted.store(granted, Ordering::SeqCst);
    }

    /// Deliver every alert due at `now`, earliest first
    pub async fn fire_due(&self, now: DateTime<Utc>) -> Vec<Alert> {
        let mut fired: Vec<Alert> = {
            let mut alerts = self.alerts.write().await;
            let due: Vec<AlertId> = alerts
                .values()
                .filter(|a| a.fire_at <= now)
                .map(|a| a.id.clone())
                .collect();
            due.iter().filter_map(|id| alerts.remove(id)).collect()
        };
        fired.sort_by_key(|a| a.fire_at);

        for alert in &fired {
            tracing::info!("Notification: {} - {}", alert.title, alert.body);
            self.emit(AlertEvent::Delivered {
                reminder_id: alert.reminder_id.clone(),
                fired_at: now,
            })
            .await;
        }

        fired
    }

    /// Simulate the user tapping a delivered alert
    pub async fn activate(&self, reminder_id: &str) {
        self.emit(AlertEvent::Activated {
            reminder_id: reminder_id.to_string(),
        })
        .await;
    }

    async fn emit(&self, event: AlertEvent) {
        if let Some(events) = &self.events {
            if let Err(e) = events.send(event).await {
                tracing::warn!("Alert event dropped: {}", e);
            }
        }
    }
}

#[async_trait]
impl AlertPlatform for MemoryAlertPlatform {
    async fn request_permission(&self) -> Result<bool> {
        Ok(self.permission_granted.load(Ordering::SeqCst))
    }

    async fn arm(&self, alert: Alert) -> Result<()> {
        let mut alerts = self.alerts.write().await;
        alerts.insert(alert.id.clone(), alert);
        Ok(())
    }

    async fn cancel(&self, id: &AlertId) -> Result<()> {
        let mut alerts = self.alerts.write().await;
        alerts.remove(id);
        Ok(())
    }

    async fn armed(&self) -> Vec<Alert> {
        let alerts = self.alerts.read().await;
        let mut armed: Vec<Alert> = alerts.values().cloned().collect();
        armed.sort_by_key(|a| a.fire_at);
        armed
    }
}
