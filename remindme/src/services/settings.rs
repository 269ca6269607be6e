//! Settings service
//!
//! Manages application settings persistence using JSON file storage.

use crate::config::{
    MAX_RECONCILE_INTERVAL_SECS, MIN_RECONCILE_INTERVAL_SECS, RECONCILE_INTERVAL_SECS,
    SETTINGS_FILE_NAME,
};
use crate::database::LeadTime;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

/// Reminder behavior settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderSettings {
    /// Lead time preselected for new reminders
    #[serde(default)]
    pub default_notify_before: LeadTime,
    /// Cadence of the reconciliation loop in seconds
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,
    /// Whether local alerts may be presented at all
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
}

fn default_reconcile_interval() -> u64 {
    RECONCILE_INTERVAL_SECS
}

fn default_true() -> bool {
    true
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            default_notify_before: LeadTime::default(),
            reconcile_interval_secs: default_reconcile_interval(),
            notifications_enabled: true,
        }
    }
}

impl ReminderSettings {
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        let range = MIN_RECONCILE_INTERVAL_SECS..=MAX_RECONCILE_INTERVAL_SECS;
        if !range.contains(&self.reconcile_interval_secs) {
            return Err(AppError::Validation(format!(
                "Reconcile interval must be between {} and {} seconds",
                MIN_RECONCILE_INTERVAL_SECS, MAX_RECONCILE_INTERVAL_SECS
            )));
        }
        Ok(())
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub reminders: ReminderSettings,
}

/// Service for managing application settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(app_data_dir: PathBuf) -> Self {
        Self {
            settings_path: app_data_dir.join(SETTINGS_FILE_NAME),
        }
    }

    /// Load settings from disk or create default if not exists
    pub async fn load(&self) -> Result<AppSettings> {
        if !self.settings_path.exists() {
            tracing::info!("Settings file not found, creating default settings");
            let default = AppSettings::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.settings_path).await?;
        let settings: AppSettings = serde_json::from_str(&content)
            .map_err(|e| AppError::Generic(format!("Failed to parse settings: {}", e)))?;

        if let Err(e) = settings.reminders.validate() {
            tracing::warn!("Ignoring invalid reminder settings: {}", e);
            return Ok(AppSettings::default());
        }

        Ok(settings)
    }

    /// Save settings to disk
    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        let content = serde_json::to_string_pretty(settings)?;

        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.settings_path, content).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }

    /// Get reminder settings
    pub async fn get_reminders(&self) -> Result<ReminderSettings> {
        let settings = self.load().await?;
        Ok(settings.reminders)
    }

    /// Update reminder settings
    pub async fn update_reminders(&self, reminders: ReminderSettings) -> Result<()> {
        reminders.validate()?;

        let mut settings = self.load().await?;
        settings.reminders = reminders;
        self.save(&settings).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_service() -> (SettingsService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let service = SettingsService::new(temp_dir.path().to_path_buf());
        (service, temp_dir)
    }

    #[tokio::test]
    async fn test_default_settings_created_on_load() {
        let (service, temp) = create_test_service();

        let settings = service.load().await.unwrap();

        assert_eq!(settings.reminders.default_notify_before, LeadTime::Hour);
        assert_eq!(settings.reminders.reconcile_interval_secs, 60);
        assert!(settings.reminders.notifications_enabled);
        assert!(temp.path().join(SETTINGS_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_reminder_settings_get_and_update() {
        let (service, _temp) = create_test_service();

        let updated = ReminderSettings {
            default_notify_before: LeadTime::Week,
            reconcile_interval_secs: 120,
            notifications_enabled: false,
        };
        service.update_reminders(updated.clone()).await.unwrap();

        let loaded = service.get_reminders().await.unwrap();
        assert_eq!(loaded, updated);
        assert_eq!(loaded.reconcile_interval(), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_invalid_interval_rejected() {
        let (service, _temp) = create_test_service();

        let result = service
            .update_reminders(ReminderSettings {
                reconcile_interval_secs: 1,
                ..ReminderSettings::default()
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(service.get_reminders().await.unwrap(), ReminderSettings::default());
    }

    #[tokio::test]
    async fn test_missing_fields_use_defaults() {
        let (service, temp) = create_test_service();

        std::fs::write(
            temp.path().join(SETTINGS_FILE_NAME),
            r#"{"reminders":{"default_notify_before":"Day"}}"#,
        )
        .unwrap();

        let loaded = service.get_reminders().await.unwrap();
        assert_eq!(loaded.default_notify_before, LeadTime::Day);
        assert_eq!(loaded.reconcile_interval_secs, RECONCILE_INTERVAL_SECS);
        assert!(loaded.notifications_enabled);
    }

    #[tokio::test]
    async fn test_settings_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().to_path_buf();

        {
            let service = SettingsService::new(settings_path.clone());
            let updated = ReminderSettings {
                default_notify_before: LeadTime::Day,
                ..ReminderSettings::default()
            };
            service.update_reminders(updated).await.unwrap();
        }

        {
            let service = SettingsService::new(settings_path);
            let loaded = service.get_reminders().await.unwrap();
            assert_eq!(loaded.default_notify_before, LeadTime::Day);
        }
    }
}
