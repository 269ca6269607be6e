//! Settings commands

use crate::app::AppState;
use crate::database::LeadTime;
use crate::error::Result;
use clap::Subcommand;

#[derive(Debug, Clone, Subcommand)]
pub enum SettingsAction {
    /// Print the current settings
    Show,
    /// Change one or more settings
    Set {
        /// Lead time preselected for new reminders: hour, day or week
        #[arg(long)]
        default_notify: Option<LeadTime>,

        /// Reconciliation cadence in seconds
        #[arg(long)]
        reconcile_interval: Option<u64>,

        /// Allow local notifications
        #[arg(long)]
        notifications: Option<bool>,
    },
}

pub async fn run(state: &AppState, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => {
            let settings = state.settings_service.load().await?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsAction::Set {
            default_notify,
            reconcile_interval,
            notifications,
        } => {
            let mut reminders = state.settings_service.get_reminders().await?;

            if let Some(lead) = default_notify {
                reminders.default_notify_before = lead;
            }
            if let Some(secs) = reconcile_interval {
                reminders.reconcile_interval_secs = secs;
            }
            if let Some(enabled) = notifications {
                reminders.notifications_enabled = enabled;
            }

            state.settings_service.update_reminders(reminders).await?;
            println!("Settings updated");
        }
    }
    Ok(())
}
