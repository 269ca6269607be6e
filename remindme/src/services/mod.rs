//! Services module
//!
//! Business logic services that coordinate between the front end, the
//! repository and the notification scheduler.

pub mod reconciler;
pub mod reminders;
pub mod settings;

pub use reconciler::{Reconcile, ReconcileHandle, ReconcileReport, ReconcileTrigger, Reconciler};
pub use reminders::{ReminderGroups, RemindersService, SavedReminder};
pub use settings::{AppSettings, ReminderSettings, SettingsService};
